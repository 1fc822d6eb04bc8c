use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://rowboard.db?mode=rwc";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    /// 命令行请求所代表的租户
    pub tenant_id: i32,
    /// 批量计算图表时的并发上限
    pub worker_limit: usize,
    pub query_timeout: Duration,
    pub log_dir: PathBuf,
    pub max_connections: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            tenant_id: 1,
            worker_limit: 4,
            query_timeout: Duration::from_millis(10_000),
            log_dir: PathBuf::from("logs"),
            max_connections: 10,
        }
    }
}

impl AppConfig {
    /// 先加载 .env（若存在），再读取进程环境变量
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_url: lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.database_url),
            tenant_id: parse_or(&lookup, "ROWBOARD_TENANT", defaults.tenant_id),
            worker_limit: parse_or(&lookup, "ROWBOARD_WORKERS", defaults.worker_limit).max(1),
            query_timeout: lookup("ROWBOARD_QUERY_TIMEOUT_MS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.query_timeout),
            log_dir: lookup("ROWBOARD_LOG_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            max_connections: parse_or(
                &lookup,
                "ROWBOARD_MAX_CONNECTIONS",
                defaults.max_connections,
            )
            .max(1),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let cfg = AppConfig::from_lookup(|_| None);
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_values_and_bad_numbers() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("ROWBOARD_TENANT", "7"),
            ("ROWBOARD_WORKERS", "0"),
            ("ROWBOARD_QUERY_TIMEOUT_MS", "250"),
            ("ROWBOARD_MAX_CONNECTIONS", "lots"),
        ]
        .into_iter()
        .collect();
        let cfg = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.tenant_id, 7);
        assert_eq!(cfg.worker_limit, 1);
        assert_eq!(cfg.query_timeout, Duration::from_millis(250));
        assert_eq!(cfg.max_connections, 10);
    }
}
