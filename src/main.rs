use chrono::Local;
use log::{error, info};
use serde_json::Value;
use std::process::ExitCode;
use std::sync::Arc;

use rowboard::commands::{self, AppCommand};
use rowboard::storage::establish_connection;
use rowboard::AppConfig;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let config = AppConfig::from_env();

    if let Err(e) = init_logging(&config) {
        eprintln!("✗ 日志初始化失败: {}", e);
    }

    let line = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let cmd: AppCommand = line
        .parse()
        .unwrap_or_else(|_| AppCommand::Unknown(line.clone()));

    match run(cmd, &config).await {
        Ok(Value::String(text)) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Ok(out) => {
            match serde_json::to_string_pretty(&out) {
                Ok(s) => println!("{}", s),
                Err(e) => println!("{}", e),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("✗ 命令失败 `{}`: {:#}", line, e);
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cmd: AppCommand, config: &AppConfig) -> anyhow::Result<Value> {
    if cmd == AppCommand::Help {
        return Ok(Value::String(commands::HELP.to_string()));
    }
    let db = establish_connection(config).await?;
    info!("数据库: {}, 租户: {}", config.database_url, config.tenant_id);
    commands::execute(cmd, Arc::new(db), config).await
}

fn init_logging(config: &AppConfig) -> std::io::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    std::fs::create_dir_all(&config.log_dir)?;
    let log_path = config.log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(log_path)?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Warn)
        .filter_module("rowboard", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error)
        .init();
    Ok(())
}
