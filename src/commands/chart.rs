use anyhow::{bail, Context};
use log::info;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};

use crate::report::ChartConfig;
use crate::storage::ChartRepository;

pub async fn list(db: &DatabaseConnection) -> anyhow::Result<Value> {
    let charts = ChartRepository::list_all(db).await?;
    Ok(serde_json::to_value(charts)?)
}

pub async fn show(db: &DatabaseConnection, id: i32) -> anyhow::Result<Value> {
    let chart = ChartRepository::get(db, id)
        .await?
        .with_context(|| format!("图表不存在: {id}"))?;
    Ok(serde_json::to_value(chart)?)
}

pub async fn delete(db: &DatabaseConnection, id: i32) -> anyhow::Result<Value> {
    if !ChartRepository::delete(db, id).await? {
        bail!("图表不存在: {id}");
    }
    info!("✓ 图表已删除: {}", id);
    Ok(json!({ "deleted": id }))
}

/// 文件内容为单个图表配置或配置数组
pub fn parse_import(content: &str) -> anyhow::Result<Vec<ChartConfig>> {
    let value: Value = serde_json::from_str(content).context("图表文件不是合法 JSON")?;
    let configs = match value {
        Value::Array(_) => serde_json::from_value::<Vec<ChartConfig>>(value)?,
        other => vec![serde_json::from_value::<ChartConfig>(other)?],
    };
    Ok(configs)
}

pub async fn import(db: &DatabaseConnection, path: &str) -> anyhow::Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取 {path}"))?;
    let configs = parse_import(&content)?;

    let mut created = Vec::with_capacity(configs.len());
    for cfg in &configs {
        created.push(ChartRepository::create(db, cfg).await?);
    }
    info!("✓ 已导入 {} 个图表 ({})", created.len(), path);
    Ok(serde_json::to_value(created)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::VisualizationType;

    #[test]
    fn test_parse_import_single_and_array() {
        let one = parse_import(
            r#"{"entityId": 1, "groupSlug": "jobs", "visualizationType": "stat chart"}"#,
        )
        .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].visualization_type, VisualizationType::Stat);

        let many = parse_import(
            r#"[
                {"entityId": 1, "groupSlug": "jobs", "visualizationType": "bar",
                 "groupBy": {"property": "status"}},
                {"entitySlug": "job", "groupSlug": "jobs", "visualizationType": "line",
                 "computedFields": [{"fieldA": 3, "fieldB": "bonus", "operator": "x"}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].computed_fields.len(), 1);

        let numeric = parse_import(
            r#"{"entityId": 1, "groupSlug": "jobs", "visualizationType": "stat",
                "filters": [{"field": "salary", "operator": ">", "value": 20}]}"#,
        )
        .unwrap();
        assert_eq!(numeric[0].filters[0].value, "20");

        assert!(parse_import("not json").is_err());
        assert!(parse_import(r#"{"groupSlug": "jobs", "visualizationType": "radar"}"#).is_err());
    }
}
