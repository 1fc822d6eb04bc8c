use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::report::{ReportService, RequestContext, RowSource};
use crate::storage::{ChartRepository, DbRowSource};

/// 计算 group 下的图表：`entity_id` 为空时取 group 级图表
pub async fn run(
    db: Arc<DatabaseConnection>,
    config: &AppConfig,
    entity_id: Option<i32>,
    group: &str,
) -> anyhow::Result<Value> {
    let mut charts = match entity_id {
        Some(id) => ChartRepository::list_for_entity_group(&db, id, group).await?,
        None => ChartRepository::list_global(&db, group).await?,
    };
    charts.retain(|c| c.visible_to(config.tenant_id));

    let source: Arc<dyn RowSource> = Arc::new(DbRowSource::new(db));
    let service = ReportService::from_config(source, config);
    let results = service
        .evaluate_all(&charts, config.tenant_id, &RequestContext::now())
        .await;
    Ok(serde_json::to_value(results)?)
}
