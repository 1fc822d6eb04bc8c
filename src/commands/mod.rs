pub mod app_command;
pub mod browse;
pub mod chart;
pub mod demo;
pub mod report;

pub use app_command::{AppCommand, HELP};

use anyhow::bail;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::sync::Arc;

use crate::config::AppConfig;

/// 执行命令，返回要输出的 JSON
pub async fn execute(
    cmd: AppCommand,
    db: Arc<DatabaseConnection>,
    config: &AppConfig,
) -> anyhow::Result<Value> {
    let tenant = config.tenant_id;
    match cmd {
        AppCommand::Demo => demo::run(&db, tenant).await,
        AppCommand::Entities => browse::entities(&db, tenant).await,
        AppCommand::Entity { id } => browse::entity(&db, id).await,
        AppCommand::Rows { entity_id } => browse::rows(&db, tenant, entity_id).await,
        AppCommand::Charts => chart::list(&db).await,
        AppCommand::ChartShow { id } => chart::show(&db, id).await,
        AppCommand::ChartDelete { id } => chart::delete(&db, id).await,
        AppCommand::ChartImport { path } => chart::import(&db, &path).await,
        AppCommand::Report { entity_id, group } => {
            report::run(db, config, Some(entity_id), &group).await
        }
        AppCommand::ReportGlobal { group } => report::run(db, config, None, &group).await,
        AppCommand::Help => Ok(Value::String(HELP.to_string())),
        AppCommand::Unknown(msg) => bail!("{msg}\n\n{HELP}"),
    }
}
