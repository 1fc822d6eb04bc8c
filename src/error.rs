use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("entity not found: {0}")]
    EntityNotFound(String),
    #[error("chart config {0} has no entity scope")]
    MissingEntity(i32),
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid chart config: {0}")]
    InvalidConfig(String),
}
