use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::error::ReportError;
use crate::report::predicate::RowQuery;
use crate::report::source::{EntityLookup, RowSource};
use crate::schema::{Entity, Property};
use crate::storage::repository::{RowRepository, SchemaRepository};
use crate::values::Row;

/// 基于 sqlite 仓储的 RowSource
#[derive(Clone)]
pub struct DbRowSource {
    db: Arc<DatabaseConnection>,
}

impl DbRowSource {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RowSource for DbRowSource {
    async fn find_entity(&self, lookup: EntityLookup<'_>) -> Result<Option<Entity>, ReportError> {
        Ok(SchemaRepository::load_entity(&self.db, lookup).await?)
    }

    async fn find_properties(&self, ids: &[i32]) -> Result<Vec<Property>, ReportError> {
        Ok(SchemaRepository::find_properties(&self.db, ids).await?)
    }

    async fn find_rows(&self, query: &RowQuery) -> Result<Vec<Row>, ReportError> {
        Ok(RowRepository::find_rows(&self.db, query).await?)
    }

    async fn count_rows(&self, query: &RowQuery) -> Result<u64, ReportError> {
        Ok(RowRepository::count_rows(&self.db, query).await?)
    }
}
