use async_trait::async_trait;

use crate::error::ReportError;
use crate::report::predicate::RowQuery;
use crate::schema::{Entity, Property};
use crate::values::Row;

/// 如何定位图表所属实体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLookup<'a> {
    Id(i32),
    Slug(&'a str),
}

/// 报表引擎依赖的只读行存储
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn find_entity(&self, lookup: EntityLookup<'_>) -> Result<Option<Entity>, ReportError>;

    async fn find_properties(&self, ids: &[i32]) -> Result<Vec<Property>, ReportError>;

    /// 命中的行，连同其 RowValue
    async fn find_rows(&self, query: &RowQuery) -> Result<Vec<Row>, ReportError>;

    async fn count_rows(&self, query: &RowQuery) -> Result<u64, ReportError>;
}
