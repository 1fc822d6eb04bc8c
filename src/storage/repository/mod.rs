pub mod chart_repo;
pub mod row_repo;
pub mod schema_repo;

pub use chart_repo::ChartRepository;
pub use row_repo::{NewRow, RowRepository};
pub use schema_repo::SchemaRepository;
