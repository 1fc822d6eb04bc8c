pub mod connection;
pub mod entity;
pub mod repository;
pub mod row_source;

pub use connection::{create_tables, establish_connection};
pub use repository::{ChartRepository, NewRow, RowRepository, SchemaRepository};
pub use row_source::DbRowSource;
