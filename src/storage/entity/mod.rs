pub mod chart_computed_field;
pub mod chart_config;
pub mod chart_filter;
pub mod chart_group_by;
pub mod chart_metric;
pub mod entity_def;
pub mod entity_relationship;
pub mod entity_row;
pub mod entity_view;
pub mod property;
pub mod property_option;
pub mod row_relation;
pub mod row_value;

pub use chart_config::Entity as ChartConfigRecord;
pub use entity_def::Entity as EntityDef;
pub use entity_row::Entity as EntityRow;
pub use row_value::Entity as RowValueRecord;
