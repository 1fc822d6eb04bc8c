pub mod aggregate;
pub mod model;
pub mod predicate;
pub mod service;
pub mod source;

pub use model::{
    ArithmeticOperator, CategoryRow, ChartConfig, ChartData, ChartFilter, ComputedField,
    EvaluatedChart, FilterOperator, GroupBy, Metric, MetricOperation, PropertyRef,
    RequestContext, SkippedItem, SkippedKind, TimeGranularity, VisualizationType,
};
pub use predicate::{PropertyIndex, RowQuery};
pub use service::ReportService;
pub use source::{EntityLookup, RowSource};
