pub mod commands;
pub mod config;
pub mod error;
pub mod relations;
pub mod report;
pub mod schema;
pub mod storage;
pub mod values;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::AppConfig;
pub use error::ReportError;
