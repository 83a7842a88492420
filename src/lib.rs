/// scrummage-connectors - output fan-out for security findings
///
/// This library takes the results discovered by Scrummage plugins and
/// delivers them to the configured downstream systems: the result databases,
/// ticketing, chat, email, search indexing and flat-file export. Every
/// delivery is best-effort and failures are logged, never raised.
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod formatting;
pub mod http;
pub mod resolver;
pub mod sinks;

// Re-export core types for convenience
pub use crate::core::*;
pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{ConfigError, SinkError};
pub use resolver::{ConfigProvider, JsonFileProvider, StaticConfig};
