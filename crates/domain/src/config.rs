pub mod errors;
pub mod ingest;
pub mod logging;
pub mod output;
pub mod root;
pub mod server;

pub use errors::ConfigError;
pub use ingest::{DispatchMode, IngestConfig};
pub use logging::LoggingConfig;
pub use output::OutputConfig;
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
