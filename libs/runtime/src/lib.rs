//! Process-level plumbing shared by the JSON:API host: layered configuration
//! and logging initialisation.

pub mod config;
pub mod home_dir;
pub mod logging;

pub use config::{
    default_logging_config, ApiConfig, AppConfig, CliArgs, LoggingConfig, Section, ServerConfig,
};
pub use logging::init_logging_from_config;
