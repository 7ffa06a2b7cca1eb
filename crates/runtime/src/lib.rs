//! Runtime bootstrap: tracing, configuration, the shared serving context and the
//! pipeline boundary operations.

use std::io;
use std::path::PathBuf;

use sc_core::CoreError;

pub mod analytics;
pub mod config;
pub mod context;
pub mod loader;
pub mod metrics;
pub mod persist;
pub mod pipeline;

pub use config::{
    ConfigError, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig, PipelineConfig,
};
pub use context::AppContext;
pub use persist::BundleArtifact;

#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not access `{path}`: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

pub fn init_tracing(cfg: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = match cfg.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
