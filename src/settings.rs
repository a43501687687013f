//! Settings for the `conformable` binary.
//!
//! Values come from built-in defaults, then an optional config file
//! (`conformable.json`, or the path in `CONFORMABLE_CONFIG`), then
//! `CONFORMABLE_*` environment variables.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

pub const DEFAULT_CONFIG: &str = "conformable.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Filter directive for the log subscriber, e.g. `info` or `conformable=trace`.
    pub log_filter: String,
    /// Manifest to run when none is given on the command line.
    pub manifest: Option<PathBuf>,
    pub output: OutputFormat,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let path = std::env::var("CONFORMABLE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
        Self::load_from(path)
    }
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder()
            .set_default("log_filter", "info")?
            .set_default("output", "text")?
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("CONFORMABLE"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

/// Installs the global log subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    // a subscriber may already be installed, e.g. by a test harness
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
