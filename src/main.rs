//! Runs a manifest of family, class and redirect declarations against a
//! fresh registry and prints the answer to every membership query in it.
//!
//! Usage: `conformable [manifest.json]`
//!
//! Without an argument the manifest named in the settings is used.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};

use conformable::error::{ConformableError, Result};
use conformable::manifest::{Manifest, Runner};
use conformable::registry::Registry;
use conformable::settings::{OutputFormat, Settings, init_tracing};

fn run() -> Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log_filter);

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or(settings.manifest.clone())
        .ok_or_else(|| ConformableError::Config("no manifest given".to_string()))?;
    let manifest = Manifest::from_path(&path)?;
    info!(path = %path.display(), statements = manifest.statements.len(), "manifest loaded");

    let registry = Registry::new();
    let outcomes = Runner::new(&registry).run(&manifest)?;
    match settings.output {
        OutputFormat::Text => {
            for outcome in outcomes.iter() {
                println!("{}", outcome);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "manifest run failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
