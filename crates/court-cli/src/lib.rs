//! # court-cli — Operator CLI for the Staked-Juror Court
//!
//! Provides the `court` command-line interface.
//!
//! ## Subcommands
//!
//! - `court config check <file>` — load and validate a court configuration.
//! - `court config default [--json]` — print the default configuration.
//! - `court simulate <scenario>` — run a scripted scenario against an
//!   in-memory court and print every event as a JSON line.
//!
//! ```bash
//! court config check court.yaml
//! court simulate scenarios/appeal.yaml --seed 7
//! ```

pub mod config;
pub mod scenario;
pub mod simulate;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Document formats accepted for configuration and scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from the file extension; anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Read and deserialize a YAML or JSON document.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    match DocumentFormat::from_path(path) {
        DocumentFormat::Json => serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON in {}", path.display())),
        DocumentFormat::Yaml => serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML in {}", path.display())),
    }
}
