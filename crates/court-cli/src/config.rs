//! # Config CLI — Check and print court configurations.
//!
//! ```bash
//! court config check court.yaml
//! court config default --json
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};

use court_core::CourtConfig;

use crate::load_document;

/// Config subcommand arguments.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Load a configuration file (YAML or JSON) and validate it.
    Check {
        /// Path to the configuration file.
        file: PathBuf,
    },

    /// Print the default configuration.
    Default {
        /// Print JSON instead of YAML.
        #[arg(long)]
        json: bool,
    },
}

/// Execute the config subcommand.
pub fn run_config(args: &ConfigArgs) -> Result<u8> {
    match &args.command {
        ConfigCommand::Check { file } => run_check(file),
        ConfigCommand::Default { json } => {
            println!("{}", render_default(*json)?);
            Ok(0)
        }
    }
}

fn run_check(file: &Path) -> Result<u8> {
    let config: CourtConfig = load_document(file)?;
    match config.validate() {
        Ok(()) => {
            println!("{}: VALID", file.display());
            for line in summarize(&config) {
                println!("  {line}");
            }
            Ok(0)
        }
        Err(err) => {
            eprintln!("{}: INVALID", file.display());
            eprintln!("  - {err}");
            Ok(1)
        }
    }
}

/// The default configuration in YAML, or pretty JSON.
pub fn render_default(json: bool) -> Result<String> {
    let config = CourtConfig::default();
    if json {
        Ok(serde_json::to_string_pretty(&config)?)
    } else {
        Ok(serde_yaml::to_string(&config)?)
    }
}

/// One line per headline parameter of `config`.
pub fn summarize(config: &CourtConfig) -> Vec<String> {
    let terms = &config.terms;
    let disputes = &config.disputes;
    let lock = config
        .lock_per_slot()
        .map(|amount| amount.to_string())
        .unwrap_or_else(|_| "overflow".to_string());
    vec![
        format!(
            "fees:       juror {} / draft {} / settle {} per slot",
            config.fees.juror_fee, config.fees.draft_fee, config.fees.settle_fee
        ),
        format!(
            "phases:     commit {} / reveal {} / appeal {} / confirm {} terms",
            terms.commit_terms, terms.reveal_terms, terms.appeal_terms, terms.appeal_confirm_terms
        ),
        format!(
            "panels:     {} jurors, x{} per appeal, final after {} rounds",
            disputes.first_round_jurors_number,
            disputes.appeal_step_factor,
            disputes.max_regular_appeal_rounds
        ),
        format!(
            "rulings:    {}..={}",
            disputes.min_possible_rulings, disputes.max_possible_rulings
        ),
        format!("lock/slot:  {lock}"),
    ]
}
