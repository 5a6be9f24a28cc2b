use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Build-time validation of rule annotations in compiled module images.
///
/// Exits with 0 when every rule compiles, 1 when any rule fails to compile,
/// and 2 when validation itself could not complete.
#[derive(Parser, Debug)]
#[command(name = "rulecheck", version, about)]
pub struct CliArgs {
    /// Path to a TOML config file (overrides RULECHECK_* environment variables)
    #[arg(long, global = true, env = "RULECHECK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile every rule annotation in a module image
    Validate {
        /// Module image to validate
        binary: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate, then validate again every time the module image is rebuilt
    Watch {
        /// Module image to watch
        binary: PathBuf,

        /// Quiet period after the last change before re-validating
        #[arg(long, default_value_t = 500)]
        debounce_ms: u64,

        /// Print each report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a module image from a YAML module description
    Pack {
        /// YAML module description
        manifest: PathBuf,

        /// Output path (default: <name>.<extension> next to the manifest)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List the rule annotations found in a module image
    Inspect {
        /// Module image to inspect
        binary: PathBuf,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
}
