mod cli;
mod pack;
mod report;
mod watch;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rulecheck_core::Config;
use rulecheck_expressive::ExpressiveRules;
use rulecheck_rules::Validator;
use tracing::error;

use crate::cli::{CliArgs, Command};
use crate::report::Report;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    rulecheck_core::load_dotenv();
    let args = CliArgs::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "rulecheck failed");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode> {
    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    config.log_summary();

    match args.command {
        Command::Validate { binary, json } => {
            let validator = validator(&config);
            let report = Report::run(&validator, &binary);
            watch::print_report(&report, json)?;
            Ok(ExitCode::from(report.exit_code()))
        }
        Command::Watch {
            binary,
            debounce_ms,
            json,
        } => {
            let validator = validator(&config);
            watch::run(&validator, &binary, Duration::from_millis(debounce_ms), json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Pack { manifest, out } => {
            let path = pack::run(&manifest, out.as_deref(), &config)?;
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Inspect { binary, json } => {
            let validator = validator(&config);
            let sites = validator
                .rule_sites(&binary)
                .with_context(|| format!("failed to load {}", binary.display()))?;
            if json {
                println!("{}", report::render_sites_json(&sites)?);
            } else {
                print!("{}", report::render_sites_text(&sites));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn validator(config: &Config) -> Validator {
    Validator::new(config, Arc::new(ExpressiveRules::new()))
}
