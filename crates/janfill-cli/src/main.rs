mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use janfill::config::{check_secrets, default_config_path, load_config};
use janfill::{Config, LogProgress, Pipeline, PipelineConfig, RunOutcome};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "janfill", version, about = "Fill product details for JAN/ISBN codes in a spreadsheet")]
struct Cli {
    /// Config file (defaults to <config dir>/janfill/config.json)
    #[arg(long, short, global = true, env = "JANFILL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Enrich the sheet, resuming from the start row
    Run {
        /// First data row to scan; overrides batch.start_row
        #[arg(long)]
        start_row: Option<u32>,

        /// Rows per window; overrides batch.size
        #[arg(long)]
        batch_size: Option<u32>,
    },
    /// Check a config file without contacting any service
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level, cli.log_json) {
        eprintln!("Failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(config_path) = cli.config.clone().or_else(default_config_path) else {
        error!("No config file given and no platform config directory found");
        return ExitCode::FAILURE;
    };

    let mut config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Validate => validate(&config),
        Command::Run {
            start_row,
            batch_size,
        } => {
            if let Some(start_row) = start_row {
                config.batch.start_row = start_row;
            }
            if let Some(batch_size) = batch_size {
                config.batch.size = batch_size;
            }
            run(&config).await
        }
    }
}

fn validate(config: &Config) -> ExitCode {
    if let Err(e) = check_secrets(config) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    match PipelineConfig::from_config(config).and_then(|c| c.validate().map(|_| c)) {
        Ok(pipeline) => {
            info!(
                sheet = %pipeline.sheet,
                family = %pipeline.family,
                providers = config.providers.len(),
                "config is valid"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> ExitCode {
    let pipeline = match Pipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        sheet = %pipeline.config().sheet,
        start_row = pipeline.config().start_row,
        batch_size = pipeline.config().batch_size,
        providers = ?pipeline.chain().provider_ids(),
        "starting run"
    );
    let result = pipeline.run(&LogProgress).await;

    for warning in &result.warnings {
        tracing::warn!("{}", warning);
    }

    match result.outcome {
        RunOutcome::Done => ExitCode::SUCCESS,
        RunOutcome::Fatal => {
            if let Some(message) = result.error_message() {
                error!("{}", message);
            }
            ExitCode::FAILURE
        }
    }
}
