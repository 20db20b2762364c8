pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tablesafe_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "tablesafe",
    about = "Guarded restaurant-ordering assistant",
    long_about = "Run the guarded chat demo, inspect effective configuration, and probe \
                  backend readiness.",
    after_help = "Examples:\n  tablesafe chat\n  tablesafe chat --baseline\n  tablesafe doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start the interactive guarded chat loop")]
    Chat {
        #[arg(long, help = "Load the menu from a TOML file instead of the built-in demo menu")]
        menu: Option<PathBuf>,
        #[arg(long, help = "Bypass all guardrails and show raw model output")]
        baseline: bool,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config and probe embedding/LLM backend readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn init_logging(config: &AppConfig) {
    use tablesafe_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);

    let result = match cli.command {
        Command::Chat { menu, baseline } => commands::chat::run(&config, menu, baseline).await,
        Command::Config => {
            println!("{}", commands::config::run(&config));
            Ok(())
        }
        Command::Doctor { json } => {
            println!("{}", commands::doctor::run(&config, json).await);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}
