pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use carepath_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "carepath",
    about = "Carepath lifecycle operator CLI",
    long_about = "Inspect transition tables, check status transitions, walk the booking workflow, \
                  estimate costs, and manage the lifecycle database.",
    after_help = "Examples:\n  carepath transitions booking --from pending\n  carepath check payment failed pending\n  carepath estimate --base 10000 --add-on visa:150 --tax 8"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Print the transition table for an entity kind, or the targets of one status")]
    Transitions {
        kind: String,
        #[arg(long, help = "Only list statuses reachable from this status")]
        from: Option<String>,
    },
    #[command(about = "Check whether a status transition is allowed (exit 1 when denied)")]
    Check { kind: String, from: String, to: String },
    #[command(about = "List booking workflow steps, or describe one step by slug or number")]
    Steps {
        #[arg(long)]
        from: Option<String>,
    },
    #[command(about = "Estimate cost from a base price, add-ons and tax percent")]
    Estimate {
        #[arg(long)]
        base: String,
        #[arg(long = "add-on", value_name = "CATEGORY:PRICE")]
        add_ons: Vec<String>,
        #[arg(long)]
        tax: Option<String>,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config.logging);
    }

    let result = match cli.command {
        Command::Transitions { kind, from } => commands::transitions::run(&kind, from.as_deref()),
        Command::Check { kind, from, to } => commands::check::run(&kind, &from, &to),
        Command::Steps { from } => commands::steps::run(from.as_deref()),
        Command::Estimate { base, add_ons, tax } => {
            commands::estimate::run(&base, &add_ons, tax.as_deref())
        }
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON payload.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(error) = installed {
        eprintln!("logging already initialized: {error}");
    }
}
