pub mod commands;

use clap::{Parser, Subcommand};
use datadada_core::catalog::CatalogKind;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "datadada",
    about = "Data Dada operator CLI",
    long_about = "Inspect Data Dada configuration, check readiness, and preview catalog lists.",
    after_help = "Examples:\n  datadada doctor --json\n  datadada config\n  datadada lookup data-sources"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and check that both catalog lists can be fetched")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Fetch a catalog list and print it the way the bot formats it")]
    Lookup {
        #[arg(help = "Which list to fetch: dashboards or data-sources")]
        kind: CatalogKind,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Lookup { kind } => commands::lookup::run(kind),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
