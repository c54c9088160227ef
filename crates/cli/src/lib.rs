pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cotation",
    about = "Cotation operator CLI",
    long_about = "Inspect configuration, check rate table readiness, \
                  and run quote conversations from the terminal.",
    after_help = "Examples:\n  cotation doctor --json\n  cotation config\n  cotation tables\n  \
                  cotation chat --export-dir exports"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and rate table loading")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Summarize loaded rate tables: key counts, age ranges and step order")]
    Tables,
    #[command(about = "Run an interactive quote conversation on stdin/stdout")]
    Chat {
        #[arg(long, default_value = ".", help = "Directory receiving exported recap files")]
        export_dir: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Tables => commands::tables::run(),
        Command::Chat { export_dir } => commands::chat::run(&export_dir),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
