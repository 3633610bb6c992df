#![cfg(not(tarpaulin_include))]

use clap::{Parser, Subcommand};
use log::info;
use outreach::app;
use outreach::config::Config;
use outreach::downloader;
use outreach::entry::EntryWriter;
use outreach::error::SubmitError;
use std::path::PathBuf;
use std::process::ExitCode;

/// Outreach submission form
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file (defaults to ./outreach.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the web form (default)
    Serve {
        /// Address to listen on, overriding server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Record one entry from the command line
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        reference: String,
    },
    /// Print the table as CSV
    Export,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            app::run(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Submit {
            name,
            email,
            reference,
        } => {
            let (name, email, reference) = (name.trim(), email.trim(), reference.trim());
            if name.is_empty() || email.is_empty() || reference.is_empty() {
                eprintln!("Please fill in all fields.");
                return Ok(ExitCode::FAILURE);
            }

            let writer = EntryWriter::new(config.open_store()?, config.layout)?;
            match writer.submit(name, email, reference) {
                Ok(row) => {
                    info!("Submitted from command line");
                    println!("Entry submitted successfully (row {}).", row);
                    Ok(ExitCode::SUCCESS)
                }
                Err(SubmitError::DuplicateEmail { email }) => {
                    eprintln!("This email already exists in the sheet: {}", email);
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::Export => {
            let writer = EntryWriter::new(config.open_store()?, config.layout)?;
            print!("{}", downloader::to_csv(&writer.snapshot()?));
            Ok(ExitCode::SUCCESS)
        }
    }
}
