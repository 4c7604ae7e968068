mod commands;
mod config;
mod fetch;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::CalmergeConfig;

#[derive(Parser)]
#[command(name = "calmerge")]
#[command(about = "Merge booking calendar feeds, spot double-bookings and export one calendar")]
#[command(version)]
struct Cli {
    /// Log debug details to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.config/calmerge/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the configured feeds
    Sources {
        #[command(subcommand)]
        command: SourcesCommand,
    },
    /// Fetch every source and print the merged events
    Merge {
        /// Also merge these .ics files
        #[arg(short, long = "upload", value_name = "FILE")]
        uploads: Vec<PathBuf>,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Print overlapping bookings
    Conflicts {
        /// Also merge these .ics files
        #[arg(short, long = "upload", value_name = "FILE")]
        uploads: Vec<PathBuf>,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Write the merged calendar to a .ics file
    Export {
        /// Output file (defaults to export_path from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also merge these .ics files
        #[arg(short, long = "upload", value_name = "FILE")]
        uploads: Vec<PathBuf>,

        /// Write whole-day events as dates instead of UTC timestamps
        #[arg(long)]
        all_day_as_date: bool,
    },
    /// Re-export periodically until interrupted
    Watch,
}

#[derive(Subcommand)]
enum SourcesCommand {
    /// List configured sources
    List,
    /// Add a feed by URL or file path
    Add {
        #[arg(short, long)]
        name: String,

        /// airbnb, vrbo, booking, manual or other
        #[arg(short, long)]
        kind: Option<String>,

        #[arg(long, conflicts_with = "path")]
        url: Option<String>,

        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Remove a source by id
    Remove {
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Sources { command } => {
            let mut config = CalmergeConfig::load(config_path)?;
            match command {
                SourcesCommand::List => commands::sources::list(&config),
                SourcesCommand::Add {
                    name,
                    kind,
                    url,
                    path,
                } => commands::sources::add(&mut config, name, kind, url, path),
                SourcesCommand::Remove { id, force } => {
                    commands::sources::remove(&mut config, &id, force)
                }
            }
        }
        Commands::Merge { uploads, json } => {
            let config = require_sources(config_path, &uploads)?;
            commands::merge::run(&config, &uploads, json).await
        }
        Commands::Conflicts { uploads, json } => {
            let config = require_sources(config_path, &uploads)?;
            commands::conflicts::run(&config, &uploads, json).await
        }
        Commands::Export {
            output,
            uploads,
            all_day_as_date,
        } => {
            let config = require_sources(config_path, &uploads)?;
            commands::export::run(&config, output, &uploads, all_day_as_date).await
        }
        Commands::Watch => {
            require_sources(config_path, &[])?;
            commands::watch::run(config_path).await
        }
    }
}

fn require_sources(config_path: Option<&std::path::Path>, uploads: &[PathBuf]) -> Result<CalmergeConfig> {
    let config = CalmergeConfig::load(config_path)?;

    if config.sources.is_empty() && uploads.is_empty() {
        anyhow::bail!(
            "No sources configured.\n\n\
            Add your first feed with:\n  \
            calmerge sources add --name <NAME> --url <URL>\n\n\
            Example:\n  \
            calmerge sources add --name \"Beach house\" --kind airbnb --url https://www.airbnb.com/calendar/ical/123.ics"
        );
    }

    Ok(config)
}
