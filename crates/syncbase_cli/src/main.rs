//! SyncBase CLI
//!
//! Command-line tools for a file-backed SyncBase data directory.
//!
//! # Commands
//!
//! - `init` - Create the data directory and the table of every kind
//! - `snapshot` - Print a full snapshot
//! - `delta` - Print the changes after a cursor
//! - `apply` - Apply one change envelope from a file
//! - `serve` - Run the live channel listener and apply envelopes from stdin

mod commands;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SyncBase command-line tools.
#[derive(Parser)]
#[command(name = "syncbase")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Server configuration file (JSON)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and its tables
    Init {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print every record of every kind
    Snapshot {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Print records and tombstones newer than a cursor
    Delta {
        /// Cursor in milliseconds since the Unix epoch
        #[arg(short, long)]
        since: i64,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Apply one change envelope
    Apply {
        /// File holding the envelope JSON
        envelope: PathBuf,
    },

    /// Serve live channels and apply envelopes read from stdin
    Serve {
        /// Listener address, overriding the configuration
        #[arg(short, long)]
        addr: Option<SocketAddr>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { format } => {
            let path = cli.path.ok_or("Data directory required for init")?;
            commands::init::run(&path, config, &format)?;
        }
        Commands::Snapshot { pretty } => {
            let path = cli.path.ok_or("Data directory required for snapshot")?;
            commands::snapshot::run(&path, config, pretty)?;
        }
        Commands::Delta { since, pretty } => {
            let path = cli.path.ok_or("Data directory required for delta")?;
            commands::snapshot::run_delta(&path, config, since, pretty)?;
        }
        Commands::Apply { envelope } => {
            let path = cli.path.ok_or("Data directory required for apply")?;
            commands::apply::run(&path, config, &envelope)?;
        }
        Commands::Serve { addr } => {
            let path = cli.path.ok_or("Data directory required for serve")?;
            commands::serve::run(&path, config, addr)?;
        }
        Commands::Version => {
            println!("SyncBase CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
