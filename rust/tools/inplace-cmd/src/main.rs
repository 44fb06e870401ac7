use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

mod commands;
mod config;

use config::AllocatorKind;

#[derive(Parser)]
#[command(name = "inplace-cmd")]
#[command(about = "Command-line utility for exploring in-place buffer resizing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workload of vector operations and report how each resize was carried out
    Simulate {
        /// Path to the JSON workload file
        #[arg(short, long)]
        config: PathBuf,

        /// Increase verbosity (-v for resize decisions, -vv for every probe)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Show which in-place resize form an allocator supports
    Probe {
        /// Allocator to probe
        #[arg(short, long, value_enum)]
        allocator: AllocatorKind,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { config, verbose } => {
            init_logging(verbose);
            commands::simulate::run(&config)
        }
        Commands::Probe { allocator } => commands::probe::run(allocator),
    }
}

/// Routes `log` records to stderr, filtered by the `-v` count.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
