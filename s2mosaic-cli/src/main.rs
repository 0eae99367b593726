//! s2mosaic CLI - Command-line interface
//!
//! This binary provides a command-line interface to the s2mosaic library.

mod commands;
mod error;
mod progress;
mod runner;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::mosaic::MosaicArgs;
use commands::scenes::ScenesArgs;

#[derive(Debug, Parser)]
#[command(name = "s2mosaic")]
#[command(version = s2mosaic::VERSION)]
#[command(about = "Cloud-free Sentinel-2 mosaics from the Planetary Computer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a mosaic for one grid tile and period
    Mosaic(MosaicArgs),

    /// List the scenes a mosaic would use, in compositing order
    Scenes(ScenesArgs),

    /// Manage the band cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Write the default configuration file
    Init,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Mosaic(args) => commands::mosaic::run(args),
        Command::Scenes(args) => commands::scenes::run(args),
        Command::Cache { action } => commands::cache::run(action),
        Command::Init => commands::init::run(),
    };

    if let Err(e) = result {
        e.exit();
    }
}
