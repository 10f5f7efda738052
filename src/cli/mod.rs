use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "darf")]
#[command(version, about = "Brazilian B3 capital-gains tax (DARF) calculator")]
#[command(
    long_about = "Classify a transaction ledger into fixed-income, day-trade and normal operations, track average-cost positions and compute the DARF due, carrying losses and sub-minimum values between runs."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Tax rules file (TOML); defaults to <config dir>/darf/config.toml when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the DARF for a transaction ledger
    Calculate {
        /// Path to the ;-separated ledger CSV
        file: PathBuf,

        /// State file with positions and carried balances (read if present)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Write the updated state back after a successful run
        #[arg(long, requires = "state")]
        save: bool,

        /// Tax period (YYYY-MM) used for the DARF due date
        #[arg(long)]
        period: Option<String>,
    },

    /// Show how a ledger splits into fixed-income, day-trade and normal operations
    Classify {
        /// Path to the ;-separated ledger CSV
        file: PathBuf,
    },

    /// List positions held in a state file
    Positions {
        /// State file written by `calculate --save`
        #[arg(long)]
        state: PathBuf,
    },
}
