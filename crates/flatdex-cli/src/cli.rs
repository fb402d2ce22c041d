use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "flatdex", version, about = "Generates Flatpak registry index files")]
pub struct Args {
    /// Path to the config file
    #[arg(short, long, global = true, default_value = "flatdex.toml")]
    pub config: PathBuf,

    /// Show verbose debugging output (repeat for trace output)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Query the backends once and write the snapshot and index files
    Index,

    /// Keep the snapshot and index files fresh on a fixed interval
    Daemon,
}
