//! CLI module for tiered-cache-repo
//!
//! Provides subcommands for inspecting cache behavior without a running store:
//! - `decide`: evaluate a cache-control policy against an entry's age
//! - `config`: print the effective configuration

pub mod decide;
pub mod show_config;

use clap::{Parser, Subcommand};

/// tiered-cache-repo - Two-tier read-through/write-through cache toolkit
#[derive(Parser)]
#[command(name = "tiered-cache-repo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate which action a policy prescribes for a cached entry
    Decide(decide::DecideArgs),

    /// Print the effective configuration as JSON
    Config,
}
