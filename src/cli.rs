//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `anonid`.
#[derive(Debug, Parser)]
#[command(name = "anonid", version, about = "Allocate and inspect the anonymous client id")]
pub struct Cli {
    /// Storage scope directory (overrides `ANONID_STORE_DIR`).
    #[arg(long, global = true, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Log at debug level unless `ANONID_LOG` is set.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the anonymous id, allocating one on first use.
    Get {
        /// Print an unpersisted id instead of failing when storage is unavailable.
        #[arg(long)]
        ephemeral_fallback: bool,
    },
    /// Print the stored anonymous id without allocating one.
    Show,
    /// Report whether the storage scope has an anonymous id.
    Status,
    /// Remove the stored anonymous id from the storage scope.
    Clear,
}
