//! Core library entry for `anonid`.
//!
//! The library allocates and persistently caches an anonymous identifier
//! for a client that has not signed in; see [`identity`]. The rest of the
//! crate wires the storage scope and randomness source in as ports so the
//! allocation can be driven live, recorded, or replayed.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod ports;

pub use error::IdentityError;
pub use identity::{AllocationState, AnonymousId, AnonymousIdentityStore, ANON_ID_KEY};

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };

    let settings = Settings::load(cli.store.as_deref(), cli.verbose);
    init_tracing(&settings.log_filter);
    commands::dispatch(&cli.command, &settings)
}

/// Install the stderr log subscriber. Later calls are no-ops.
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
