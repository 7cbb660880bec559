//! Command dispatch and handlers.

pub mod clear;
pub mod get;
pub mod show;
pub mod status;

use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::config::Settings;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler and print its output.
///
/// When `settings.record_dir` is set, all port interactions are recorded to
/// per-port cassette files in a fresh session directory under it.
///
/// # Errors
///
/// Returns an error string if recording cannot be set up or finished, or if
/// the selected command handler fails.
pub fn dispatch(command: &Command, settings: &Settings) -> Result<(), String> {
    let session = settings.record_dir.as_deref().map(RecordingSession::new).transpose()?;
    let ctx = match &session {
        Some(session) => ServiceContext::recording(&settings.store_dir, session),
        None => ServiceContext::live(&settings.store_dir),
    };

    let result = dispatch_with_context(command, &ctx);

    // Finish recording after command completes (even on error)
    if let Some(session) = session {
        // Drop context first to release Arc references
        drop(ctx);
        finish_recording(session)?;
    }

    println!("{}", result?);
    Ok(())
}

/// Dispatch a command with the given service context, returning its output.
///
/// # Errors
///
/// Returns an error string if the command handler fails.
pub fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<String, String> {
    match command {
        Command::Get { ephemeral_fallback } => get::run(ctx, *ephemeral_fallback),
        Command::Show => show::run(ctx),
        Command::Status => status::run(ctx),
        Command::Clear => clear::run(ctx),
    }
}

/// Finish a recording session and report the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    tracing::info!(dir = %output_dir.display(), "recording saved");
    Ok(())
}
