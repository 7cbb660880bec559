//! `anonid clear` command.

use crate::context::ServiceContext;
use crate::identity::ANON_ID_KEY;

/// Execute the `clear` command. Clearing an empty scope succeeds.
///
/// # Errors
///
/// Returns an error string if the storage scope cannot be written.
pub fn run(ctx: &ServiceContext) -> Result<String, String> {
    ctx.store
        .remove(ANON_ID_KEY)
        .map_err(|e| format!("Failed to clear anonymous id: {e}"))?;
    Ok("Cleared anonymous id".to_string())
}
