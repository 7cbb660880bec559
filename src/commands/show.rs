//! `anonid show` command.

use crate::context::ServiceContext;
use crate::identity::{AnonymousId, AnonymousIdentityStore};

/// Message printed when the scope holds no identifier.
pub const NOT_ALLOCATED: &str = "No anonymous id allocated";

/// Execute the `show` command. Never writes to storage.
///
/// # Errors
///
/// Returns an error string if the storage scope cannot be read.
pub fn run(ctx: &ServiceContext) -> Result<String, String> {
    let id = AnonymousIdentityStore::from_context(ctx).peek().map_err(|e| e.to_string())?;
    Ok(id.map_or_else(|| NOT_ALLOCATED.to_string(), AnonymousId::into_inner))
}
