//! `anonid status` command.

use crate::context::ServiceContext;
use crate::identity::{AllocationState, AnonymousIdentityStore};

/// Execute the `status` command.
///
/// Prints `allocated <id>` or `unallocated`.
///
/// # Errors
///
/// Returns an error string if the storage scope cannot be read.
pub fn run(ctx: &ServiceContext) -> Result<String, String> {
    let state = AnonymousIdentityStore::from_context(ctx).state().map_err(|e| e.to_string())?;
    Ok(match state {
        AllocationState::Unallocated => "unallocated".to_string(),
        AllocationState::Allocated(id) => format!("allocated {id}"),
    })
}
