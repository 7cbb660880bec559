//! `anonid get` command.

use crate::context::ServiceContext;
use crate::identity::{AnonymousId, AnonymousIdentityStore};

/// Execute the `get` command, returning the identifier to print.
///
/// With `ephemeral_fallback`, a storage failure yields an unpersisted id
/// instead of an error.
///
/// # Errors
///
/// Returns an error string if no identifier can be produced.
pub fn run(ctx: &ServiceContext, ephemeral_fallback: bool) -> Result<String, String> {
    let store = AnonymousIdentityStore::from_context(ctx);
    let id = if ephemeral_fallback { store.get_or_ephemeral() } else { store.get_anonymous_id() };
    id.map(AnonymousId::into_inner).map_err(|e| e.to_string())
}
