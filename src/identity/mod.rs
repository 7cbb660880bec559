//! Anonymous identity allocation.
//!
//! An anonymous identifier is allocated lazily the first time a client asks
//! for one, stored under [`ANON_ID_KEY`] in the client's persistent storage
//! scope, and returned unchanged from then on until something outside this
//! module clears the scope.

pub mod id;
pub mod store;

pub use id::{AllocationState, AnonymousId};
pub use store::{AnonymousIdentityStore, ANON_ID_KEY};
