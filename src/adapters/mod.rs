//! Adapter implementations for the port traits.
//!
//! - `live`: real disk storage and real randomness.
//! - `recording`: wraps another adapter and captures each call to a cassette.
//! - `replaying`: serves previously recorded calls from a cassette.

pub mod live;
pub mod recording;
pub mod replaying;
