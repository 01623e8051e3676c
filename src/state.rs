//! Session state.
//!
//! DESIGN
//! ======
//! `session` defines the immutable-by-convention `Session` record and its
//! derived projections. `cache` wraps it in a generation-tagged watch channel
//! so stale asynchronous work can be detected and discarded.

pub mod cache;
pub mod session;
