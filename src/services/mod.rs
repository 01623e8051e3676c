//! Session services.
//!
//! ARCHITECTURE
//! ============
//! Loaders (`claims`, `profile`, `preferences`) each own one source of
//! session data and know nothing about each other. `manager` sequences them
//! for every identity change and publishes the result through the cache.

pub mod claims;
pub mod manager;
pub mod preferences;
pub mod profile;
