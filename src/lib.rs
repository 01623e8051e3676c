//! Client-side authentication state synchronization.
//!
//! SYSTEM CONTEXT
//! ==============
//! A single-page client needs one authoritative answer to "who is signed in,
//! what may they do, and which views can they open". This crate owns that
//! answer: it listens to the identity provider's change stream, enriches the
//! signed-in identity with claims, profile and preferences, and publishes
//! consistent session snapshots that the navigation guard and UI read.
//!
//! ARCHITECTURE
//! ============
//! - `ports`: traits for the identity provider, document store and
//!   key-value storage, plus in-memory implementations.
//! - `state`: the `Session` record and the versioned `SessionCache`.
//! - `services`: claims, profile and preference loaders and the
//!   `SessionManager` orchestrating them.
//! - `guard`: the pure navigation decision function.

pub mod config;
pub mod error;
pub mod guard;
pub mod ports;
pub mod services;
pub mod state;

mod util;

#[cfg(test)]
#[path = "session_helpers_test.rs"]
pub(crate) mod test_helpers;

pub use config::SessionConfig;
pub use error::{AuthError, ClaimsError, DocumentError, ErrorCode, PreferenceError, ProfileLoadError, SessionError, StorageError};
pub use guard::{Decision, NavigationGuard, Route, RouteTable};
pub use ports::document::{Document, DocumentStore};
pub use ports::memory::{MemoryDocumentStore, MemoryIdentityProvider};
pub use ports::provider::{ChangeHandler, Identity, IdentityProvider, SignIn, Subscription};
pub use ports::storage::{KeyValueStore, MemoryStore};
pub use services::claims::{Claims, ClaimsResolver};
pub use services::manager::{LoginResult, SessionManager};
pub use services::preferences::{PreferenceStore, Preferences, Theme};
pub use services::profile::{Profile, ProfileLoader};
pub use state::cache::{LocalField, Revisions, SessionCache, SessionSnapshot};
pub use state::session::{Role, Session, SessionStatus};
