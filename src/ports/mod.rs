//! Capabilities the session layer consumes but does not own.
//!
//! SYSTEM CONTEXT
//! ==============
//! The identity provider, the profile document store and client key-value
//! storage are external collaborators. Each is a trait so production
//! adapters and the in-memory implementations in [`memory`] and
//! [`storage::MemoryStore`] are interchangeable.

pub mod document;
pub mod memory;
pub mod provider;
pub mod storage;
