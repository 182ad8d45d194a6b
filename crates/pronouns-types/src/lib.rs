//! Shared domain types for the ProNouns preference store.
//!
//! This crate contains the core domain types used across the workspace:
//! identities and platform IDs, preference records, pronoun sets, the
//! configuration model, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod identity;
pub mod pronoun;
pub mod record;
