//! Infrastructure layer for ProNouns.
//!
//! Contains the SQLite implementations of the repository traits defined in
//! `pronouns-core`, loading of `pronouns.toml`, data-dir resolution and the
//! shared pronoun-set database client.

pub mod cloud;
pub mod config;
pub mod sqlite;
