//! Business logic and repository trait definitions for ProNouns.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements, plus everything that sits between the store and the
//! front-ends: identity resolution, the preference cache, pronoun parsing,
//! placeholders, and the game/chat adapters. It depends only on
//! `pronouns-types` -- never on `pronouns-infra` or any database crate.

pub mod adapter;
pub mod cache;
pub mod command;
pub mod placeholder;
pub mod pronoun;
pub mod repository;
pub mod retry;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
