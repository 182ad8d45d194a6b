//! REST API handlers.

pub mod chat;
pub mod game;
pub mod identity;
pub mod preference;
pub mod sets;
