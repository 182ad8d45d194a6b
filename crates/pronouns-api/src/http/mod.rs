//! HTTP/REST API layer for ProNouns.
//!
//! Axum-based REST API at `/api/v1/` with API key authentication,
//! envelope response format, and CORS support. Game plugins and chat bots
//! that run in another process reach the adapters through it.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
