//! Business logic services (use cases).
//!
//! Services orchestrate repository calls, caching, timeouts and retries.
//! They depend on traits (ports) -- never on concrete infrastructure
//! implementations.

pub mod preference;
pub mod resolver;
