//! Pronoun parsing for user input.
//!
//! - `PronounRegistry`: predefined sets plus the rules for turning
//!   free-form input like `she/they` into stored entries
//! - `ContentFilter`: regex deny-list applied to custom sets

pub mod filter;
pub mod registry;

pub use filter::ContentFilter;
pub use registry::{PronounEntry, PronounRegistry};
