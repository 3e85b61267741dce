//! # Calgrid Domain
//!
//! Data model shared by the calendar recurrence and layout engines.
//!
//! This crate contains:
//! - Event, recurrence, business-hours and layout types
//! - Domain error types and Result definitions
//! - Engine configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other calgrid crates
//! - Only external dependencies allowed
//! - Pure data structures; the algorithms live in `calgrid-core`

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
