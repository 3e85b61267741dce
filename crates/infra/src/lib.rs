//! # Calgrid Infrastructure
//!
//! Impure edges around the calendar engines.
//!
//! This crate contains:
//! - Configuration loading from environment variables and files
//! - Tracing subscriber initialisation
//!
//! ## Architecture
//! - Depends on `calgrid-domain` and `calgrid-core`
//! - Contains all code that touches the process environment or filesystem

pub mod config;
pub mod observability;

pub use observability::init_tracing;
