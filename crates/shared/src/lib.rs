//! # etrv Shared
//!
//! Common types and interfaces used across all etrv packages.

pub mod error;
pub mod registry;
pub mod temperature;

// Re-exports
pub use error::*;
pub use registry::*;
pub use temperature::*;
