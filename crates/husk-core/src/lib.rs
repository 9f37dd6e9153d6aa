//! # husk-core
//!
//! Core types and utilities shared across all husk crates.
//!
//! This crate provides:
//! - Version and VersionReq types implementing the npm range grammar
//! - The normalized Manifest every package directory is read into
//! - HuskError enum for unified error handling
//! - Path helpers for walking package-store directories safely
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, VersionReq, Manifest)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{HuskError, HuskResult};
pub use types::{Manifest, Version, VersionReq};
