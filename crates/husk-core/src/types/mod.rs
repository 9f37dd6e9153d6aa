//! Core data types for husk.
//!
//! This module provides the fundamental types used throughout husk:
//! - Version types for semantic versioning and npm ranges
//! - The normalized package manifest

pub mod manifest;
pub mod version;

// Re-export all public types
pub use manifest::Manifest;
pub use version::{satisfies, Comparator, Op, Version, VersionError, VersionReq};
