//! Utility functions and helpers.
//!
//! Common functionality used across multiple husk crates.

pub mod path;

// Re-export commonly used utilities
pub use path::{is_safe_path, normalize_path, package_dir, safe_join};
