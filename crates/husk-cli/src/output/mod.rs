//! Terminal output formatting and utilities.
//!
//! Keeps command output consistent: status lines, colors, error reports
//! and the dependency tree renderer.

pub mod colors;
pub mod errors;
pub mod tree;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: colors::ColorSupport,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
        }
    }

    /// Output handler that never emits escape codes
    #[cfg(test)]
    pub fn plain() -> Self {
        Self {
            colors: colors::ColorSupport::disabled(),
        }
    }

    pub fn colors(&self) -> colors::ColorSupport {
        self.colors
    }

    /// Print text as is
    pub fn line(&self, text: &str) {
        println!("{}", text);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{}", self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        println!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// Print a problem found in the tree
    pub fn problem(&self, message: &str) {
        println!("{} {}", self.colors.red("✗"), message);
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
