//! Error message formatting with actionable suggestions.

use super::colors::ColorSupport;
use husk_core::error::HuskError;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    #[cfg(test)]
    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with its cause chain and a suggestion when husk has one
    pub fn format_report(&self, error: &anyhow::Error) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        for cause in error.chain().skip(1) {
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&cause.to_string());
            output.push('\n');
        }

        if let Some(suggestion) = error.downcast_ref::<HuskError>().and_then(HuskError::suggestion) {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
