//! husk.toml parsing

use husk_core::error::HuskError;
use serde::{Deserialize, Serialize};

use crate::options::OptionOverrides;
use crate::ConfigResult;

/// Project or global husk.toml
///
/// ```toml
/// [resolve]
/// dev = true
/// depth = 2
/// store-dir = "node_modules"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HuskToml {
    /// Resolution options
    #[serde(default)]
    pub resolve: OptionOverrides,
}

/// Parse TOML string to HuskToml
pub fn parse_husk_toml(content: &str) -> ConfigResult<HuskToml> {
    ::toml::from_str(content).map_err(|e| {
        let (line, column) = e
            .span()
            .map(|span| line_column(content, span.start))
            .unwrap_or((0, 0));
        HuskError::TomlParse {
            message: e.message().to_string(),
            line,
            column,
        }
    })
}

/// Serialize HuskToml to TOML string
pub fn serialize_husk_toml(config: &HuskToml) -> ConfigResult<String> {
    ::toml::to_string_pretty(config).map_err(|e| HuskError::Internal {
        message: format!("TOML serialization error: {}", e),
    })
}

/// Load HuskToml from file
pub fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<HuskToml> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| HuskError::io(format!("Failed to read {}", path), e))?;

    parse_husk_toml(&content).map_err(|e| match e {
        HuskError::TomlParse {
            message,
            line,
            column,
        } => HuskError::TomlParse {
            message: format!("In file {}: {}", path, message),
            line,
            column,
        },
        other => other,
    })
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let prefix = &content[..offset.min(content.len())];
    let line = prefix.matches('\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(newline) => prefix[newline + 1..].chars().count() + 1,
        None => prefix.chars().count() + 1,
    };
    (line, column)
}
