//! Path utilities for walking package stores safely.
//!
//! Entry names read from a package store are joined onto the store
//! directory; these helpers make sure a hostile name cannot point the
//! reader outside of it.

use crate::error::{HuskError, HuskResult};
use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                // Keep leading ".." so an escaping path stays visibly escaping
                match components.last() {
                    None | Some(Component::ParentDir) => components.push(component),
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {},
                    Some(_) => {
                        components.pop();
                    },
                }
            },
            other => components.push(other),
        }
    }

    components.iter().collect()
}

/// Check if a path is safe (relative, never climbs above its base)
pub fn is_safe_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }

    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => depth += 1,
            // RootDir / Prefix are never safe in a relative path
            _ => return false,
        }
    }

    true
}

/// Safely join paths, preventing directory traversal
pub fn safe_join(base: &Path, path: &Path) -> HuskResult<PathBuf> {
    if !is_safe_path(path) {
        return Err(HuskError::io(
            format!("Refusing to leave {}", base.display()),
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path traversal in '{}'", path.display()),
            ),
        ));
    }

    Ok(base.join(normalize_path(path)))
}

/// Directory of an installed package inside a package store.
///
/// Scoped names (`@scope/name`) map onto two nested directories.
pub fn package_dir(store: &Path, name: &str) -> HuskResult<PathBuf> {
    let relative: PathBuf = name.split('/').collect();
    let expected_depth = if name.starts_with('@') { 2 } else { 1 };

    if relative.components().count() != expected_depth {
        return Err(HuskError::io(
            format!("Invalid package name '{}'", name),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "malformed package name"),
        ));
    }

    safe_join(store, &relative)
}
