//! Semantic versions and npm-style version ranges.
//!
//! Provides Version and VersionReq types. Ranges follow the grammar used in
//! package.json files: caret and tilde ranges, x-ranges, hyphen ranges,
//! space-separated comparator sets and `||` alternatives. Parsing is loose:
//! a leading `v` or `=` and whitespace after operators are accepted.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version range (^1.0.0, ~2.3.0, >=1.0.0 <2.0.0, 1.x || 2.x)
///
/// Stored in disjunctive normal form: the range matches when every
/// comparator of at least one set matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReq {
    pub sets: Vec<Vec<Comparator>>,
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

/// Primitive comparison operator every range desugars to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exact,     // =1.0.0
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
}

/// Version parsing and validation errors
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid prerelease identifier: {prerelease}")]
    InvalidPrerelease { prerelease: String },

    #[error("Invalid version range: {input}")]
    InvalidRange { input: String },
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Check if this version satisfies a version requirement
    pub fn satisfies(&self, req: &VersionReq) -> bool {
        req.matches(self)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// Get the precedence for comparison (ignores build metadata)
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match self.triple().cmp(&other.triple()) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less, // prerelease < normal
                (None, Some(_)) => Ordering::Greater, // normal > prerelease
                (Some(a), Some(b)) => compare_prerelease(a, b),
            },
            other => other,
        }
    }
}

/// Compare dot-separated prerelease identifiers: numeric identifiers compare
/// numerically and sort before alphanumeric ones.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            },
        }
    }
}

fn parse_number(component: &str) -> Result<u64, VersionError> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::InvalidNumber {
            component: component.to_string(),
        });
    }
    component.parse().map_err(|_| VersionError::InvalidNumber {
        component: component.to_string(),
    })
}

fn strip_loose_prefix(input: &str) -> &str {
    let input = input.trim();
    let input = input.strip_prefix('=').unwrap_or(input).trim_start();
    input
        .strip_prefix('v')
        .or_else(|| input.strip_prefix('V'))
        .unwrap_or(input)
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = strip_loose_prefix(s);

        // Split on '+' for build metadata
        let (version_part, build) = match input.split_once('+') {
            Some((v, b)) => (v, Some(b.to_string())),
            None => (input, None),
        };

        // Split on '-' for prerelease
        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((_, "")) => {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: String::new(),
                })
            },
            Some((c, p)) => (c, Some(p.to_string())),
            None => (version_part, None),
        };

        // Parse major.minor.patch
        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::InvalidFormat {
                input: s.to_string(),
            });
        }

        Ok(Version {
            major: parse_number(parts[0])?,
            minor: parse_number(parts[1])?,
            patch: parse_number(parts[2])?,
            prerelease,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

/// Range operators as written, before desugaring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Caret,
    Tilde,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Exact,
}

/// Version with possibly missing (x-range) components
#[derive(Debug, Clone, PartialEq, Eq)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    prerelease: Option<String>,
}

impl Partial {
    fn parse(input: &str) -> Result<Self, VersionError> {
        let input = strip_loose_prefix(input);
        if input.is_empty() {
            return Err(VersionError::InvalidRange {
                input: input.to_string(),
            });
        }

        let without_build = input.split_once('+').map_or(input, |(v, _)| v);
        let (core_part, prerelease) = match without_build.split_once('-') {
            Some((_, "")) => {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: String::new(),
                })
            },
            Some((c, p)) => (c, Some(p.to_string())),
            None => (without_build, None),
        };

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let mut components = [None; 3];
        let mut wildcard_seen = false;
        for (slot, part) in components.iter_mut().zip(&parts) {
            if matches!(*part, "x" | "X" | "*") {
                wildcard_seen = true;
                continue;
            }
            let number = parse_number(part)?;
            if !wildcard_seen {
                *slot = Some(number);
            }
        }

        let [major, minor, patch] = components;
        Ok(Self {
            major,
            minor,
            patch,
            // A prerelease tag only means something on a complete version
            prerelease: if patch.is_some() { prerelease } else { None },
        })
    }

    /// Lowest version covered by this partial
    fn floor(&self, major: u64) -> Version {
        Version {
            major,
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }
}

fn split_operator(token: &str) -> (RangeOp, &str) {
    const OPERATORS: [(&str, RangeOp); 8] = [
        (">=", RangeOp::GreaterEq),
        ("<=", RangeOp::LessEq),
        ("~>", RangeOp::Tilde),
        (">", RangeOp::Greater),
        ("<", RangeOp::Less),
        ("^", RangeOp::Caret),
        ("~", RangeOp::Tilde),
        ("=", RangeOp::Exact),
    ];

    for (prefix, op) in OPERATORS {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (op, rest);
        }
    }
    (RangeOp::Exact, token)
}

fn is_bare_operator(token: &str) -> bool {
    matches!(token, ">=" | "<=" | "~>" | ">" | "<" | "^" | "~" | "=")
}

fn bounded(lower: Version, upper: Version) -> Vec<Comparator> {
    vec![
        Comparator::new(Op::GreaterEq, lower),
        Comparator::new(Op::Less, upper),
    ]
}

/// Desugar one written comparator (`^1.2`, `>=3`, `1.x`) into primitives
fn desugar(token: &str) -> Result<Vec<Comparator>, VersionError> {
    let (op, rest) = split_operator(token);
    let partial = Partial::parse(rest)?;

    let Some(major) = partial.major else {
        return Ok(match op {
            RangeOp::Greater | RangeOp::Less => vec![Comparator::nothing()],
            _ => Vec::new(),
        });
    };
    let next_major = Version::new(major.saturating_add(1), 0, 0);
    let lower = partial.floor(major);

    let comparators = match op {
        RangeOp::Exact => match (partial.minor, partial.patch) {
            (Some(_), Some(_)) => vec![Comparator::new(Op::Exact, lower)],
            (Some(minor), None) => bounded(lower, Version::new(major, minor.saturating_add(1), 0)),
            (None, _) => bounded(lower, next_major),
        },
        RangeOp::Caret => {
            let minor = partial.minor.unwrap_or(0);
            let upper = if major > 0 || partial.minor.is_none() {
                next_major
            } else if minor > 0 || partial.patch.is_none() {
                Version::new(0, minor.saturating_add(1), 0)
            } else {
                Version::new(0, 0, partial.patch.unwrap_or(0).saturating_add(1))
            };
            bounded(lower, upper)
        },
        RangeOp::Tilde => {
            let upper = match partial.minor {
                Some(minor) => Version::new(major, minor.saturating_add(1), 0),
                None => next_major,
            };
            bounded(lower, upper)
        },
        RangeOp::GreaterEq => vec![Comparator::new(Op::GreaterEq, lower)],
        RangeOp::Greater => match (partial.minor, partial.patch) {
            (Some(_), Some(_)) => vec![Comparator::new(Op::Greater, lower)],
            (Some(minor), None) => vec![Comparator::new(
                Op::GreaterEq,
                Version::new(major, minor.saturating_add(1), 0),
            )],
            (None, _) => vec![Comparator::new(Op::GreaterEq, next_major)],
        },
        RangeOp::Less => vec![Comparator::new(Op::Less, lower)],
        RangeOp::LessEq => match (partial.minor, partial.patch) {
            (Some(_), Some(_)) => vec![Comparator::new(Op::LessEq, lower)],
            (Some(minor), None) => vec![Comparator::new(
                Op::Less,
                Version::new(major, minor.saturating_add(1), 0),
            )],
            (None, _) => vec![Comparator::new(Op::Less, next_major)],
        },
    };

    Ok(comparators)
}

/// `1.2 - 2.3.4`: inclusive on both ends, partial upper bounds widen
fn desugar_hyphen(low: &str, high: &str) -> Result<Vec<Comparator>, VersionError> {
    let low = Partial::parse(low)?;
    let high = Partial::parse(high)?;
    let mut comparators = Vec::new();

    if let Some(major) = low.major {
        comparators.push(Comparator::new(Op::GreaterEq, low.floor(major)));
    }
    if let Some(major) = high.major {
        let upper = match (high.minor, high.patch) {
            (Some(_), Some(_)) => Comparator::new(Op::LessEq, high.floor(major)),
            (Some(minor), None) => {
                Comparator::new(Op::Less, Version::new(major, minor.saturating_add(1), 0))
            },
            (None, _) => Comparator::new(Op::Less, Version::new(major.saturating_add(1), 0, 0)),
        };
        comparators.push(upper);
    }

    Ok(comparators)
}

fn parse_set(input: &str) -> Result<Vec<Comparator>, VersionError> {
    let input = input.trim();

    if let Some((low, high)) = input.split_once(" - ") {
        let (low, high) = (low.trim(), high.trim());
        if low.is_empty() || high.is_empty() || low.contains(' ') || high.contains(' ') {
            return Err(VersionError::InvalidRange {
                input: input.to_string(),
            });
        }
        return desugar_hyphen(low, high);
    }

    let mut comparators = Vec::new();
    let mut tokens = input.split_whitespace();
    while let Some(token) = tokens.next() {
        // Loose form: "> 1.2.3" puts whitespace between operator and version
        let token = if is_bare_operator(token) {
            match tokens.next() {
                Some(next) => format!("{}{}", token, next),
                None => {
                    return Err(VersionError::InvalidRange {
                        input: input.to_string(),
                    })
                },
            }
        } else {
            token.to_string()
        };
        comparators.extend(desugar(&token)?);
    }

    Ok(comparators)
}

impl VersionReq {
    /// Range matching every release version (`*`)
    pub fn any() -> Self {
        Self {
            sets: vec![Vec::new()],
        }
    }

    /// Parse a version range string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let sets = input
            .split("||")
            .map(parse_set)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionError::InvalidRange {
                input: input.to_string(),
            })?;

        Ok(VersionReq { sets })
    }

    /// Check if a string is a syntactically valid range
    ///
    /// Tags (`latest`), URLs, git specs and `file:` specs are not ranges.
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Check if a version matches this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set_matches(set, version))
    }
}

fn set_matches(set: &[Comparator], version: &Version) -> bool {
    if !set.iter().all(|comp| comp.matches(version)) {
        return false;
    }

    // A prerelease only satisfies a set that opts into prereleases of the
    // same major.minor.patch
    if version.is_prerelease() {
        return set
            .iter()
            .any(|comp| comp.version.is_prerelease() && comp.version.triple() == version.triple());
    }

    true
}

/// Check a version string against a range string.
///
/// Unparseable versions never satisfy anything.
pub fn satisfies(version: &str, range: &str) -> bool {
    match (Version::from_str(version), VersionReq::parse(range)) {
        (Ok(version), Ok(req)) => req.matches(&version),
        _ => false,
    }
}

impl Comparator {
    pub fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    /// Comparator no version can satisfy (`<0.0.0-0`)
    fn nothing() -> Self {
        Self::new(
            Op::Less,
            Version {
                prerelease: Some("0".to_string()),
                ..Version::new(0, 0, 0)
            },
        )
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        match self.op {
            Op::Exact => version.cmp(&self.version) == Ordering::Equal,
            Op::Greater => version > &self.version,
            Op::GreaterEq => version >= &self.version,
            Op::Less => version < &self.version,
            Op::LessEq => version <= &self.version,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Op::Exact => "",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sets: Vec<String> = self
            .sets
            .iter()
            .map(|set| {
                if set.is_empty() {
                    "*".to_string()
                } else {
                    set.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ")
                }
            })
            .collect();
        f.write_str(&sets.join(" || "))
    }
}
