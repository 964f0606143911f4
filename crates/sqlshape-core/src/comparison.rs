//! String comparison used for connection targets.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// How connection targets are compared and hashed.
///
/// The same mode must drive both [`TargetComparison::equals`] and
/// [`TargetComparison::hash_target`]; identities rely on that pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetComparison {
    /// ASCII case-insensitive comparison (the conventional choice for
    /// connection strings).
    #[default]
    IgnoreAsciiCase,
    /// Exact byte-wise comparison.
    Ordinal,
}

impl TargetComparison {
    /// Compare two targets under this mode.
    #[must_use]
    pub fn equals(self, a: &str, b: &str) -> bool {
        match self {
            TargetComparison::IgnoreAsciiCase => a.eq_ignore_ascii_case(b),
            TargetComparison::Ordinal => a == b,
        }
    }

    /// Hash a target under this mode.
    #[must_use]
    pub fn hash_target(self, s: &str) -> u64 {
        match self {
            TargetComparison::IgnoreAsciiCase => {
                let mut hasher = DefaultHasher::new();
                for b in s.bytes() {
                    b.to_ascii_lowercase().hash(&mut hasher);
                }
                hasher.finish()
            }
            TargetComparison::Ordinal => ordinal_hash(s),
        }
    }

    /// Parse a comparison mode name (case-insensitive).
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ignore_ascii_case" | "ignorecase" | "case_insensitive" => {
                Some(TargetComparison::IgnoreAsciiCase)
            }
            "ordinal" | "exact" => Some(TargetComparison::Ordinal),
            _ => None,
        }
    }
}

/// Deterministic hash of a string's exact bytes.
#[must_use]
pub fn ordinal_hash(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    for b in s.bytes() {
        b.hash(&mut hasher);
    }
    hasher.finish()
}
