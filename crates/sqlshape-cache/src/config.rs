//! Configuration for identities and the plan cache.

use serde::{Deserialize, Serialize};
use sqlshape_core::{Result, TargetComparison};

/// Bounds on linked-type expansion.
///
/// Cycles never need these (the visited set handles them); they only stop
/// pathological, very deep or very wide descriptor graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalLimits {
    /// Maximum nesting depth below the root type.
    pub max_depth: usize,
    /// Maximum number of distinct types, root included.
    pub max_types: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_types: 10_000,
        }
    }
}

impl TraversalLimits {
    /// Create limits with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the maximum number of types.
    pub fn max_types(mut self, count: usize) -> Self {
        self.max_types = count;
        self
    }
}

/// Settings that travel with every [`Identity`](crate::Identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// How connection targets are compared and hashed.
    pub comparison: TargetComparison,
    /// Linked-type expansion bounds.
    pub limits: TraversalLimits,
}

impl IdentityConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection-target comparison.
    pub fn comparison(mut self, comparison: TargetComparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Set the traversal limits.
    pub fn limits(mut self, limits: TraversalLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Configuration for [`PlanCache`](crate::PlanCache).
///
/// Can be loaded from JSON; missing keys take their defaults:
///
/// ```
/// use sqlshape_cache::PlanCacheConfig;
///
/// let config = PlanCacheConfig::from_json(r#"{"collect_every": 50}"#).unwrap();
/// assert_eq!(config.collect_every, 50);
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanCacheConfig {
    /// When false the cache stores nothing and every lookup compiles.
    pub enabled: bool,
    /// Run a collection pass after this many insertions (0 disables).
    pub collect_every: usize,
    /// Entries with at most this many hits are dropped by a collection pass.
    pub min_hits_to_keep: u64,
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            collect_every: 1000,
            min_hits_to_keep: 0,
        }
    }
}

impl PlanCacheConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enable or disable caching.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the collection interval.
    pub fn collect_every(mut self, inserts: usize) -> Self {
        self.collect_every = inserts;
        self
    }

    /// Set the hit threshold entries must exceed to survive collection.
    pub fn min_hits_to_keep(mut self, hits: u64) -> Self {
        self.min_hits_to_keep = hits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlshape_core::Error;

    #[test]
    fn test_traversal_limits_defaults() {
        let limits = TraversalLimits::default();
        assert_eq!(limits.max_depth, 64);
        assert_eq!(limits.max_types, 10_000);
    }

    #[test]
    fn test_identity_config_builder() {
        let config = IdentityConfig::new()
            .comparison(TargetComparison::Ordinal)
            .limits(TraversalLimits::new().max_depth(3));
        assert_eq!(config.comparison, TargetComparison::Ordinal);
        assert_eq!(config.limits.max_depth, 3);
        assert_eq!(config.limits.max_types, 10_000);
    }

    #[test]
    fn test_plan_cache_config_from_json_partial() {
        let config =
            PlanCacheConfig::from_json(r#"{"enabled": false, "min_hits_to_keep": 2}"#).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.min_hits_to_keep, 2);
        assert_eq!(config.collect_every, 1000);
    }

    #[test]
    fn test_plan_cache_config_from_json_invalid() {
        let err = PlanCacheConfig::from_json(r#"{"collect_every": "often"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_identity_config_json() {
        let config: IdentityConfig =
            serde_json::from_str(r#"{"comparison": "ordinal", "limits": {"max_types": 5}}"#)
                .unwrap();
        assert_eq!(config.comparison, TargetComparison::Ordinal);
        assert_eq!(config.limits.max_types, 5);
        assert_eq!(config.limits.max_depth, 64);
    }
}
