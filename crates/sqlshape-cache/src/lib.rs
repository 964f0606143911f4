//! Query identities and compiled-plan caching for SQLShape Rust.
//!
//! `sqlshape-cache` is the **caching layer** on top of `sqlshape-core`.
//!
//! # Role In The Architecture
//!
//! - **Identity**: [`Identity`] is the cache key for one query invocation
//!   shape. It is built once per call site and compared cheaply through its
//!   precomputed hash.
//! - **Linked types**: [`linked_types`] walks a result type's descriptor graph
//!   so plan generation sees every nested type up front.
//! - **Plan cache**: [`PlanCache`] stores one compiled plan per identity and
//!   guarantees a single compilation under concurrent misses.
//!
//! Most applications should use the `sqlshape` facade.

pub mod config;
pub mod identity;
pub mod linked;
pub mod plan_cache;

pub use config::{IdentityConfig, PlanCacheConfig, TraversalLimits};
pub use identity::{DYNAMIC_PARAMETERS_GRID_INDEX, Identity, IdentityBuilder};
pub use linked::linked_types;
pub use plan_cache::{CacheStats, CachedQuery, PlanCache};
