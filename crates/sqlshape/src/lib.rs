//! SQLShape Rust: query shape identities and compiled-plan caching.
//!
//! Data mappers compile a binding and materialization plan per distinct
//! query shape. This crate provides the pieces needed to do that once:
//!
//! - describe row types statically with [`Reflect`] / [`reflect_record!`]
//! - key each invocation by an [`Identity`]
//! - keep compiled plans in a thread-safe [`PlanCache`]
//!
//! # Quick Start
//!
//! ```
//! use sqlshape::prelude::*;
//!
//! struct User;
//! reflect_record!(User, "User", [
//!     MemberInfo::field("id", TypeHandle::of::<i64>),
//!     MemberInfo::field("email", TypeHandle::of::<String>),
//! ]);
//!
//! let cache: PlanCache<Vec<&'static str>> = PlanCache::new();
//! let identity = Identity::builder("select id, email from users")
//!     .command_kind(CommandKind::Text)
//!     .connection_target("Server=db;Database=app")
//!     .primary_type(TypeHandle::of::<User>())
//!     .build(TypeHandle::of::<User>())?;
//!
//! let plan = cache.get_or_compile(&identity, |_| Ok(vec!["id", "email"]))?;
//! assert_eq!(plan.len(), 2);
//! # Ok::<(), sqlshape::Error>(())
//! ```

pub use sqlshape_cache;
pub use sqlshape_core;

pub use sqlshape_cache::{
    CacheStats, CachedQuery, DYNAMIC_PARAMETERS_GRID_INDEX, Identity, IdentityBuilder,
    IdentityConfig, PlanCache, PlanCacheConfig, TraversalLimits, linked_types,
};
pub use sqlshape_core::{
    CommandKind, CompileError, ConfigError, DynamicParameters, Error, MemberDef, MemberInfo,
    MemberKind, ParamDef, ParameterDirection, Reflect, Result, TargetComparison, TypeGraphError,
    TypeGraphErrorKind, TypeHandle, TypeInfo, TypeKind, TypeRef, TypeRegistry, Visibility,
    reflect_record,
};

/// Everything a mapper usually needs.
pub mod prelude {
    pub use crate::{
        CacheStats, CommandKind, DynamicParameters, Error, Identity, IdentityConfig, MemberInfo,
        PlanCache, PlanCacheConfig, Reflect, Result, TargetComparison, TypeHandle, TypeInfo,
        reflect_record,
    };
}
