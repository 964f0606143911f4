//! Core types for SQLShape Rust.
//!
//! `sqlshape-core` is the **foundation layer** of the workspace. It defines how
//! mapped types describe themselves and the small value types that make up a
//! query's shape.
//!
//! # Role In The Architecture
//!
//! - **Type descriptors**: `Reflect`, `TypeInfo`, `MemberInfo` and `TypeHandle`
//!   replace runtime reflection with static metadata.
//! - **Interning**: `TypeRegistry` builds runtime shapes (generic sequences,
//!   dynamic parameter bags) once and hands out stable handles.
//! - **Shape values**: `CommandKind`, `TargetComparison` and
//!   `DynamicParameters` feed into cache identities.
//!
//! # Who Uses This Crate
//!
//! - `sqlshape-cache` builds `Identity` keys and walks result type graphs
//!   through the descriptors defined here.
//! - Mapper code implements `Reflect` (usually through `reflect_record!`) for
//!   its row types.
//!
//! Most applications should use the `sqlshape` facade.

pub mod command;
pub mod comparison;
pub mod dynamic;
pub mod error;
pub mod registry;
pub mod types;

pub use command::CommandKind;
pub use comparison::{TargetComparison, ordinal_hash};
pub use dynamic::{DynamicParameters, ParamDef, ParameterDirection};
pub use error::{
    CompileError, ConfigError, Error, Result, TypeGraphError, TypeGraphErrorKind,
};
pub use registry::{MemberDef, TypeRegistry};
pub use types::{
    MemberInfo, MemberKind, Reflect, TypeHandle, TypeInfo, TypeKind, TypeRef, Visibility,
};
