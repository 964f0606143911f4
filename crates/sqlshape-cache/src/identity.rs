//! Cache identity for compiled query plans.
//!
//! An [`Identity`] captures everything that decides the shape of a query
//! invocation: SQL text, command kind, connection target, the mapped row
//! type, the parameter type, any additional multi-mapping types and the
//! result-set ordinal. Two invocations with equal identities can reuse the
//! same compiled binding/materialization plan.
//!
//! # Equality
//!
//! Equality compares grid index, primary type, SQL (exact), command kind,
//! connection target (through the configured [`TargetComparison`]),
//! parameters type and the additional types. The declared result type and
//! its linked types are **not** part of equality or the hash: identities that
//! differ only in result type are the same cache key.
//!
//! # Example
//!
//! ```
//! use sqlshape_cache::Identity;
//! use sqlshape_core::{CommandKind, TypeHandle};
//!
//! let a = Identity::builder("select id from users")
//!     .command_kind(CommandKind::Text)
//!     .connection_target("Server=db1;Database=app")
//!     .build(TypeHandle::of::<i64>())
//!     .unwrap();
//! let b = Identity::builder("select id from users")
//!     .command_kind(CommandKind::Text)
//!     .connection_target("server=DB1;database=APP")
//!     .build(TypeHandle::of::<i32>())
//!     .unwrap();
//!
//! assert_eq!(a, b);
//! assert_eq!(a.hash_code(), b.hash_code());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use sqlshape_core::{CommandKind, Result, TargetComparison, TypeHandle, ordinal_hash};

use crate::config::IdentityConfig;
use crate::linked::linked_types;

const HASH_SEED: u64 = 17;
const HASH_MULTIPLIER: u64 = 23;

/// Grid index used by identities minted for dynamic parameter bags.
pub const DYNAMIC_PARAMETERS_GRID_INDEX: i32 = -1;

/// Immutable cache key describing a query invocation's shape.
#[derive(Clone)]
pub struct Identity {
    sql: Arc<str>,
    command_kind: Option<CommandKind>,
    connection_target: Option<Arc<str>>,
    primary_type: Option<TypeHandle>,
    parameters_type: Option<TypeHandle>,
    result_type: TypeHandle,
    other_types: Arc<[TypeHandle]>,
    grid_index: i32,
    config: IdentityConfig,
    hash: u64,
    linked_result_types: Arc<[TypeHandle]>,
}

impl Identity {
    /// Build an identity with the default [`IdentityConfig`].
    ///
    /// Fails only when the result type graph exceeds the traversal limits.
    pub fn new(
        sql: impl Into<Arc<str>>,
        command_kind: Option<CommandKind>,
        connection_target: Option<&str>,
        primary_type: Option<TypeHandle>,
        parameters_type: Option<TypeHandle>,
        result_type: TypeHandle,
        other_types: &[TypeHandle],
        grid_index: i32,
    ) -> Result<Self> {
        let config = IdentityConfig::default();
        let linked = linked_types(result_type, &config.limits)?;
        Ok(Self::assemble(
            sql.into(),
            command_kind,
            connection_target.map(Arc::from),
            primary_type,
            parameters_type,
            result_type,
            other_types.into(),
            grid_index,
            config,
            linked.into(),
        ))
    }

    /// Start building an identity for the given SQL.
    pub fn builder(sql: impl Into<Arc<str>>) -> IdentityBuilder {
        IdentityBuilder::new(sql)
    }

    /// Identity for another result set of the same multi-result command.
    ///
    /// Keeps SQL, command kind, connection target and parameters type.
    pub fn for_grid(
        &self,
        primary_type: Option<TypeHandle>,
        result_type: TypeHandle,
        grid_index: i32,
    ) -> Result<Self> {
        self.for_grid_with_types(primary_type, result_type, &[], grid_index)
    }

    /// Like [`Identity::for_grid`], for multi-mapped result sets.
    pub fn for_grid_with_types(
        &self,
        primary_type: Option<TypeHandle>,
        result_type: TypeHandle,
        other_types: &[TypeHandle],
        grid_index: i32,
    ) -> Result<Self> {
        let linked = linked_types(result_type, &self.config.limits)?;
        Ok(Self::assemble(
            Arc::clone(&self.sql),
            self.command_kind,
            self.connection_target.clone(),
            primary_type,
            self.parameters_type,
            result_type,
            other_types.into(),
            grid_index,
            self.config,
            linked.into(),
        ))
    }

    /// Identity for a call whose parameters come from a dynamic bag.
    ///
    /// The grid index is always [`DYNAMIC_PARAMETERS_GRID_INDEX`]. The result
    /// type is unchanged, so the linked types are shared with `self`.
    pub fn for_dynamic_parameters(&self, parameters_type: Option<TypeHandle>) -> Self {
        Self::assemble(
            Arc::clone(&self.sql),
            self.command_kind,
            self.connection_target.clone(),
            self.primary_type,
            parameters_type,
            self.result_type,
            Arc::clone(&self.other_types),
            DYNAMIC_PARAMETERS_GRID_INDEX,
            self.config,
            Arc::clone(&self.linked_result_types),
        )
    }

    fn assemble(
        sql: Arc<str>,
        command_kind: Option<CommandKind>,
        connection_target: Option<Arc<str>>,
        primary_type: Option<TypeHandle>,
        parameters_type: Option<TypeHandle>,
        result_type: TypeHandle,
        other_types: Arc<[TypeHandle]>,
        grid_index: i32,
        config: IdentityConfig,
        linked_result_types: Arc<[TypeHandle]>,
    ) -> Self {
        let mut identity = Self {
            sql,
            command_kind,
            connection_target,
            primary_type,
            parameters_type,
            result_type,
            other_types,
            grid_index,
            config,
            hash: 0,
            linked_result_types,
        };
        identity.hash = identity.combined_hash();
        tracing::debug!(
            target: "sqlshape::identity",
            sql_len = identity.sql.len(),
            grid_index = identity.grid_index,
            result_type = identity.result_type.name(),
            linked_types = identity.linked_result_types.len(),
            hash = identity.hash,
            "built query identity"
        );
        identity
    }

    fn combined_hash(&self) -> u64 {
        let mut hash = HASH_SEED;
        hash = fold(hash, self.command_kind.map_or(0, CommandKind::code));
        hash = fold(hash, i64::from(self.grid_index) as u64);
        hash = fold(hash, ordinal_hash(&self.sql));
        hash = fold(hash, type_hash(self.primary_type));
        for ty in self.other_types.iter() {
            hash = fold(hash, ty.stable_hash());
        }
        hash = fold(
            hash,
            self.connection_target
                .as_deref()
                .map_or(0, |target| self.config.comparison.hash_target(target)),
        );
        fold(hash, type_hash(self.parameters_type))
    }

    /// The SQL text, verbatim.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The command kind, if one was given.
    pub fn command_kind(&self) -> Option<CommandKind> {
        self.command_kind
    }

    /// The connection target, if one was given.
    pub fn connection_target(&self) -> Option<&str> {
        self.connection_target.as_deref()
    }

    /// The mapped row type, if any.
    pub fn primary_type(&self) -> Option<TypeHandle> {
        self.primary_type
    }

    /// The parameter bag type, if any.
    pub fn parameters_type(&self) -> Option<TypeHandle> {
        self.parameters_type
    }

    /// The declared result type.
    pub fn result_type(&self) -> TypeHandle {
        self.result_type
    }

    /// Additional multi-mapping types.
    pub fn other_types(&self) -> &[TypeHandle] {
        &self.other_types
    }

    /// Result-set ordinal.
    pub fn grid_index(&self) -> i32 {
        self.grid_index
    }

    /// Precomputed combined hash.
    pub fn hash_code(&self) -> u64 {
        self.hash
    }

    /// The result type plus every type reachable from it; result type last.
    pub fn linked_result_types(&self) -> &[TypeHandle] {
        &self.linked_result_types
    }

    /// Configuration this identity was built with.
    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    fn targets_equal(&self, other: &Self) -> bool {
        match (self.connection_target.as_deref(), other.connection_target.as_deref()) {
            (Some(a), Some(b)) => self.config.comparison.equals(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

fn fold(hash: u64, part: u64) -> u64 {
    hash.wrapping_mul(HASH_MULTIPLIER).wrapping_add(part)
}

fn type_hash(ty: Option<TypeHandle>) -> u64 {
    ty.map_or(0, TypeHandle::stable_hash)
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        // Other types are compared too, keeping equality consistent with the
        // hash (which folds them in).
        self.hash == other.hash
            && self.grid_index == other.grid_index
            && self.primary_type == other.primary_type
            && *self.sql == *other.sql
            && self.command_kind == other.command_kind
            && self.config.comparison == other.config.comparison
            && self.targets_equal(other)
            && self.parameters_type == other.parameters_type
            && self.other_types == other.other_types
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("sql", &self.sql)
            .field("command_kind", &self.command_kind)
            .field("connection_target", &self.connection_target.as_ref().map(|_| ".."))
            .field("primary_type", &self.primary_type)
            .field("parameters_type", &self.parameters_type)
            .field("result_type", &self.result_type)
            .field("other_types", &self.other_types)
            .field("grid_index", &self.grid_index)
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Identity`].
#[derive(Debug, Clone)]
pub struct IdentityBuilder {
    sql: Arc<str>,
    command_kind: Option<CommandKind>,
    connection_target: Option<Arc<str>>,
    primary_type: Option<TypeHandle>,
    parameters_type: Option<TypeHandle>,
    other_types: Vec<TypeHandle>,
    grid_index: i32,
    config: IdentityConfig,
}

impl IdentityBuilder {
    /// Create a builder for the given SQL.
    pub fn new(sql: impl Into<Arc<str>>) -> Self {
        Self {
            sql: sql.into(),
            command_kind: None,
            connection_target: None,
            primary_type: None,
            parameters_type: None,
            other_types: Vec::new(),
            grid_index: 0,
            config: IdentityConfig::default(),
        }
    }

    /// Set the command kind.
    pub fn command_kind(mut self, kind: CommandKind) -> Self {
        self.command_kind = Some(kind);
        self
    }

    /// Set the connection target.
    pub fn connection_target(mut self, target: &str) -> Self {
        self.connection_target = Some(Arc::from(target));
        self
    }

    /// Set the mapped row type.
    pub fn primary_type(mut self, ty: TypeHandle) -> Self {
        self.primary_type = Some(ty);
        self
    }

    /// Set the parameters type.
    pub fn parameters_type(mut self, ty: TypeHandle) -> Self {
        self.parameters_type = Some(ty);
        self
    }

    /// Add an additional multi-mapping type.
    pub fn other_type(mut self, ty: TypeHandle) -> Self {
        self.other_types.push(ty);
        self
    }

    /// Replace the additional multi-mapping types.
    pub fn other_types(mut self, types: &[TypeHandle]) -> Self {
        self.other_types = types.to_vec();
        self
    }

    /// Set the result-set ordinal.
    pub fn grid_index(mut self, index: i32) -> Self {
        self.grid_index = index;
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: IdentityConfig) -> Self {
        self.config = config;
        self
    }

    /// Set only the connection-target comparison.
    pub fn comparison(mut self, comparison: TargetComparison) -> Self {
        self.config.comparison = comparison;
        self
    }

    /// Finish with the declared result type.
    pub fn build(self, result_type: TypeHandle) -> Result<Identity> {
        let linked = linked_types(result_type, &self.config.limits)?;
        Ok(Identity::assemble(
            self.sql,
            self.command_kind,
            self.connection_target,
            self.primary_type,
            self.parameters_type,
            result_type,
            self.other_types.into(),
            self.grid_index,
            self.config,
            linked.into(),
        ))
    }
}
