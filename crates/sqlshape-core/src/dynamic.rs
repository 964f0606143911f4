//! Parameter bags whose shape is known only at call time.
//!
//! Provides `DynamicParameters` for commands whose parameters are assembled
//! at runtime instead of coming from a typed parameter struct. The bag's
//! shape (parameter names and value types, in order) is interned as a
//! synthetic record type so it can take part in cache keys like any other
//! parameter type.

use crate::registry::{MemberDef, TypeRegistry};
use crate::types::TypeHandle;

/// Direction of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// A single parameter definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDef {
    /// Parameter name, without any `@`/`:`/`?` prefix.
    pub name: String,
    /// Declared value type.
    pub ty: TypeHandle,
    /// Parameter direction.
    pub direction: ParameterDirection,
    /// Size hint for variable-length values.
    pub size: Option<usize>,
}

impl ParamDef {
    /// Create a new input parameter definition.
    pub fn new(name: impl AsRef<str>, ty: TypeHandle) -> Self {
        Self {
            name: clean_name(name.as_ref()).to_string(),
            ty,
            direction: ParameterDirection::Input,
            size: None,
        }
    }

    /// Set the direction.
    pub fn direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Set the size hint.
    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }
}

/// An ordered bag of named parameters.
///
/// Names are compared case-insensitively; adding a parameter whose name is
/// already present replaces the earlier definition in place.
///
/// # Example
///
/// ```
/// use sqlshape_core::dynamic::DynamicParameters;
/// use sqlshape_core::types::TypeHandle;
///
/// let mut a = DynamicParameters::new();
/// a.add("@id", TypeHandle::of::<i64>());
/// a.add("name", TypeHandle::of::<String>());
///
/// let mut b = DynamicParameters::new();
/// b.add("ID", TypeHandle::of::<i64>());
/// b.add(":name", TypeHandle::of::<String>());
///
/// assert_eq!(a.shape(), b.shape());
/// assert_eq!(a.parameter_names(), vec!["id", "name"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DynamicParameters {
    params: Vec<ParamDef>,
}

impl DynamicParameters {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input parameter.
    pub fn add(&mut self, name: impl AsRef<str>, ty: TypeHandle) -> &mut Self {
        self.add_param(ParamDef::new(name, ty))
    }

    /// Add a fully specified parameter.
    pub fn add_param(&mut self, mut param: ParamDef) -> &mut Self {
        let cleaned = clean_name(&param.name);
        if cleaned.len() != param.name.len() {
            param.name = cleaned.to_string();
        }
        match self
            .params
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&param.name))
        {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
        self
    }

    /// Merge every parameter of another bag into this one.
    pub fn add_dynamic(&mut self, other: &DynamicParameters) -> &mut Self {
        for param in &other.params {
            self.add_param(param.clone());
        }
        self
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParamDef> {
        let name = clean_name(name);
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Parameter names in insertion order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    /// Parameter definitions in insertion order.
    pub fn params(&self) -> &[ParamDef] {
        &self.params
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True if no parameters were added.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Interned synthetic type describing this bag's shape.
    ///
    /// Names are lower-cased in the shape so that case-only differences map
    /// to the same type.
    pub fn shape(&self) -> TypeHandle {
        self.shape_in(TypeRegistry::global())
    }

    /// Like [`DynamicParameters::shape`], interning into a specific registry.
    pub fn shape_in(&self, registry: &TypeRegistry) -> TypeHandle {
        let members: Vec<MemberDef> = self
            .params
            .iter()
            .map(|p| MemberDef::field(p.name.to_ascii_lowercase(), p.ty))
            .collect();
        let name = format!(
            "DynamicParameters{{{}}}",
            members
                .iter()
                .map(|m| format!("{}:{}", m.name, m.ty.name()))
                .collect::<Vec<_>>()
                .join(",")
        );
        registry.record(&name, &members)
    }
}

fn clean_name(name: &str) -> &str {
    name.strip_prefix(['@', ':', '?']).unwrap_or(name)
}
