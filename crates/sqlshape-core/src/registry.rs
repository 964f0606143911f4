//! Interning of type descriptors built at runtime.
//!
//! Static descriptors cover types known at compile time. Two kinds of types
//! only exist at runtime: generic sequences (`Vec<T>` for any reflected `T`)
//! and synthetic record shapes such as dynamic parameter bags. The registry
//! builds each distinct shape once, leaks it to obtain a `'static`
//! descriptor, and hands out the same [`TypeHandle`] for every later request
//! with the same structure. Memory use is bounded by the number of distinct
//! shapes, not by the number of requests.

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::types::{MemberInfo, MemberKind, TypeHandle, TypeInfo, TypeRef};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ShapeKey {
    Sequence(TypeHandle),
    Record {
        name: String,
        members: Vec<(String, MemberKind, TypeHandle)>,
    },
}

/// A member definition for a record built at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDef {
    /// Member name.
    pub name: String,
    /// Field or property.
    pub kind: MemberKind,
    /// Declared type.
    pub ty: TypeHandle,
}

impl MemberDef {
    /// Create a public field definition.
    pub fn field(name: impl Into<String>, ty: TypeHandle) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Field,
            ty,
        }
    }

    /// Create a public property definition.
    pub fn property(name: impl Into<String>, ty: TypeHandle) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Property,
            ty,
        }
    }
}

/// Thread-safe interner for runtime-built descriptors.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    shapes: RwLock<HashMap<ShapeKey, &'static TypeInfo>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by the [`Reflect`](crate::types::Reflect)
    /// impls.
    pub fn global() -> &'static TypeRegistry {
        static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
        REGISTRY.get_or_init(TypeRegistry::new)
    }

    /// Handle for a `Vec<element>`-like sequence type.
    pub fn sequence_of(&self, element: TypeHandle) -> TypeHandle {
        self.intern(ShapeKey::Sequence(element), || {
            let name = leak_str(format!("Vec<{}>", element.name()));
            let args: &'static [TypeRef] = Box::leak(Box::new([TypeRef::Handle(element)]));
            TypeInfo::collection(name, args).sequence()
        })
    }

    /// Handle for a record shape defined at runtime.
    ///
    /// Two calls with the same name and the same ordered members return the
    /// same handle.
    pub fn record(&self, name: &str, members: &[MemberDef]) -> TypeHandle {
        let key = ShapeKey::Record {
            name: name.to_string(),
            members: members
                .iter()
                .map(|m| (m.name.clone(), m.kind, m.ty))
                .collect(),
        };
        self.intern(key, || {
            let leaked: Vec<MemberInfo> = members
                .iter()
                .map(|m| MemberInfo::with_handle(leak_str(m.name.clone()), m.kind, m.ty))
                .collect();
            TypeInfo::record(leak_str(name.to_string()), Box::leak(leaked.into_boxed_slice()))
        })
    }

    /// Number of interned shapes.
    pub fn len(&self) -> usize {
        self.shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn intern(&self, key: ShapeKey, build: impl FnOnce() -> TypeInfo) -> TypeHandle {
        // Fast path: already interned
        {
            let shapes = self.shapes.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(info) = shapes.get(&key) {
                return TypeHandle::from_static(*info);
            }
        }

        // Slow path: re-check under the write lock so racing callers agree
        let mut shapes = self.shapes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(info) = shapes.get(&key) {
            return TypeHandle::from_static(*info);
        }
        let info: &'static TypeInfo = Box::leak(Box::new(build()));
        tracing::debug!(
            target: "sqlshape::registry",
            name = info.name,
            members = info.members.len(),
            "interned runtime type shape"
        );
        shapes.insert(key, info);
        TypeHandle::from_static(info)
    }
}

fn leak_str(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}
