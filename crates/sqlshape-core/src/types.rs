//! Type descriptors.
//!
//! Mappers need to know which types hang off a result type (its public
//! fields and properties, transitively). Rust has no runtime reflection, so
//! every mapped type describes itself once through the [`Reflect`] trait,
//! returning a `'static` [`TypeInfo`]. Member types are referenced lazily
//! through function pointers, which lets descriptors form cycles
//! (`Employee { manager: Employee }`) without any runtime setup.
//!
//! # Example
//!
//! ```
//! use sqlshape_core::reflect_record;
//! use sqlshape_core::types::{MemberInfo, TypeHandle};
//!
//! struct Address;
//! struct Person;
//!
//! reflect_record!(Address, "Address", [
//!     MemberInfo::field("street", TypeHandle::of::<String>),
//! ]);
//! reflect_record!(Person, "Person", [
//!     MemberInfo::field("name", TypeHandle::of::<String>),
//!     MemberInfo::property("address", TypeHandle::of::<Address>),
//! ]);
//!
//! let person = TypeHandle::of::<Person>();
//! assert_eq!(person.name(), "Person");
//! assert_eq!(person.info().public_fields().count(), 1);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::registry::TypeRegistry;

/// Broad category of a described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeKind {
    /// Scalar value types (`i64`, `String`, ...). Never have members.
    #[default]
    Primitive,
    /// A struct-like type with fields and/or properties.
    Record,
    /// A trait-object-like contract; may expose properties.
    Interface,
    /// A closed set of named values.
    Enum,
    /// A container type (`Vec<T>`, maps, sets).
    Collection,
}

/// Whether a member is a stored field or a computed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Stored field.
    Field,
    /// Accessor-backed property.
    Property,
}

/// Member visibility. Only public members take part in type-graph expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Reference from a member to its declared type.
#[derive(Clone, Copy)]
pub enum TypeRef {
    /// Resolved on demand; used by static descriptors so cyclic graphs work.
    Lazy(fn() -> TypeHandle),
    /// Already resolved; used by descriptors built at runtime.
    Handle(TypeHandle),
}

impl TypeRef {
    /// Resolve to a concrete handle.
    #[must_use]
    pub fn resolve(self) -> TypeHandle {
        match self {
            TypeRef::Lazy(f) => f(),
            TypeRef::Handle(handle) => handle,
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Lazy(_) => f.write_str("TypeRef::Lazy(..)"),
            TypeRef::Handle(handle) => write!(f, "TypeRef::Handle({})", handle.name()),
        }
    }
}

/// Metadata about a single field or property of a described type.
#[derive(Debug, Clone, Copy)]
pub struct MemberInfo {
    /// Member name
    pub name: &'static str,
    /// Field or property
    pub kind: MemberKind,
    /// Declared type of the member
    pub ty: TypeRef,
    /// Visibility of the member
    pub visibility: Visibility,
    /// Whether the member belongs to the type rather than to instances
    pub is_static: bool,
}

impl MemberInfo {
    /// Create a public instance field.
    pub const fn field(name: &'static str, ty: fn() -> TypeHandle) -> Self {
        Self::new(name, MemberKind::Field, TypeRef::Lazy(ty))
    }

    /// Create a public instance property.
    pub const fn property(name: &'static str, ty: fn() -> TypeHandle) -> Self {
        Self::new(name, MemberKind::Property, TypeRef::Lazy(ty))
    }

    /// Create a public instance member from an already resolved handle.
    pub const fn with_handle(name: &'static str, kind: MemberKind, ty: TypeHandle) -> Self {
        Self::new(name, kind, TypeRef::Handle(ty))
    }

    const fn new(name: &'static str, kind: MemberKind, ty: TypeRef) -> Self {
        Self {
            name,
            kind,
            ty,
            visibility: Visibility::Public,
            is_static: false,
        }
    }

    /// Mark the member as private.
    pub const fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// Mark the member as static (type-level).
    pub const fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Resolve the member's declared type.
    #[must_use]
    pub fn type_handle(&self) -> TypeHandle {
        self.ty.resolve()
    }

    /// True for public, non-static members.
    #[must_use]
    pub const fn is_public_instance(&self) -> bool {
        matches!(self.visibility, Visibility::Public) && !self.is_static
    }
}

/// Static description of a type.
#[derive(Debug)]
pub struct TypeInfo {
    /// Display name, also the basis of the handle hash
    pub name: &'static str,
    /// Broad category
    pub kind: TypeKind,
    /// Whether the type can be iterated as a sequence of elements
    pub is_sequence: bool,
    /// Generic type arguments, in declaration order
    pub generic_args: &'static [TypeRef],
    /// Declared fields and properties, in declaration order
    pub members: &'static [MemberInfo],
}

impl TypeInfo {
    /// Describe a primitive (member-less) type.
    pub const fn primitive(name: &'static str) -> Self {
        Self {
            name,
            kind: TypeKind::Primitive,
            is_sequence: false,
            generic_args: &[],
            members: &[],
        }
    }

    /// Describe a record type with the given members.
    pub const fn record(name: &'static str, members: &'static [MemberInfo]) -> Self {
        Self {
            name,
            kind: TypeKind::Record,
            is_sequence: false,
            generic_args: &[],
            members,
        }
    }

    /// Describe an interface type with the given members.
    pub const fn interface(name: &'static str, members: &'static [MemberInfo]) -> Self {
        Self {
            name,
            kind: TypeKind::Interface,
            is_sequence: false,
            generic_args: &[],
            members,
        }
    }

    /// Describe an enum type.
    pub const fn enumeration(name: &'static str) -> Self {
        Self {
            name,
            kind: TypeKind::Enum,
            is_sequence: false,
            generic_args: &[],
            members: &[],
        }
    }

    /// Describe a collection type with the given generic arguments.
    ///
    /// The collection is not treated as a sequence until [`TypeInfo::sequence`]
    /// is applied; maps and other multi-argument containers usually are not.
    pub const fn collection(name: &'static str, generic_args: &'static [TypeRef]) -> Self {
        Self {
            name,
            kind: TypeKind::Collection,
            is_sequence: false,
            generic_args,
            members: &[],
        }
    }

    /// Mark the type as iterable.
    pub const fn sequence(mut self) -> Self {
        self.is_sequence = true;
        self
    }

    /// Replace the declared members.
    pub const fn with_members(mut self, members: &'static [MemberInfo]) -> Self {
        self.members = members;
        self
    }

    /// Element type when this is a sequence with exactly one generic argument.
    #[must_use]
    pub fn element_type(&self) -> Option<TypeHandle> {
        match self.generic_args {
            [element] if self.is_sequence => Some(element.resolve()),
            _ => None,
        }
    }

    /// Public instance fields.
    pub fn public_fields(&self) -> impl Iterator<Item = &MemberInfo> {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Field && m.is_public_instance())
    }

    /// Public instance properties.
    pub fn public_properties(&self) -> impl Iterator<Item = &MemberInfo> {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Property && m.is_public_instance())
    }
}

/// Cheap, copyable reference to a `'static` type descriptor.
///
/// Two handles are equal only when they point at the same descriptor. The
/// hash is derived from the type name, which is consistent with that
/// equality and stable across runs.
#[derive(Clone, Copy)]
pub struct TypeHandle(&'static TypeInfo);

impl TypeHandle {
    /// Wrap a static descriptor.
    pub const fn from_static(info: &'static TypeInfo) -> Self {
        Self(info)
    }

    /// Handle for a reflected Rust type.
    #[must_use]
    pub fn of<T: Reflect + ?Sized>() -> Self {
        Self(T::type_info())
    }

    /// The underlying descriptor.
    #[must_use]
    pub fn info(self) -> &'static TypeInfo {
        self.0
    }

    /// Type name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name
    }

    /// Stable hash used when folding the handle into identity hashes.
    #[must_use]
    pub fn stable_hash(self) -> u64 {
        crate::comparison::ordinal_hash(self.0.name)
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.0.name)
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name)
    }
}

/// Types that can describe themselves to the mapper.
pub trait Reflect: 'static {
    /// The type's descriptor. Must return the same reference on every call.
    fn type_info() -> &'static TypeInfo;
}

macro_rules! reflect_primitive {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_info() -> &'static TypeInfo {
                    static INFO: TypeInfo = TypeInfo::primitive($name);
                    &INFO
                }
            }
        )*
    };
}

reflect_primitive! {
    bool => "bool",
    char => "char",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    i128 => "i128",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    u128 => "u128",
    f32 => "f32",
    f64 => "f64",
    String => "String",
    str => "str",
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_info() -> &'static TypeInfo {
        TypeRegistry::global()
            .sequence_of(TypeHandle::of::<T>())
            .info()
    }
}

// Nullability does not change the mapped shape.
impl<T: Reflect> Reflect for Option<T> {
    fn type_info() -> &'static TypeInfo {
        T::type_info()
    }
}

/// Implement [`Reflect`] for a record type.
///
/// ```
/// use sqlshape_core::reflect_record;
/// use sqlshape_core::types::{MemberInfo, TypeHandle};
///
/// struct Tag;
/// reflect_record!(Tag, "Tag", [MemberInfo::field("label", TypeHandle::of::<String>)]);
/// assert_eq!(TypeHandle::of::<Tag>().name(), "Tag");
/// ```
#[macro_export]
macro_rules! reflect_record {
    ($ty:ty, $name:literal, [$($member:expr),* $(,)?]) => {
        impl $crate::types::Reflect for $ty {
            fn type_info() -> &'static $crate::types::TypeInfo {
                const MEMBERS: &[$crate::types::MemberInfo] = &[$($member),*];
                static INFO: $crate::types::TypeInfo =
                    $crate::types::TypeInfo::record($name, MEMBERS);
                &INFO
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node;
    struct Secretive;

    reflect_record!(Node, "Node", [
        MemberInfo::field("value", TypeHandle::of::<i64>),
        MemberInfo::field("next", TypeHandle::of::<Node>),
    ]);

    reflect_record!(Secretive, "Secretive", [
        MemberInfo::field("visible", TypeHandle::of::<i32>),
        MemberInfo::field("hidden", TypeHandle::of::<String>).private(),
        MemberInfo::property("shared", TypeHandle::of::<u8>).static_member(),
        MemberInfo::property("label", TypeHandle::of::<String>),
    ]);

    #[test]
    fn test_handle_identity() {
        assert_eq!(TypeHandle::of::<i64>(), TypeHandle::of::<i64>());
        assert_ne!(TypeHandle::of::<i64>(), TypeHandle::of::<i32>());
        assert_ne!(TypeHandle::of::<String>(), TypeHandle::of::<str>());
    }

    #[test]
    fn test_option_is_transparent() {
        assert_eq!(TypeHandle::of::<Option<i64>>(), TypeHandle::of::<i64>());
    }

    #[test]
    fn test_vec_is_interned_sequence() {
        let a = TypeHandle::of::<Vec<Node>>();
        let b = TypeHandle::of::<Vec<Node>>();
        assert_eq!(a, b);
        assert_eq!(a.name(), "Vec<Node>");
        assert_eq!(a.info().element_type(), Some(TypeHandle::of::<Node>()));
    }

    #[test]
    fn test_cyclic_descriptor_resolves() {
        let node = TypeHandle::of::<Node>();
        let next = node
            .info()
            .public_fields()
            .find(|m| m.name == "next")
            .map(MemberInfo::type_handle);
        assert_eq!(next, Some(node));
    }

    #[test]
    fn test_public_instance_filtering() {
        let info = TypeHandle::of::<Secretive>().info();
        let fields: Vec<_> = info.public_fields().map(|m| m.name).collect();
        let props: Vec<_> = info.public_properties().map(|m| m.name).collect();
        assert_eq!(fields, vec!["visible"]);
        assert_eq!(props, vec!["label"]);
    }

    #[test]
    fn test_element_type_requires_single_argument() {
        static PAIR_ARGS: [TypeRef; 2] = [
            TypeRef::Lazy(TypeHandle::of::<String>),
            TypeRef::Lazy(TypeHandle::of::<i64>),
        ];
        static MAP: TypeInfo = TypeInfo::collection("HashMap<String, i64>", &PAIR_ARGS).sequence();
        assert_eq!(TypeHandle::from_static(&MAP).info().element_type(), None);

        static LIST_ARGS: [TypeRef; 1] = [TypeRef::Lazy(TypeHandle::of::<i64>)];
        static UNMARKED: TypeInfo = TypeInfo::collection("Bag<i64>", &LIST_ARGS);
        assert_eq!(UNMARKED.element_type(), None);
        static LIST: TypeInfo = TypeInfo::collection("List<i64>", &LIST_ARGS).sequence();
        assert_eq!(LIST.element_type(), Some(TypeHandle::of::<i64>()));
    }

    #[test]
    fn test_enumeration_and_member_override() {
        static STATUS: TypeInfo = TypeInfo::enumeration("Status");
        let status = TypeHandle::from_static(&STATUS);
        assert_eq!(status.info().kind, TypeKind::Enum);
        assert_eq!(status.info().public_fields().count(), 0);

        const LABELLED: &[MemberInfo] =
            &[MemberInfo::property("label", TypeHandle::of::<String>)];
        static LABELLED_STATUS: TypeInfo =
            TypeInfo::enumeration("LabelledStatus").with_members(LABELLED);
        let props: Vec<_> = LABELLED_STATUS.public_properties().map(|m| m.name).collect();
        assert_eq!(LABELLED_STATUS.kind, TypeKind::Enum);
        assert_eq!(props, vec!["label"]);
    }

    #[test]
    fn test_display_and_debug() {
        let handle = TypeHandle::of::<Node>();
        assert_eq!(handle.to_string(), "Node");
        assert_eq!(format!("{handle:?}"), "TypeHandle(Node)");
    }
}
