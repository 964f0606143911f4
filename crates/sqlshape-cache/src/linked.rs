//! Linked-type expansion.
//!
//! Starting from a result type, collects every type reachable through public
//! instance fields and properties. Mapping-plan generation needs all of them
//! up front. Each type is reported once; the root always comes last.
//!
//! A sequence type with a single generic argument (`Vec<Person>`) is looked
//! through: its element type is analyzed instead of the collection, and the
//! element itself is reported right after the types found beneath it.

use std::collections::HashSet;

use sqlshape_core::{Result, TypeGraphError, TypeGraphErrorKind, TypeHandle};

use crate::config::TraversalLimits;

/// Expand `root` into its linked types.
///
/// The visited set is shared across the whole walk, so a type reachable
/// from several branches is expanded only once and cycles terminate.
///
/// # Example
///
/// ```
/// use sqlshape_cache::{TraversalLimits, linked_types};
/// use sqlshape_core::reflect_record;
/// use sqlshape_core::types::{MemberInfo, TypeHandle};
///
/// struct Employee;
/// reflect_record!(Employee, "Employee", [
///     MemberInfo::field("manager", TypeHandle::of::<Employee>),
/// ]);
///
/// let employee = TypeHandle::of::<Employee>();
/// let linked = linked_types(employee, &TraversalLimits::default()).unwrap();
/// assert_eq!(linked, vec![employee]);
/// ```
pub fn linked_types(root: TypeHandle, limits: &TraversalLimits) -> Result<Vec<TypeHandle>> {
    let mut walker = Walker {
        root,
        limits,
        visited: HashSet::from([root]),
        discovered: Vec::new(),
    };
    walker.expand(root, 0)?;
    walker.discovered.push(root);
    Ok(walker.discovered)
}

struct Walker<'a> {
    root: TypeHandle,
    limits: &'a TraversalLimits,
    visited: HashSet<TypeHandle>,
    discovered: Vec<TypeHandle>,
}

impl Walker<'_> {
    fn expand(&mut self, ty: TypeHandle, depth: usize) -> Result<()> {
        if depth > self.limits.max_depth {
            return Err(self.too_complex(TypeGraphErrorKind::TooDeep, self.limits.max_depth));
        }

        let element = ty.info().element_type();
        let analyzed = match element {
            // Element already visited: it is (or will be) expanded on its own.
            Some(element) if !self.visited.insert(element) => return Ok(()),
            Some(element) => element,
            None => ty,
        };

        let info = analyzed.info();
        let mut fresh = Vec::new();
        for member in info.public_fields().chain(info.public_properties()) {
            let member_ty = member.type_handle();
            if self.visited.insert(member_ty) {
                fresh.push(member_ty);
            }
        }
        if self.visited.len() > self.limits.max_types {
            return Err(self.too_complex(TypeGraphErrorKind::TooManyTypes, self.limits.max_types));
        }

        self.discovered.extend_from_slice(&fresh);
        for child in fresh {
            self.expand(child, depth + 1)?;
        }

        if element.is_some() {
            self.discovered.push(analyzed);
        }
        Ok(())
    }

    fn too_complex(&self, kind: TypeGraphErrorKind, limit: usize) -> sqlshape_core::Error {
        tracing::warn!(
            target: "sqlshape::linked",
            root = self.root.name(),
            ?kind,
            limit,
            visited = self.visited.len(),
            "type graph too complex to analyze"
        );
        TypeGraphError {
            kind,
            root: self.root.name(),
            limit,
        }
        .into()
    }
}
