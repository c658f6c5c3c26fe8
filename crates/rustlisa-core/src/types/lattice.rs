//! Assignability lattice over interned types
//!
//! The unknown type is the top element: everything can be assigned to it.
//! Below the top, assignability is structural with no numeric widening:
//! - primitives only to themselves
//! - pointers and references by shape, mutability and inner type
//! - arrays by length and element type
//! - tuples, structs and enums by identical ordered member types

use super::{TypeArena, TypeId, TypeKind};

impl TypeArena {
    /// Whether a value of type `from` may flow into a slot of type `to`
    pub fn can_be_assigned_to(&self, from: TypeId, to: TypeId) -> bool {
        if to == TypeId::UNKNOWN {
            return true;
        }
        match (self.kind(from), self.kind(to)) {
            (
                TypeKind::Pointer { inner: a, mutable: ma },
                TypeKind::Pointer { inner: b, mutable: mb },
            )
            | (
                TypeKind::Reference { inner: a, mutable: ma },
                TypeKind::Reference { inner: b, mutable: mb },
            ) => ma == mb && self.can_be_assigned_to(*a, *b),
            (
                TypeKind::Array { element: a, length: la },
                TypeKind::Array { element: b, length: lb },
            ) => la == lb && self.can_be_assigned_to(*a, *b),
            (TypeKind::Tuple(a), TypeKind::Tuple(b)) => a == b,
            (TypeKind::Struct { name: na, owner: oa }, TypeKind::Struct { name: nb, owner: ob })
            | (TypeKind::Enum { name: na, owner: oa }, TypeKind::Enum { name: nb, owner: ob }) => {
                na == nb && oa == ob && self.member_types(from) == self.member_types(to)
            }
            (TypeKind::Unknown, _) => false,
            _ => from == to && from.is_primitive(),
        }
    }

    /// Least common supertype: the target if either side flows into the
    /// other, the unknown type otherwise
    pub fn common_supertype(&self, a: TypeId, b: TypeId) -> TypeId {
        if self.can_be_assigned_to(a, b) {
            b
        } else if self.can_be_assigned_to(b, a) {
            a
        } else {
            TypeId::UNKNOWN
        }
    }

    /// Result type of a binary operator over operands of these types
    pub fn operator_result(&self, left: TypeId, right: TypeId) -> TypeId {
        if left == right {
            left
        } else {
            TypeId::UNKNOWN
        }
    }

    fn member_types(&self, ty: TypeId) -> Vec<TypeId> {
        match self.layout(ty) {
            Some(super::Layout::Struct(fields)) => fields.iter().map(|f| f.ty).collect(),
            Some(super::Layout::Enum(variants)) => variants.iter().flat_map(|v| v.shape.types()).collect(),
            None => Vec::new(),
        }
    }
}
