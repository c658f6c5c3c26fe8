//! Lowering of `syn` expressions and patterns to typed CFG nodes
//!
//! Statement-level control flow is handled by [`CfgBuilder`](crate::cfg::CfgBuilder);
//! this module turns the straight-line pieces (operators, calls, literals,
//! accesses, patterns) into [`Expr`](crate::cfg::Expr) and
//! [`Pattern`](crate::cfg::Pattern) values.

mod expr;
mod pattern;

use crate::cfg::VariableRef;
use crate::location::CodeLocation;
use crate::types::{TypeArena, TypeId, TypeKind, TypeScope};
use quote::ToTokens;
use std::collections::HashMap;
use syn::spanned::Spanned;

/// Per-body state shared by expression and pattern lowering
pub(crate) struct LoweringContext<'a> {
    pub(crate) types: &'a mut TypeArena,
    pub(crate) scope: &'a TypeScope,
    /// Declared type and mutability of the locals seen so far; later
    /// bindings shadow
    locals: HashMap<String, (TypeId, bool)>,
}

impl<'a> LoweringContext<'a> {
    pub(crate) fn new(types: &'a mut TypeArena, scope: &'a TypeScope) -> Self {
        Self {
            types,
            scope,
            locals: HashMap::new(),
        }
    }

    pub(crate) fn location<T: Spanned + ?Sized>(&self, node: &T) -> CodeLocation {
        CodeLocation::of(&self.scope.file, node)
    }

    pub(crate) fn bind_local(&mut self, name: &str, ty: TypeId, mutable: bool) {
        self.locals.insert(name.to_string(), (ty, mutable));
    }

    pub(crate) fn local_type(&self, name: &str) -> Option<TypeId> {
        self.locals.get(name).map(|(ty, _)| *ty)
    }

    /// Reference to `name` carrying the mutability it was declared with
    pub(crate) fn variable(&self, name: &str) -> VariableRef {
        let mutable = self.locals.get(name).is_some_and(|(_, mutable)| *mutable);
        VariableRef::new(name, mutable)
    }

    /// Source-like spelling of a resolved type, falling back to the syntax
    /// for types the model does not cover
    pub(crate) fn type_text(&self, syntax: &syn::Type, ty: TypeId) -> String {
        if ty == TypeId::UNKNOWN {
            syntax.to_token_stream().to_string()
        } else {
            self.types.display(ty).to_string()
        }
    }

    /// Strip references and raw pointers
    fn peel_indirection(&self, mut ty: TypeId) -> TypeId {
        while let TypeKind::Reference { inner, .. } | TypeKind::Pointer { inner, .. } = self.types.kind(ty) {
            ty = *inner;
        }
        ty
    }
}

/// `a::b::C`, ignoring generic arguments
pub(crate) fn path_to_string(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}
