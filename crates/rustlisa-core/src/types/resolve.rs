//! Resolution of `syn` type syntax to interned types

use super::{TypeArena, TypeId};
use crate::error::{FrontendError, FrontendResult};
use crate::location::CodeLocation;
use crate::program::UnitId;
use quote::ToTokens;
use std::sync::Arc;
use syn::{Expr, Lit, Type, TypePath};
use tracing::trace;

/// Names visible while resolving types inside one item
#[derive(Debug, Clone)]
pub struct TypeScope {
    /// Unit whose structs and enums named types are looked up in
    pub owner: UnitId,
    /// Type `Self` stands for inside an impl block
    pub self_ty: Option<TypeId>,
    /// Generic parameters in scope; they resolve to the unknown type
    pub generics: Vec<String>,
    /// Whether an unregistered named type is an error
    pub strict: bool,
    pub file: Arc<str>,
}

impl TypeScope {
    pub fn new(owner: UnitId, file: Arc<str>, strict: bool) -> Self {
        Self {
            owner,
            self_ty: None,
            generics: Vec::new(),
            strict,
            file,
        }
    }

    pub fn with_self(mut self, self_ty: TypeId) -> Self {
        self.self_ty = Some(self_ty);
        self
    }

    pub fn with_generics(mut self, generics: &syn::Generics) -> Self {
        self.generics
            .extend(generics.type_params().map(|param| param.ident.to_string()));
        self
    }
}

impl TypeArena {
    /// Resolve type syntax. Forms the type model does not cover resolve to
    /// the unknown type; only a missing struct or enum is an error.
    pub fn resolve(&mut self, scope: &TypeScope, ty: &Type) -> FrontendResult<TypeId> {
        match ty {
            Type::Paren(paren) => self.resolve(scope, &paren.elem),
            Type::Group(group) => self.resolve(scope, &group.elem),
            Type::Infer(_) | Type::Never(_) => Ok(TypeId::UNKNOWN),
            Type::Tuple(tuple) => {
                let elements = tuple
                    .elems
                    .iter()
                    .map(|elem| self.resolve(scope, elem))
                    .collect::<FrontendResult<Vec<_>>>()?;
                Ok(self.tuple(elements))
            }
            Type::Array(array) => {
                let element = self.resolve(scope, &array.elem)?;
                match literal_length(&array.len) {
                    Some(length) => Ok(self.array(element, length)),
                    None => {
                        trace!(ty = %ty.to_token_stream(), "non-literal array length");
                        Ok(TypeId::UNKNOWN)
                    }
                }
            }
            Type::Ptr(ptr) => {
                let inner = self.resolve(scope, &ptr.elem)?;
                Ok(self.pointer(inner, ptr.mutability.is_some()))
            }
            Type::Reference(reference) => {
                let inner = self.resolve(scope, &reference.elem)?;
                Ok(self.reference(inner, reference.mutability.is_some()))
            }
            Type::Path(path) if path.qself.is_none() => self.resolve_path(scope, path),
            other => {
                trace!(ty = %other.to_token_stream(), "unmodelled type form");
                Ok(TypeId::UNKNOWN)
            }
        }
    }

    /// Resolve an optional function return type; absent means unit
    pub fn resolve_return(&mut self, scope: &TypeScope, output: &syn::ReturnType) -> FrontendResult<TypeId> {
        match output {
            syn::ReturnType::Default => Ok(TypeId::UNIT),
            syn::ReturnType::Type(_, ty) => self.resolve(scope, ty),
        }
    }

    fn resolve_path(&mut self, scope: &TypeScope, path: &TypePath) -> FrontendResult<TypeId> {
        let Some(last) = path.path.segments.last() else {
            return Ok(TypeId::UNKNOWN);
        };
        let name = last.ident.to_string();
        let plain = path.path.segments.len() == 1 && last.arguments.is_none();

        if plain {
            if let Some(prim) = TypeId::primitive(&name) {
                return Ok(prim);
            }
            if name == "Self" {
                return Ok(scope.self_ty.unwrap_or(TypeId::UNKNOWN));
            }
            if scope.generics.contains(&name) {
                return Ok(TypeId::UNKNOWN);
            }
        }

        if let Some(named) = self.find_named(&name, scope.owner) {
            return Ok(named);
        }

        if scope.strict {
            Err(FrontendError::UnresolvedType {
                name: path.to_token_stream().to_string(),
                location: CodeLocation::of(&scope.file, path),
            })
        } else {
            trace!(%name, "unregistered named type resolved to unknown");
            Ok(TypeId::UNKNOWN)
        }
    }
}

/// Value of an integer-literal array length
pub(crate) fn literal_length(expr: &Expr) -> Option<u64> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Int(int) => int.base10_parse().ok(),
            _ => None,
        },
        Expr::Paren(paren) => literal_length(&paren.expr),
        Expr::Group(group) => literal_length(&group.expr),
        _ => None,
    }
}
