//! Pattern lowering and local binding

use super::{path_to_string, LoweringContext};
use crate::cfg::{Expr, Pattern, VariableRef};
use crate::error::{FrontendError, FrontendResult};
use crate::types::{TypeId, TypeKind, VariantShape};
use syn::{Member, Pat, RangeLimits};

impl LoweringContext<'_> {
    pub(crate) fn lower_pattern(&mut self, pat: &Pat) -> FrontendResult<Pattern> {
        let location = self.location(pat);
        match pat {
            Pat::Ident(ident) => {
                if ident.subpat.is_some() {
                    return Err(FrontendError::unsupported("`@` binding", location));
                }
                Ok(Pattern::Binding(VariableRef::new(
                    ident.ident.to_string(),
                    ident.mutability.is_some(),
                )))
            }
            Pat::Type(typed) => self.lower_pattern(&typed.pat),
            Pat::Paren(paren) => self.lower_pattern(&paren.pat),
            Pat::Reference(reference) => Ok(Pattern::Ref {
                mutable: reference.mutability.is_some(),
                inner: Box::new(self.lower_pattern(&reference.pat)?),
            }),
            Pat::Struct(pattern) => {
                if pattern.qself.is_some() {
                    return Err(FrontendError::unsupported("qualified self path", location));
                }
                let ty = match self.enum_variant(&pattern.path) {
                    Some((ty, _, _)) => ty,
                    None => pattern
                        .path
                        .get_ident()
                        .and_then(|ident| self.struct_named(&ident.to_string()))
                        .unwrap_or(TypeId::UNKNOWN),
                };
                let mut fields = Vec::with_capacity(pattern.fields.len());
                for field in &pattern.fields {
                    let name = match &field.member {
                        Member::Named(ident) => ident.to_string(),
                        Member::Unnamed(index) => index.index.to_string(),
                    };
                    fields.push((name, self.lower_pattern(&field.pat)?));
                }
                Ok(Pattern::Struct {
                    name: path_to_string(&pattern.path),
                    ty,
                    fields,
                    rest: pattern.rest.is_some(),
                })
            }
            Pat::TupleStruct(pattern) => {
                if pattern.qself.is_some() {
                    return Err(FrontendError::unsupported("qualified self path", location));
                }
                let elements = self.lower_patterns(pattern.elems.iter())?;
                Ok(Pattern::TupleStruct {
                    path: path_to_string(&pattern.path),
                    elements,
                })
            }
            Pat::Path(path) => Ok(Pattern::Path(path_to_string(&path.path))),
            Pat::Tuple(tuple) => Ok(Pattern::Tuple(self.lower_patterns(tuple.elems.iter())?)),
            Pat::Lit(lit) => Ok(Pattern::Literal(Box::new(self.lower_literal(lit)?))),
            Pat::Range(range) => {
                let start = self.lower_bound(range.start.as_deref())?;
                let end = self.lower_bound(range.end.as_deref())?;
                Ok(Pattern::Range {
                    start,
                    end,
                    inclusive: matches!(range.limits, RangeLimits::Closed(_)),
                })
            }
            Pat::Or(or) => Ok(Pattern::Or(self.lower_patterns(or.cases.iter())?)),
            Pat::Rest(_) => Ok(Pattern::Rest),
            Pat::Wild(_) => Ok(Pattern::Wildcard),
            Pat::Slice(_) => Err(FrontendError::unsupported("slice pattern", location)),
            Pat::Const(_) => Err(FrontendError::unsupported("const block pattern", location)),
            Pat::Macro(_) => Err(FrontendError::unsupported("macro in pattern position", location)),
            _ => Err(FrontendError::unsupported("pattern", location)),
        }
    }

    fn lower_patterns<'p>(&mut self, pats: impl Iterator<Item = &'p Pat>) -> FrontendResult<Vec<Pattern>> {
        pats.map(|p| self.lower_pattern(p)).collect()
    }

    fn lower_bound(&mut self, bound: Option<&syn::Expr>) -> FrontendResult<Option<Box<Expr>>> {
        bound.map(|e| self.lower_expr(e).map(Box::new)).transpose()
    }

    /// Record the variables `pattern` introduces when matched against `ty`
    pub(crate) fn bind_pattern(&mut self, pattern: &Pattern, ty: TypeId) {
        match pattern {
            Pattern::Binding(var) => self.bind_local(&var.name, ty, var.mutable),
            Pattern::Ref { inner, .. } => {
                let inner_ty = self.pointee(ty);
                self.bind_pattern(inner, inner_ty);
            }
            Pattern::Struct { ty: own, fields, name, .. } => {
                let declared = self.declared_fields(*own, name);
                for (field, sub) in fields {
                    let field_ty = declared
                        .iter()
                        .find(|(n, _)| n == field)
                        .map(|(_, t)| *t)
                        .unwrap_or(TypeId::UNKNOWN);
                    self.bind_pattern(sub, field_ty);
                }
            }
            Pattern::Tuple(elements) => {
                let element_types = match self.types.kind(self.peel_indirection(ty)) {
                    TypeKind::Tuple(types) if types.len() == elements.len() => types.clone(),
                    _ => vec![TypeId::UNKNOWN; elements.len()],
                };
                for (sub, sub_ty) in elements.iter().zip(element_types) {
                    self.bind_pattern(sub, sub_ty);
                }
            }
            Pattern::TupleStruct { elements, .. } | Pattern::Or(elements) => {
                for sub in elements {
                    self.bind_pattern(sub, TypeId::UNKNOWN);
                }
            }
            Pattern::Path(_) | Pattern::Literal(_) | Pattern::Range { .. } | Pattern::Rest | Pattern::Wildcard => {}
        }
    }

    /// Named fields of a struct, or of the enum variant a struct pattern names
    fn declared_fields(&self, ty: TypeId, pattern_name: &str) -> Vec<(String, TypeId)> {
        if self.types.is_struct(ty) {
            return self.types.fields(ty).iter().map(|f| (f.name.clone(), f.ty)).collect();
        }
        let variant = pattern_name.rsplit("::").next().unwrap_or(pattern_name);
        match self.types.variant(ty, variant).map(|v| &v.shape) {
            Some(VariantShape::Struct(fields)) => fields.iter().map(|f| (f.name.clone(), f.ty)).collect(),
            _ => Vec::new(),
        }
    }
}
