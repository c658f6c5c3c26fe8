//! Expression lowering
//!
//! Postfix forms are told apart here: `a[i]` is an array access, `t.0` a
//! tuple access, `s.f` an attribute access, and both `r.m(..)` and
//! `f(..)` become unresolved calls. Paths that name an enum variant or a
//! registered struct become literals carrying the canonical type.

use super::{path_to_string, LoweringContext};
use crate::cfg::{BinaryOp, CallKind, CallPolicy, EnumPayload, Expr, ExprKind, Literal, UnaryOp, UnresolvedCall};
use crate::error::{FrontendError, FrontendResult};
use crate::location::CodeLocation;
use crate::types::{literal_length, TypeId, TypeKind, VariantShape};
use syn::{Expr as SynExpr, ExprLit, Lit, Member, RangeLimits};

impl LoweringContext<'_> {
    /// Lower an expression that contains no statement-level control flow
    pub(crate) fn lower_expr(&mut self, expr: &SynExpr) -> FrontendResult<Expr> {
        let location = self.location(expr);
        match expr {
            SynExpr::Lit(lit) => self.lower_literal(lit),
            SynExpr::Path(path) => {
                if path.qself.is_some() {
                    return Err(FrontendError::unsupported("qualified self path", location));
                }
                Ok(self.lower_path(&path.path, location))
            }
            SynExpr::Binary(binary) => self.lower_binary(binary, location),
            SynExpr::Unary(unary) => {
                let operand = self.lower_expr(&unary.expr)?;
                let (op, ty) = match unary.op {
                    syn::UnOp::Neg(_) => (UnaryOp::Neg, operand.ty),
                    syn::UnOp::Not(_) => (UnaryOp::Not, operand.ty),
                    syn::UnOp::Deref(_) => (UnaryOp::Deref, self.pointee(operand.ty)),
                    _ => return Err(FrontendError::unsupported("unary operator", location)),
                };
                Ok(Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    ty,
                    location,
                ))
            }
            SynExpr::Reference(reference) => {
                let operand = self.lower_expr(&reference.expr)?;
                let mutable = reference.mutability.is_some();
                let ty = self.types.reference(operand.ty, mutable);
                Ok(Expr::new(
                    ExprKind::Borrow {
                        mutable,
                        operand: Box::new(operand),
                    },
                    ty,
                    location,
                ))
            }
            SynExpr::Cast(cast) => {
                let operand = self.lower_expr(&cast.expr)?;
                let ty = self.types.resolve(self.scope, &cast.ty)?;
                let target = self.type_text(&cast.ty, ty);
                Ok(Expr::new(
                    ExprKind::Cast {
                        operand: Box::new(operand),
                        target,
                    },
                    ty,
                    location,
                ))
            }
            SynExpr::Range(range) => {
                let start = self.lower_boxed(range.start.as_deref())?;
                let end = self.lower_boxed(range.end.as_deref())?;
                Ok(Expr::new(
                    ExprKind::Range {
                        start,
                        end,
                        inclusive: matches!(range.limits, RangeLimits::Closed(_)),
                    },
                    TypeId::UNKNOWN,
                    location,
                ))
            }
            SynExpr::Assign(assign) => {
                let target = self.lower_expr(&assign.left)?;
                let value = self.lower_expr(&assign.right)?;
                Ok(Expr::new(
                    ExprKind::Assign {
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    TypeId::UNIT,
                    location,
                ))
            }
            SynExpr::Let(test) => {
                let scrutinee = self.lower_expr(&test.expr)?;
                let pattern = self.lower_pattern(&test.pat)?;
                self.bind_pattern(&pattern, scrutinee.ty);
                Ok(Expr::new(
                    ExprKind::PatternTest {
                        pattern,
                        scrutinee: Box::new(scrutinee),
                    },
                    TypeId::BOOL,
                    location,
                ))
            }
            SynExpr::Index(index) => {
                let base = self.lower_expr(&index.expr)?;
                let idx = self.lower_expr(&index.index)?;
                let ty = match self.types.kind(self.peel_indirection(base.ty)) {
                    TypeKind::Array { element, .. } => *element,
                    _ => TypeId::UNKNOWN,
                };
                Ok(Expr::new(
                    ExprKind::ArrayAccess {
                        base: Box::new(base),
                        index: Box::new(idx),
                    },
                    ty,
                    location,
                ))
            }
            SynExpr::Field(field) => {
                let base = self.lower_expr(&field.base)?;
                let target = self.peel_indirection(base.ty);
                match &field.member {
                    Member::Unnamed(index) => {
                        let ty = match self.types.kind(target) {
                            TypeKind::Tuple(elements) => {
                                elements.get(index.index as usize).copied().unwrap_or(TypeId::UNKNOWN)
                            }
                            _ => self.field_type(target, &index.index.to_string()),
                        };
                        Ok(Expr::new(
                            ExprKind::TupleAccess {
                                base: Box::new(base),
                                index: index.index,
                            },
                            ty,
                            location,
                        ))
                    }
                    Member::Named(ident) => {
                        let name = ident.to_string();
                        let ty = self.field_type(target, &name);
                        Ok(Expr::new(
                            ExprKind::AttributeAccess {
                                base: Box::new(base),
                                field: name,
                            },
                            ty,
                            location,
                        ))
                    }
                }
            }
            SynExpr::MethodCall(call) => {
                let mut args = Vec::with_capacity(call.args.len() + 1);
                args.push(self.lower_expr(&call.receiver)?);
                for arg in &call.args {
                    args.push(self.lower_expr(arg)?);
                }
                Ok(Expr::new(
                    ExprKind::Call(UnresolvedCall {
                        target: call.method.to_string(),
                        qualifier: None,
                        kind: CallKind::Method,
                        args,
                        policy: CallPolicy::default(),
                    }),
                    TypeId::UNKNOWN,
                    location,
                ))
            }
            SynExpr::Call(call) => self.lower_call(call, location),
            SynExpr::Struct(literal) => self.lower_struct_literal(literal, location),
            SynExpr::Tuple(tuple) => {
                if tuple.elems.is_empty() {
                    return Ok(Expr::new(ExprKind::Literal(Literal::Unit), TypeId::UNIT, location));
                }
                let values = self.lower_all(tuple.elems.iter())?;
                let ty = self.types.tuple(values.iter().map(|v| v.ty).collect());
                Ok(Expr::new(ExprKind::Tuple(values), ty, location))
            }
            SynExpr::Array(array) => {
                let values = self.lower_all(array.elems.iter())?;
                let element = match values.split_first() {
                    Some((first, rest)) if rest.iter().all(|v| v.ty == first.ty) => first.ty,
                    _ => TypeId::UNKNOWN,
                };
                let ty = self.types.array(element, values.len() as u64);
                Ok(Expr::new(ExprKind::Array(values), ty, location))
            }
            SynExpr::Repeat(repeat) => {
                let Some(length) = literal_length(&repeat.len) else {
                    return Err(FrontendError::unsupported("array repeat with a non-literal length", location));
                };
                let element = self.lower_expr(&repeat.expr)?;
                let ty = self.types.array(element.ty, length);
                Ok(Expr::new(
                    ExprKind::ArrayRepeat {
                        element: Box::new(element),
                        length,
                    },
                    ty,
                    location,
                ))
            }
            SynExpr::Paren(paren) => self.lower_expr(&paren.expr),
            SynExpr::Group(group) => self.lower_expr(&group.expr),
            SynExpr::Macro(mac) => Ok(self.lower_macro(&mac.mac, location)),
            other => Err(FrontendError::unsupported(construct_name(other), location)),
        }
    }

    /// A macro invocation, left unexpanded
    pub(crate) fn lower_macro(&mut self, mac: &syn::Macro, location: CodeLocation) -> Expr {
        Expr::new(
            ExprKind::Macro {
                path: path_to_string(&mac.path),
                tokens: mac.tokens.to_string(),
            },
            TypeId::UNKNOWN,
            location,
        )
    }

    pub(crate) fn lower_literal(&mut self, lit: &ExprLit) -> FrontendResult<Expr> {
        let location = self.location(lit);
        let (value, ty) = match &lit.lit {
            Lit::Int(int) => {
                let value = int
                    .base10_parse::<u128>()
                    .map_err(|_| FrontendError::unsupported("integer literal out of range", location.clone()))?;
                let ty = match int.suffix() {
                    "" => TypeId::I32,
                    suffix => TypeId::primitive(suffix).unwrap_or(TypeId::UNKNOWN),
                };
                (Literal::Int(value), ty)
            }
            Lit::Float(float) => {
                let value = float
                    .base10_parse::<f64>()
                    .map_err(|_| FrontendError::unsupported("float literal", location.clone()))?;
                let ty = match float.suffix() {
                    "f32" => TypeId::F32,
                    _ => TypeId::F64,
                };
                (Literal::Float(value), ty)
            }
            Lit::Bool(b) => (Literal::Bool(b.value), TypeId::BOOL),
            Lit::Char(c) => (Literal::Char(c.value()), TypeId::CHAR),
            Lit::Byte(b) => (Literal::Int(u128::from(b.value())), TypeId::U8),
            Lit::Str(s) => (Literal::Str(s.value()), self.types.reference(TypeId::STR, false)),
            _ => return Err(FrontendError::unsupported("byte string literal", location)),
        };
        Ok(Expr::new(ExprKind::Literal(value), ty, location))
    }

    fn lower_path(&mut self, path: &syn::Path, location: CodeLocation) -> Expr {
        if let Some(ident) = path.get_ident() {
            let name = ident.to_string();
            if self.local_type(&name).is_none() {
                if let Some(ty) = self.struct_named(&name) {
                    return Expr::new(ExprKind::StructLiteral { name, fields: Vec::new() }, ty, location);
                }
            }
            let ty = self.local_type(&name).unwrap_or(TypeId::UNKNOWN);
            return Expr::new(ExprKind::Variable(self.variable(&name)), ty, location);
        }
        if let Some((ty, name, variant)) = self.enum_variant(path) {
            return Expr::new(
                ExprKind::EnumLiteral {
                    name,
                    variant,
                    payload: EnumPayload::Unit,
                },
                ty,
                location,
            );
        }
        Expr::new(ExprKind::Path(path_to_string(path)), TypeId::UNKNOWN, location)
    }

    fn lower_binary(&mut self, binary: &syn::ExprBinary, location: CodeLocation) -> FrontendResult<Expr> {
        let left = self.lower_expr(&binary.left)?;
        let right = self.lower_expr(&binary.right)?;
        let (op, compound) = match binary.op {
            syn::BinOp::Add(_) => (BinaryOp::Add, false),
            syn::BinOp::Sub(_) => (BinaryOp::Sub, false),
            syn::BinOp::Mul(_) => (BinaryOp::Mul, false),
            syn::BinOp::Div(_) => (BinaryOp::Div, false),
            syn::BinOp::Rem(_) => (BinaryOp::Rem, false),
            syn::BinOp::And(_) => (BinaryOp::And, false),
            syn::BinOp::Or(_) => (BinaryOp::Or, false),
            syn::BinOp::BitXor(_) => (BinaryOp::BitXor, false),
            syn::BinOp::BitAnd(_) => (BinaryOp::BitAnd, false),
            syn::BinOp::BitOr(_) => (BinaryOp::BitOr, false),
            syn::BinOp::Shl(_) => (BinaryOp::Shl, false),
            syn::BinOp::Shr(_) => (BinaryOp::Shr, false),
            syn::BinOp::Eq(_) => (BinaryOp::Eq, false),
            syn::BinOp::Lt(_) => (BinaryOp::Lt, false),
            syn::BinOp::Le(_) => (BinaryOp::Le, false),
            syn::BinOp::Ne(_) => (BinaryOp::Ne, false),
            syn::BinOp::Ge(_) => (BinaryOp::Ge, false),
            syn::BinOp::Gt(_) => (BinaryOp::Gt, false),
            syn::BinOp::AddAssign(_) => (BinaryOp::Add, true),
            syn::BinOp::SubAssign(_) => (BinaryOp::Sub, true),
            syn::BinOp::MulAssign(_) => (BinaryOp::Mul, true),
            syn::BinOp::DivAssign(_) => (BinaryOp::Div, true),
            syn::BinOp::RemAssign(_) => (BinaryOp::Rem, true),
            syn::BinOp::BitXorAssign(_) => (BinaryOp::BitXor, true),
            syn::BinOp::BitAndAssign(_) => (BinaryOp::BitAnd, true),
            syn::BinOp::BitOrAssign(_) => (BinaryOp::BitOr, true),
            syn::BinOp::ShlAssign(_) => (BinaryOp::Shl, true),
            syn::BinOp::ShrAssign(_) => (BinaryOp::Shr, true),
            _ => return Err(FrontendError::unsupported("binary operator", location)),
        };

        if !compound {
            return Ok(self.binary(op, left, right, location));
        }

        // `x op= e` is `x = x op e`
        let target = left.clone();
        let value = self.binary(op, left, right, location.clone());
        Ok(Expr::new(
            ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
            },
            TypeId::UNIT,
            location,
        ))
    }

    /// Build a binary node, typing it from its operands
    pub(crate) fn binary(&self, op: BinaryOp, left: Expr, right: Expr, location: CodeLocation) -> Expr {
        let ty = if op.is_boolean() {
            TypeId::BOOL
        } else {
            self.types.operator_result(left.ty, right.ty)
        };
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            location,
        )
    }

    fn lower_call(&mut self, call: &syn::ExprCall, location: CodeLocation) -> FrontendResult<Expr> {
        let SynExpr::Path(callee) = call.func.as_ref() else {
            return Err(FrontendError::unsupported("call of a computed callee", location));
        };
        if callee.qself.is_some() {
            return Err(FrontendError::unsupported("qualified self path", location));
        }
        let path = &callee.path;
        let args = self.lower_all(call.args.iter())?;

        if let Some((ty, name, variant)) = self.enum_variant(path) {
            return Ok(Expr::new(
                ExprKind::EnumLiteral {
                    name,
                    variant,
                    payload: EnumPayload::Tuple(args),
                },
                ty,
                location,
            ));
        }

        if let Some(ident) = path.get_ident() {
            let name = ident.to_string();
            if let Some(ty) = self.struct_named(&name) {
                return Ok(Expr::new(ExprKind::StructLiteral { name, fields: args }, ty, location));
            }
        }

        let mut segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        let target = segments.pop().unwrap_or_default();
        let qualifier = if segments.is_empty() {
            None
        } else {
            Some(segments.join("::"))
        };
        Ok(Expr::new(
            ExprKind::Call(UnresolvedCall {
                target,
                qualifier,
                kind: CallKind::Function,
                args,
                policy: CallPolicy::default(),
            }),
            TypeId::UNKNOWN,
            location,
        ))
    }

    fn lower_struct_literal(&mut self, literal: &syn::ExprStruct, location: CodeLocation) -> FrontendResult<Expr> {
        if literal.qself.is_some() {
            return Err(FrontendError::unsupported("qualified self path", location));
        }
        if literal.rest.is_some() || literal.dot2_token.is_some() {
            return Err(FrontendError::unsupported("functional record update", location));
        }

        let mut supplied = Vec::with_capacity(literal.fields.len());
        for field in &literal.fields {
            let name = match &field.member {
                Member::Named(ident) => ident.to_string(),
                Member::Unnamed(index) => index.index.to_string(),
            };
            supplied.push((name, self.lower_expr(&field.expr)?));
        }

        if let Some((ty, name, variant)) = self.enum_variant(&literal.path) {
            let declared: Vec<String> = match self.types.variant(ty, &variant).map(|v| &v.shape) {
                Some(VariantShape::Struct(fields)) => fields.iter().map(|f| f.name.clone()).collect(),
                _ => {
                    return Err(FrontendError::unsupported(
                        format!("struct literal of non-struct variant `{}::{}`", name, variant),
                        location,
                    ))
                }
            };
            let values = order_fields(&format!("{}::{}", name, variant), &declared, supplied, &location)?;
            return Ok(Expr::new(
                ExprKind::EnumLiteral {
                    name,
                    variant,
                    payload: EnumPayload::Struct(values),
                },
                ty,
                location,
            ));
        }

        let name = path_to_string(&literal.path);
        let struct_ty = match literal.path.get_ident() {
            Some(ident) => self.struct_named(&ident.to_string()),
            None => None,
        };
        match struct_ty {
            Some(ty) => {
                let name = self.types.display(ty).to_string();
                let declared: Vec<String> = self.types.fields(ty).iter().map(|f| f.name.clone()).collect();
                let values = order_fields(&name, &declared, supplied, &location)?;
                Ok(Expr::new(ExprKind::StructLiteral { name, fields: values }, ty, location))
            }
            None if self.scope.strict => Err(FrontendError::UnresolvedType { name, location }),
            None => {
                let values = supplied.into_iter().map(|(_, value)| value).collect();
                Ok(Expr::new(
                    ExprKind::StructLiteral { name, fields: values },
                    TypeId::UNKNOWN,
                    location,
                ))
            }
        }
    }

    fn lower_boxed(&mut self, expr: Option<&SynExpr>) -> FrontendResult<Option<Box<Expr>>> {
        expr.map(|e| self.lower_expr(e).map(Box::new)).transpose()
    }

    pub(crate) fn lower_all<'e>(&mut self, exprs: impl Iterator<Item = &'e SynExpr>) -> FrontendResult<Vec<Expr>> {
        exprs.map(|e| self.lower_expr(e)).collect()
    }

    /// Struct registered under `name`, with `Self` naming the impl type
    pub(crate) fn struct_named(&self, name: &str) -> Option<TypeId> {
        if name == "Self" {
            return self.scope.self_ty.filter(|&ty| self.types.is_struct(ty));
        }
        self.types.find_struct(name, self.scope.owner)
    }

    /// `(enum type, enum name, variant)` when `path` ends in `Enum::Variant`
    pub(crate) fn enum_variant(&self, path: &syn::Path) -> Option<(TypeId, String, String)> {
        let count = path.segments.len();
        if count < 2 {
            return None;
        }
        let owner = path.segments[count - 2].ident.to_string();
        let variant = path.segments[count - 1].ident.to_string();
        let ty = if owner == "Self" {
            self.scope.self_ty.filter(|&ty| self.types.is_enum(ty))?
        } else {
            self.types.find_enum(&owner, self.scope.owner)?
        };
        self.types.variant(ty, &variant)?;
        Some((ty, self.types.display(ty).to_string(), variant))
    }

    pub(crate) fn field_type(&self, ty: TypeId, field: &str) -> TypeId {
        self.types
            .fields(ty)
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.ty)
            .unwrap_or(TypeId::UNKNOWN)
    }

    pub(crate) fn pointee(&self, ty: TypeId) -> TypeId {
        match self.types.kind(ty) {
            TypeKind::Reference { inner, .. } | TypeKind::Pointer { inner, .. } => *inner,
            _ => TypeId::UNKNOWN,
        }
    }
}

/// Arrange named field values in declaration order
fn order_fields(
    owner: &str,
    declared: &[String],
    mut supplied: Vec<(String, Expr)>,
    location: &CodeLocation,
) -> FrontendResult<Vec<Expr>> {
    let mut ordered = Vec::with_capacity(declared.len());
    for name in declared {
        let Some(pos) = supplied.iter().position(|(n, _)| n == name) else {
            return Err(FrontendError::unsupported(
                format!("literal of `{}` without field `{}`", owner, name),
                location.clone(),
            ));
        };
        ordered.push(supplied.swap_remove(pos).1);
    }
    if let Some((extra, _)) = supplied.first() {
        return Err(FrontendError::unsupported(
            format!("literal of `{}` with unknown field `{}`", owner, extra),
            location.clone(),
        ));
    }
    Ok(ordered)
}

/// Human-readable name of an expression form, for diagnostics
fn construct_name(expr: &SynExpr) -> &'static str {
    match expr {
        SynExpr::Async(_) => "async block",
        SynExpr::Await(_) => "`.await`",
        SynExpr::Block(_) => "block in expression position",
        SynExpr::Break(_) => "`break` in expression position",
        SynExpr::Closure(_) => "closure",
        SynExpr::Const(_) => "const block",
        SynExpr::Continue(_) => "`continue` in expression position",
        SynExpr::ForLoop(_) => "`for` in expression position",
        SynExpr::If(_) => "`if` in expression position",
        SynExpr::Infer(_) => "`_` expression",
        SynExpr::Loop(_) => "`loop` in expression position",
        SynExpr::Match(_) => "`match` in expression position",
        SynExpr::Return(_) => "`return` in expression position",
        SynExpr::Try(_) => "`?` operator",
        SynExpr::TryBlock(_) => "try block",
        SynExpr::Unsafe(_) => "unsafe block in expression position",
        SynExpr::While(_) => "`while` in expression position",
        SynExpr::Yield(_) => "yield",
        _ => "expression",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::UnitId;
    use crate::types::{Field, TypeArena, TypeScope};
    use insta::assert_snapshot;
    use std::sync::Arc;

    fn scope() -> TypeScope {
        TypeScope::new(UnitId::new(0), Arc::from("expr.rs"), true)
    }

    fn lower(arena: &mut TypeArena, scope: &TypeScope, src: &str) -> FrontendResult<Expr> {
        let expr: SynExpr = syn::parse_str(src).unwrap();
        LoweringContext::new(arena, scope).lower_expr(&expr)
    }

    fn with_point(arena: &mut TypeArena, scope: &TypeScope) -> TypeId {
        let point = arena.declare_struct("Point", scope.owner);
        arena.define_struct(
            point,
            vec![
                Field {
                    name: "x".into(),
                    ty: TypeId::I32,
                },
                Field {
                    name: "y".into(),
                    ty: TypeId::I32,
                },
            ],
        );
        point
    }

    #[test]
    fn test_literal_types() {
        let mut arena = TypeArena::new();
        let scope = scope();
        assert_eq!(lower(&mut arena, &scope, "42").unwrap().ty, TypeId::I32);
        assert_eq!(lower(&mut arena, &scope, "42u8").unwrap().ty, TypeId::U8);
        assert_eq!(lower(&mut arena, &scope, "1.5").unwrap().ty, TypeId::F64);
        assert_eq!(lower(&mut arena, &scope, "'c'").unwrap().ty, TypeId::CHAR);
        assert_eq!(lower(&mut arena, &scope, "()").unwrap().ty, TypeId::UNIT);
        let s = lower(&mut arena, &scope, "\"hi\"").unwrap();
        assert_eq!(arena.display(s.ty).to_string(), "&str");
    }

    #[test]
    fn test_binary_typing() {
        let mut arena = TypeArena::new();
        let scope = scope();
        assert_eq!(lower(&mut arena, &scope, "1 + 2").unwrap().ty, TypeId::I32);
        assert_eq!(lower(&mut arena, &scope, "1 + 2.0").unwrap().ty, TypeId::UNKNOWN);
        assert_eq!(lower(&mut arena, &scope, "1u8 + 2i64").unwrap().ty, TypeId::UNKNOWN);
        assert_eq!(lower(&mut arena, &scope, "x > 0").unwrap().ty, TypeId::BOOL);
    }

    #[test]
    fn test_compound_assignment_desugars() {
        let mut arena = TypeArena::new();
        let expr = lower(&mut arena, &scope(), "x += 1").unwrap();
        assert_snapshot!(expr, @"x = x + 1");
        assert!(matches!(expr.kind, ExprKind::Assign { .. }));
    }

    #[test]
    fn test_postfix_disambiguation() {
        let mut arena = TypeArena::new();
        let scope = scope();
        let index = lower(&mut arena, &scope, "a[i]").unwrap();
        assert!(matches!(index.kind, ExprKind::ArrayAccess { .. }));
        let tuple = lower(&mut arena, &scope, "t.1").unwrap();
        assert!(matches!(tuple.kind, ExprKind::TupleAccess { index: 1, .. }));
        let attr = lower(&mut arena, &scope, "self.width").unwrap();
        assert!(matches!(attr.kind, ExprKind::AttributeAccess { ref field, .. } if field == "width"));

        let method = lower(&mut arena, &scope, "rect.scale(2, 3)").unwrap();
        let ExprKind::Call(call) = &method.kind else {
            panic!("expected call, got {:?}", method.kind);
        };
        assert_eq!(call.kind, CallKind::Method);
        assert_eq!(call.args.len(), 3);
        assert_eq!(call.policy, CallPolicy::default());

        let function = lower(&mut arena, &scope, "Rect::new(1, 2)").unwrap();
        let ExprKind::Call(call) = &function.kind else {
            panic!("expected call, got {:?}", function.kind);
        };
        assert_eq!(call.kind, CallKind::Function);
        assert_eq!(call.qualifier.as_deref(), Some("Rect"));
        assert_eq!(call.target, "new");
    }

    #[test]
    fn test_struct_literal_reorders_fields() {
        let mut arena = TypeArena::new();
        let scope = scope();
        let point = with_point(&mut arena, &scope);
        let expr = lower(&mut arena, &scope, "Point { y: 2, x: 1 }").unwrap();
        assert_eq!(expr.ty, point);
        assert_snapshot!(expr, @"Point{1, 2}");

        let missing = lower(&mut arena, &scope, "Point { x: 1 }").unwrap_err();
        assert!(matches!(missing, FrontendError::Unsupported { .. }));
        let update = lower(&mut arena, &scope, "Point { x: 1, ..p }").unwrap_err();
        assert!(matches!(update, FrontendError::Unsupported { .. }));
    }

    #[test]
    fn test_field_access_types() {
        let mut arena = TypeArena::new();
        let scope = scope();
        let point = with_point(&mut arena, &scope);
        let r = arena.reference(point, false);
        let mut cx = LoweringContext::new(&mut arena, &scope);
        cx.bind_local("p", r, false);
        let expr: SynExpr = syn::parse_str("p.y").unwrap();
        assert_eq!(cx.lower_expr(&expr).unwrap().ty, TypeId::I32);
    }

    #[test]
    fn test_enum_literals() {
        let mut arena = TypeArena::new();
        let scope = scope();
        let msg = arena.declare_enum("Message", scope.owner);
        arena
            .define_enum(
                msg,
                vec!["Quit".into(), "Write".into(), "Move".into()],
                vec![
                    VariantShape::Unit,
                    VariantShape::Tuple(vec![TypeId::UNKNOWN]),
                    VariantShape::Struct(vec![
                        Field {
                            name: "x".into(),
                            ty: TypeId::I32,
                        },
                        Field {
                            name: "y".into(),
                            ty: TypeId::I32,
                        },
                    ]),
                ],
            )
            .unwrap();

        let quit = lower(&mut arena, &scope, "Message::Quit").unwrap();
        assert_eq!(quit.ty, msg);
        assert_snapshot!(quit, @"Message::Quit");
        let write = lower(&mut arena, &scope, "Message::Write(s)").unwrap();
        assert_snapshot!(write, @"Message::Write(s)");
        let mv = lower(&mut arena, &scope, "Message::Move { y: 4, x: 3 }").unwrap();
        assert_snapshot!(mv, @"Message::Move{3, 4}");
        let other = lower(&mut arena, &scope, "Message::Nope").unwrap();
        assert!(matches!(other.kind, ExprKind::Path(_)));
    }

    #[test]
    fn test_aggregate_literals() {
        let mut arena = TypeArena::new();
        let scope = scope();
        let tuple = lower(&mut arena, &scope, "(1, true)").unwrap();
        assert_eq!(arena.display(tuple.ty).to_string(), "(i32, bool)");
        let array = lower(&mut arena, &scope, "[1, 2, 3]").unwrap();
        assert_eq!(arena.display(array.ty).to_string(), "[i32; 3]");
        let mixed = lower(&mut arena, &scope, "[1, 2u8]").unwrap();
        assert_eq!(arena.display(mixed.ty).to_string(), "[untyped; 2]");
        let repeat = lower(&mut arena, &scope, "[0u8; 16]").unwrap();
        assert_snapshot!(repeat, @"[0; 16]");
        assert!(lower(&mut arena, &scope, "[0; n]").is_err());
    }

    #[test]
    fn test_unary_borrow_cast_range() {
        let mut arena = TypeArena::new();
        let scope = scope();
        let borrow = lower(&mut arena, &scope, "&&mut x").unwrap();
        assert_snapshot!(borrow, @"&&mut x");
        let deref = lower(&mut arena, &scope, "*&1").unwrap();
        assert_eq!(deref.ty, TypeId::I32);
        let cast = lower(&mut arena, &scope, "x as u64").unwrap();
        assert_eq!(cast.ty, TypeId::U64);
        assert_snapshot!(cast, @"x as u64");
        let range = lower(&mut arena, &scope, "0..=n").unwrap();
        assert_snapshot!(range, @"0..=n");
        let from = lower(&mut arena, &scope, "3..").unwrap();
        assert_snapshot!(from, @"3..");
    }

    #[test]
    fn test_unsupported_forms() {
        let mut arena = TypeArena::new();
        let scope = scope();
        for src in ["|x| x + 1", "foo()?", "if c { 1 } else { 2 }", "async { 1 }"] {
            let err = lower(&mut arena, &scope, src).unwrap_err();
            assert!(matches!(err, FrontendError::Unsupported { .. }), "{}: {:?}", src, err);
        }
    }
}
