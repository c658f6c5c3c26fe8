//! Assembly of a parsed source file into compilation units
//!
//! Three passes over the items of a file:
//!
//! 1. every `struct` and `enum` gets a unit and a declared type;
//! 2. fields, variants and module constants are resolved;
//! 3. free functions and `impl` methods are lowered to CFGs.
//!
//! Declaring every type before resolving any field makes forward and
//! recursive references work. A failing item is recorded as a
//! [`Diagnostic`] and assembly carries on with its siblings, unless
//! [`FrontendConfig::fail_fast`] is set.

use super::{CompilationUnit, Diagnostic, Global, Program, UnitId, UnitKind};
use crate::cfg::{Cfg, CfgBuilder, CfgDescriptor, Parameter, Pattern, Receiver, VariableRef};
use crate::config::FrontendConfig;
use crate::error::{FrontendError, FrontendResult};
use crate::location::CodeLocation;
use crate::lower::LoweringContext;
use crate::types::{Field, TypeId, TypeScope, VariantShape};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use syn::spanned::Spanned;
use syn::{FnArg, ImplItem, Item};
use tracing::{debug, info, warn};

/// Builds [`Program`]s from Rust source
#[derive(Debug, Clone, Default)]
pub struct RustFrontend {
    config: FrontendConfig,
}

impl RustFrontend {
    pub fn new(config: FrontendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    /// Assemble one parsed file into a fresh program
    pub fn build(&self, file: &syn::File, file_name: &str) -> FrontendResult<Program> {
        let mut program = Program::new();
        self.assemble(&mut program, file, file_name)?;
        Ok(program)
    }

    /// Parse and assemble source text
    pub fn build_source(&self, source: &str, file_name: &str) -> FrontendResult<Program> {
        let file = syn::parse_file(source)?;
        self.build(&file, file_name)
    }

    pub fn build_file(&self, path: &Path) -> Result<Program> {
        self.build_files(&[path])
    }

    /// Assemble several files into one program; each file is its own module
    pub fn build_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Program> {
        let mut program = Program::new();
        for path in paths {
            let path = path.as_ref();
            let source =
                std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let file = syn::parse_file(&source)
                .map_err(FrontendError::from)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            self.assemble(&mut program, &file, &path.display().to_string())
                .with_context(|| format!("Failed to lower {}", path.display()))?;
        }
        Ok(program)
    }

    /// Add the units of `file` to `program`
    pub fn assemble(&self, program: &mut Program, file: &syn::File, file_name: &str) -> FrontendResult<()> {
        let file_name: Arc<str> = Arc::from(file_name);
        info!(file = %file_name, items = file.items.len(), "assembling module");

        let module = program.next_unit_id();
        program.add_unit(CompilationUnit::new(
            module,
            module_name(&file_name),
            UnitKind::Module,
            CodeLocation::new(Arc::clone(&file_name), 1, 1),
        ));

        let mut assembler = Assembler {
            config: &self.config,
            program,
            file: file_name,
            module,
            type_units: HashMap::new(),
        };
        assembler.register_types(&file.items)?;
        assembler.resolve_layouts(&file.items)?;
        assembler.lower_bodies(&file.items)?;
        Ok(())
    }
}

/// `src/shapes.rs` names the module `shapes`
fn module_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

struct Assembler<'a> {
    config: &'a FrontendConfig,
    program: &'a mut Program,
    file: Arc<str>,
    module: UnitId,
    /// Unit of each struct and enum type declared in this module
    type_units: HashMap<TypeId, UnitId>,
}

impl Assembler<'_> {
    fn location<T: Spanned + ?Sized>(&self, node: &T) -> CodeLocation {
        CodeLocation::of(&self.file, node)
    }

    fn scope(&self) -> TypeScope {
        TypeScope::new(self.module, Arc::clone(&self.file), self.config.strict_types)
    }

    fn unit_name(&self, unit: UnitId) -> String {
        self.program
            .unit(unit)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| unit.to_string())
    }

    /// Record a failed item, or hand the error back under `fail_fast`
    fn isolate(&mut self, unit: UnitId, item: &str, result: FrontendResult<()>) -> FrontendResult<()> {
        let Err(error) = result else {
            return Ok(());
        };
        if self.config.fail_fast {
            return Err(error);
        }
        let unit = self.unit_name(unit);
        warn!(unit = %unit, item, %error, "item skipped");
        self.program.push_diagnostic(Diagnostic {
            unit,
            item: item.to_string(),
            error,
        });
        Ok(())
    }

    fn register_types(&mut self, items: &[Item]) -> FrontendResult<()> {
        for item in items {
            let (name, kind, location) = match item {
                Item::Struct(s) => (s.ident.to_string(), UnitKind::Struct, self.location(&s.ident)),
                Item::Enum(e) => (e.ident.to_string(), UnitKind::Enum, self.location(&e.ident)),
                Item::Fn(_) | Item::Impl(_) | Item::Const(_) | Item::Static(_) | Item::Use(_) | Item::ExternCrate(_) => {
                    continue
                }
                other => {
                    let (construct, name) = item_kind(other);
                    let result = Err(FrontendError::unsupported(construct, self.location(other)));
                    self.isolate(self.module, &name, result)?;
                    continue;
                }
            };

            if self.program.types().find_named(&name, self.module).is_some() {
                let result = Err(FrontendError::unsupported(
                    format!("second definition of `{}`", name),
                    location,
                ));
                self.isolate(self.module, &name, result)?;
                continue;
            }

            let ty = match kind {
                UnitKind::Struct => self.program.types_mut().declare_struct(&name, self.module),
                _ => self.program.types_mut().declare_enum(&name, self.module),
            };
            let id = self.program.next_unit_id();
            let mut unit = CompilationUnit::new(id, name, kind, location);
            unit.owner = Some(self.module);
            unit.ty = Some(ty);
            debug!(unit = %unit.name, id = %id, kind = ?kind, "registered unit");
            self.program.add_unit(unit);
            self.type_units.insert(ty, id);
        }
        Ok(())
    }

    fn resolve_layouts(&mut self, items: &[Item]) -> FrontendResult<()> {
        for item in items {
            match item {
                Item::Struct(s) => {
                    let Some((ty, unit)) = self.registered(&s.ident) else {
                        continue;
                    };
                    let result = self.resolve_struct(s, ty, unit);
                    self.isolate(unit, &s.ident.to_string(), result)?;
                }
                Item::Enum(e) => {
                    let Some((ty, unit)) = self.registered(&e.ident) else {
                        continue;
                    };
                    let result = self.resolve_enum(e, ty);
                    self.isolate(unit, &e.ident.to_string(), result)?;
                }
                Item::Const(c) => {
                    let result = self.module_global(&c.ident, &c.ty);
                    self.isolate(self.module, &c.ident.to_string(), result)?;
                }
                Item::Static(s) => {
                    let result = self.module_global(&s.ident, &s.ty);
                    self.isolate(self.module, &s.ident.to_string(), result)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Type and unit registered for `name` in pass 1
    fn declared(&self, name: &str) -> Option<(TypeId, UnitId)> {
        let ty = self.program.types().find_named(name, self.module)?;
        let unit = self.type_units.get(&ty).copied()?;
        Some((ty, unit))
    }

    /// Like [`Self::declared`], but only for the item pass 1 actually
    /// registered; a rejected second definition yields `None`
    fn registered(&self, ident: &syn::Ident) -> Option<(TypeId, UnitId)> {
        let (ty, unit) = self.declared(&ident.to_string())?;
        let location = self.location(ident);
        let same = self.program.unit(unit).is_some_and(|u| u.location == location);
        same.then_some((ty, unit))
    }

    fn resolve_struct(&mut self, item: &syn::ItemStruct, ty: TypeId, unit: UnitId) -> FrontendResult<()> {
        let scope = self.scope().with_self(ty).with_generics(&item.generics);
        let fields = self.resolve_fields(&scope, &item.fields)?;

        let globals: Vec<Global> = item
            .fields
            .iter()
            .zip(&fields)
            .map(|(syntax, field)| Global {
                name: field.name.clone(),
                ty: field.ty,
                location: self.location(syntax),
            })
            .collect();
        if let Some(unit) = self.program.unit_mut(unit) {
            for global in globals {
                unit.add_global(global);
            }
        }
        self.program.types_mut().define_struct(ty, fields);
        Ok(())
    }

    fn resolve_enum(&mut self, item: &syn::ItemEnum, ty: TypeId) -> FrontendResult<()> {
        let scope = self.scope().with_self(ty).with_generics(&item.generics);
        let mut names = Vec::with_capacity(item.variants.len());
        let mut shapes = Vec::with_capacity(item.variants.len());
        for variant in &item.variants {
            names.push(variant.ident.to_string());
            let shape = match &variant.fields {
                syn::Fields::Unit => VariantShape::Unit,
                syn::Fields::Unnamed(_) => {
                    let fields = self.resolve_fields(&scope, &variant.fields)?;
                    VariantShape::Tuple(fields.into_iter().map(|f| f.ty).collect())
                }
                syn::Fields::Named(_) => VariantShape::Struct(self.resolve_fields(&scope, &variant.fields)?),
            };
            shapes.push(shape);
        }
        self.program.types_mut().define_enum(ty, names, shapes)
    }

    /// Named fields keep their names; positional fields are named `0`, `1`, ...
    fn resolve_fields(&mut self, scope: &TypeScope, fields: &syn::Fields) -> FrontendResult<Vec<Field>> {
        fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let name = match &field.ident {
                    Some(ident) => ident.to_string(),
                    None => index.to_string(),
                };
                let ty = self.program.types_mut().resolve(scope, &field.ty)?;
                Ok(Field { name, ty })
            })
            .collect()
    }

    fn module_global(&mut self, ident: &syn::Ident, ty: &syn::Type) -> FrontendResult<()> {
        let scope = self.scope();
        let ty = self.program.types_mut().resolve(&scope, ty)?;
        let global = Global {
            name: ident.to_string(),
            ty,
            location: self.location(ident),
        };
        if let Some(module) = self.program.unit_mut(self.module) {
            module.add_global(global);
        }
        Ok(())
    }

    fn lower_bodies(&mut self, items: &[Item]) -> FrontendResult<()> {
        for item in items {
            match item {
                Item::Fn(func) => {
                    let scope = self.scope().with_generics(&func.sig.generics);
                    let result = self.lower_function(self.module, &scope, &func.sig, &func.block);
                    self.isolate(self.module, &func.sig.ident.to_string(), result)?;
                }
                Item::Impl(imp) => self.lower_impl(imp)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn lower_impl(&mut self, imp: &syn::ItemImpl) -> FrontendResult<()> {
        let target = match imp.self_ty.as_ref() {
            syn::Type::Path(path) if path.qself.is_none() => path
                .path
                .segments
                .last()
                .and_then(|segment| self.declared(&segment.ident.to_string())),
            _ => None,
        };
        let Some((self_ty, unit)) = target else {
            let rendered = quote::ToTokens::to_token_stream(&imp.self_ty).to_string();
            let result = Err(FrontendError::unsupported(
                format!("impl block for `{}`", rendered),
                self.location(&imp.self_ty),
            ));
            return self.isolate(self.module, &rendered, result);
        };

        let impl_scope = self.scope().with_self(self_ty).with_generics(&imp.generics);
        for member in &imp.items {
            match member {
                ImplItem::Fn(method) => {
                    let scope = impl_scope.clone().with_generics(&method.sig.generics);
                    let result = self.lower_function(unit, &scope, &method.sig, &method.block);
                    self.isolate(unit, &method.sig.ident.to_string(), result)?;
                }
                ImplItem::Const(constant) => {
                    let result = self.associated_const(unit, &impl_scope, constant);
                    self.isolate(unit, &constant.ident.to_string(), result)?;
                }
                other => {
                    let result = Err(FrontendError::unsupported("associated item", self.location(other)));
                    self.isolate(unit, "impl", result)?;
                }
            }
        }
        Ok(())
    }

    fn associated_const(&mut self, unit: UnitId, scope: &TypeScope, item: &syn::ImplItemConst) -> FrontendResult<()> {
        let ty = self.program.types_mut().resolve(scope, &item.ty)?;
        let global = Global {
            name: item.ident.to_string(),
            ty,
            location: self.location(&item.ident),
        };
        if let Some(unit) = self.program.unit_mut(unit) {
            unit.add_global(global);
        }
        Ok(())
    }

    fn lower_function(
        &mut self,
        unit: UnitId,
        scope: &TypeScope,
        sig: &syn::Signature,
        body: &syn::Block,
    ) -> FrontendResult<()> {
        let location = self.location(&sig.ident);
        if sig.asyncness.is_some() {
            return Err(FrontendError::unsupported("async fn", location));
        }
        if sig.variadic.is_some() {
            return Err(FrontendError::unsupported("variadic fn", location));
        }

        let mut params = Vec::with_capacity(sig.inputs.len());
        let mut receiver = None;
        for input in &sig.inputs {
            match input {
                FnArg::Receiver(recv) => {
                    receiver = Some(match (recv.reference.is_some(), recv.mutability.is_some()) {
                        (true, true) => Receiver::RefMut,
                        (true, false) => Receiver::Ref,
                        (false, _) => Receiver::Value,
                    });
                    let mutable = recv.reference.is_none() && recv.mutability.is_some();
                    params.push(Parameter {
                        name: "self".to_string(),
                        ty: scope.self_ty.unwrap_or(TypeId::UNKNOWN),
                        mutable,
                        pattern: Pattern::Binding(VariableRef::new("self", mutable)),
                        location: self.location(recv),
                    });
                }
                FnArg::Typed(typed) => {
                    let ty = self.program.types_mut().resolve(scope, &typed.ty)?;
                    let pattern = LoweringContext::new(self.program.types_mut(), scope).lower_pattern(&typed.pat)?;
                    // Destructuring parameters are named after their pattern
                    let (name, mutable) = match &pattern {
                        Pattern::Binding(var) => (var.name.clone(), var.mutable),
                        other => (other.to_string(), false),
                    };
                    params.push(Parameter {
                        name,
                        ty,
                        mutable,
                        pattern,
                        location: self.location(typed),
                    });
                }
            }
        }

        let return_type = self.program.types_mut().resolve_return(scope, &sig.output)?;
        let descriptor = CfgDescriptor {
            name: sig.ident.to_string(),
            unit,
            location,
            params,
            return_type,
            receiver,
        };
        let cfg: Cfg = CfgBuilder::new(descriptor, self.program.types_mut(), scope, self.config).build_function(body)?;
        debug!(unit = %unit, cfg = %cfg.name(), nodes = cfg.node_count(), "lowered function");
        if let Some(unit) = self.program.unit_mut(unit) {
            unit.add_cfg(cfg);
        }
        Ok(())
    }
}

/// Diagnostic label and name of an item the frontend does not model
fn item_kind(item: &Item) -> (&'static str, String) {
    match item {
        Item::Trait(t) => ("trait", t.ident.to_string()),
        Item::TraitAlias(t) => ("trait alias", t.ident.to_string()),
        Item::Mod(m) => ("nested module", m.ident.to_string()),
        Item::Macro(m) => (
            "macro item",
            m.ident
                .as_ref()
                .map(|i| i.to_string())
                .unwrap_or_else(|| crate::lower::path_to_string(&m.mac.path)),
        ),
        Item::Union(u) => ("union", u.ident.to_string()),
        Item::Type(t) => ("type alias", t.ident.to_string()),
        Item::ForeignMod(_) => ("extern block", "extern".to_string()),
        _ => ("item", "item".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKind;

    fn build(source: &str) -> Program {
        RustFrontend::default().build_source(source, "sample.rs").unwrap()
    }

    #[test]
    fn test_module_unit_named_after_file() {
        let program = build("fn main() {}");
        assert_eq!(program.units().len(), 1);
        let module = &program.units()[0];
        assert_eq!(module.name, "sample");
        assert_eq!(module.kind, UnitKind::Module);
        assert!(module.cfg("main").is_some());
    }

    #[test]
    fn test_struct_and_enum_units() {
        let program = build(
            r#"
            struct Pair(i32, bool);
            enum Shape { Dot, Circle(f64), Rect { w: f64, h: f64 } }
            "#,
        );
        let pair = program.unit_by_name("Pair").unwrap();
        assert_eq!(pair.kind, UnitKind::Struct);
        assert_eq!(pair.owner, Some(program.units()[0].id));
        let names: Vec<_> = pair.globals().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["0", "1"]);
        assert_eq!(pair.global("1").unwrap().ty, TypeId::BOOL);

        let shape = program.unit_by_name("Shape").unwrap();
        let ty = shape.ty.unwrap();
        assert!(matches!(program.types().kind(ty), TypeKind::Enum { name, .. } if name == "Shape"));
        assert_eq!(program.types().variants(ty).len(), 3);
        assert_eq!(
            program.types().variant(ty, "Rect").unwrap().shape.types(),
            vec![TypeId::F64, TypeId::F64]
        );
    }

    #[test]
    fn test_recursive_and_forward_references() {
        let program = build(
            r#"
            struct Node { value: i32, next: *const Node, owner: *mut Tree }
            struct Tree { root: *const Node }
            "#,
        );
        assert!(program.diagnostics().is_empty());
        let node = program.unit_by_name("Node").unwrap();
        let next = node.global("next").unwrap().ty;
        assert!(matches!(program.types().kind(next), TypeKind::Pointer { inner, .. } if Some(*inner) == node.ty));
    }

    #[test]
    fn test_constants_become_module_globals() {
        let program = build("const LIMIT: usize = 8; static NAME: &str = \"n\";");
        let module = &program.units()[0];
        assert_eq!(module.global("LIMIT").unwrap().ty, TypeId::USIZE);
        assert_eq!(program.types().display(module.global("NAME").unwrap().ty).to_string(), "&str");
    }

    #[test]
    fn test_method_receivers() {
        let program = build(
            r#"
            struct Counter { n: u32 }
            impl Counter {
                fn get(&self) -> u32 { self.n }
                fn bump(&mut self) { self.n += 1; }
                fn into_inner(self) -> u32 { self.n }
                fn zero() -> Self { Counter { n: 0 } }
            }
            "#,
        );
        assert!(program.diagnostics().is_empty(), "{:?}", program.diagnostics());
        let counter = program.unit_by_name("Counter").unwrap();
        let receiver = |name: &str| counter.cfg(name).unwrap().descriptor().receiver;
        assert_eq!(receiver("get"), Some(Receiver::Ref));
        assert_eq!(receiver("bump"), Some(Receiver::RefMut));
        assert_eq!(receiver("into_inner"), Some(Receiver::Value));
        assert_eq!(receiver("zero"), None);

        let get = counter.cfg("get").unwrap().descriptor();
        assert_eq!(get.params[0].name, "self");
        assert_eq!(Some(get.params[0].ty), counter.ty);
        assert_eq!(counter.cfg("zero").unwrap().descriptor().return_type, counter.ty.unwrap());
    }

    #[test]
    fn test_destructuring_parameters() {
        let program = build(
            r#"
            struct Point { x: i32, y: i32 }
            fn by_ref(&x: &i32) -> i32 { x }
            fn fields(Point { x, y }: Point) -> i32 { let s = x + y; s }
            fn pair((a, mut b): (i32, i32)) { b = a; }
            "#,
        );
        assert!(program.diagnostics().is_empty(), "{:?}", program.diagnostics());
        let unit = program.unit_by_name("sample").unwrap();
        let param = |cfg: &str| unit.cfg(cfg).unwrap().descriptor().params[0].clone();

        assert!(matches!(param("by_ref").pattern, Pattern::Ref { mutable: false, .. }));
        assert_eq!(param("by_ref").name, "&x");
        let ret = unit.cfg("by_ref").unwrap().find_by_text("return x").unwrap();
        assert_eq!(unit.cfg("by_ref").unwrap().node(ret).unwrap().static_type(), TypeId::I32);

        let fields = unit.cfg("fields").unwrap();
        assert!(matches!(param("fields").pattern, Pattern::Struct { .. }));
        let sum = fields.find_by_text("let s = x + y").unwrap();
        assert_eq!(fields.node(sum).unwrap().static_type(), TypeId::I32);

        let pair = param("pair");
        assert_eq!(pair.name, "(a, mut b)");
        assert!(!pair.mutable);
        assert!(unit.cfg("pair").unwrap().find_by_text("mut b = a").is_some());
    }

    #[test]
    fn test_unsupported_items_are_isolated() {
        let program = build(
            r#"
            use std::fmt;
            trait Area { fn area(&self) -> f64; }
            mod inner {}
            fn broken() { let f = |x: i32| x; }
            fn fine() -> i32 { 1 }
            "#,
        );
        let items: Vec<_> = program.diagnostics().iter().map(|d| d.item.as_str()).collect();
        assert_eq!(items, vec!["Area", "inner", "broken"]);
        assert!(program.cfg("sample", "fine").is_some());
        assert!(program.cfg("sample", "broken").is_none());
    }

    #[test]
    fn test_fail_fast_returns_first_error() {
        let config = FrontendConfig {
            fail_fast: true,
            ..FrontendConfig::default()
        };
        let err = RustFrontend::new(config)
            .build_source("fn a() { let f = || 1; } fn b() -> i32 { return; }", "sample.rs")
            .unwrap_err();
        assert!(matches!(err, FrontendError::Unsupported { .. }));
    }

    #[test]
    fn test_strict_types() {
        let source = "struct Holder { items: Vec<i32> }";
        let strict = build(source);
        assert!(matches!(
            strict.diagnostics()[0].error,
            FrontendError::UnresolvedType { ref name, .. } if name.starts_with("Vec")
        ));

        let lenient = RustFrontend::new(FrontendConfig {
            strict_types: false,
            ..FrontendConfig::default()
        })
        .build_source(source, "sample.rs")
        .unwrap();
        assert!(lenient.diagnostics().is_empty());
        let holder = lenient.unit_by_name("Holder").unwrap();
        assert_eq!(holder.global("items").unwrap().ty, TypeId::UNKNOWN);
    }

    #[test]
    fn test_second_definition_is_rejected() {
        let program = build("struct A { x: i32 } struct A { y: bool }");
        assert_eq!(program.diagnostics().len(), 1);
        let a = program.unit_by_name("A").unwrap();
        let names: Vec<_> = a.globals().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["x"]);
    }

    #[test]
    fn test_impl_for_foreign_type() {
        let program = build("impl Clone for u8 {}");
        assert_eq!(program.diagnostics().len(), 1);
        assert!(matches!(program.diagnostics()[0].error, FrontendError::Unsupported { .. }));
    }
}
