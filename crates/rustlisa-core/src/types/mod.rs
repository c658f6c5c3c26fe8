//! Canonical Rust type model
//!
//! Every type lives in a [`TypeArena`] and is referred to through a [`TypeId`]
//! handle. Structurally identical types share one handle, so type equality is
//! handle equality. Structs and enums are keyed by name and owning unit: they
//! are declared before their fields are resolved, which makes recursive and
//! forward references safe.

mod lattice;
mod resolve;

pub use resolve::TypeScope;
pub(crate) use resolve::literal_length;

use crate::error::{FrontendError, FrontendResult};
use crate::program::UnitId;
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use tracing::debug;

/// An interned type reference.
///
/// A lightweight handle into a [`TypeArena`]. Primitive handles are fixed
/// across arenas and survive [`TypeArena::reset`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    /// The top element: nothing is known about the value
    pub const UNKNOWN: TypeId = TypeId(0);
    pub const UNIT: TypeId = TypeId(1);
    pub const BOOL: TypeId = TypeId(2);
    pub const CHAR: TypeId = TypeId(3);
    pub const STR: TypeId = TypeId(4);
    pub const I8: TypeId = TypeId(5);
    pub const I16: TypeId = TypeId(6);
    pub const I32: TypeId = TypeId(7);
    pub const I64: TypeId = TypeId(8);
    pub const I128: TypeId = TypeId(9);
    pub const ISIZE: TypeId = TypeId(10);
    pub const U8: TypeId = TypeId(11);
    pub const U16: TypeId = TypeId(12);
    pub const U32: TypeId = TypeId(13);
    pub const U64: TypeId = TypeId(14);
    pub const U128: TypeId = TypeId(15);
    pub const USIZE: TypeId = TypeId(16);
    pub const F32: TypeId = TypeId(17);
    pub const F64: TypeId = TypeId(18);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_primitive(self) -> bool {
        self.index() < PRIMITIVES.len() && self != TypeId::UNKNOWN
    }

    /// Look up a primitive by its source spelling
    pub fn primitive(name: &str) -> Option<TypeId> {
        let id = match name {
            "()" => TypeId::UNIT,
            "bool" => TypeId::BOOL,
            "char" => TypeId::CHAR,
            "str" => TypeId::STR,
            "i8" => TypeId::I8,
            "i16" => TypeId::I16,
            "i32" => TypeId::I32,
            "i64" => TypeId::I64,
            "i128" => TypeId::I128,
            "isize" => TypeId::ISIZE,
            "u8" => TypeId::U8,
            "u16" => TypeId::U16,
            "u32" => TypeId::U32,
            "u64" => TypeId::U64,
            "u128" => TypeId::U128,
            "usize" => TypeId::USIZE,
            "f32" => TypeId::F32,
            "f64" => TypeId::F64,
            _ => return None,
        };
        Some(id)
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntTy {
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UintTy {
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatTy {
    F32,
    F64,
}

/// Canonical type representation used as the interning key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Unknown,
    Unit,
    Bool,
    Char,
    Str,
    Int(IntTy),
    Uint(UintTy),
    Float(FloatTy),
    Pointer { inner: TypeId, mutable: bool },
    Reference { inner: TypeId, mutable: bool },
    Array { element: TypeId, length: u64 },
    Tuple(Vec<TypeId>),
    Struct { name: String, owner: UnitId },
    Enum { name: String, owner: UnitId },
}

/// Pre-interned types, in `TypeId` constant order
const PRIMITIVES: [TypeKind; 19] = [
    TypeKind::Unknown,
    TypeKind::Unit,
    TypeKind::Bool,
    TypeKind::Char,
    TypeKind::Str,
    TypeKind::Int(IntTy::I8),
    TypeKind::Int(IntTy::I16),
    TypeKind::Int(IntTy::I32),
    TypeKind::Int(IntTy::I64),
    TypeKind::Int(IntTy::I128),
    TypeKind::Int(IntTy::Isize),
    TypeKind::Uint(UintTy::U8),
    TypeKind::Uint(UintTy::U16),
    TypeKind::Uint(UintTy::U32),
    TypeKind::Uint(UintTy::U64),
    TypeKind::Uint(UintTy::U128),
    TypeKind::Uint(UintTy::Usize),
    TypeKind::Float(FloatTy::F32),
    TypeKind::Float(FloatTy::F64),
];

static UNKNOWN_KIND: TypeKind = TypeKind::Unknown;

/// A named, typed struct field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantShape {
    Unit,
    Tuple(Vec<TypeId>),
    Struct(Vec<Field>),
}

impl VariantShape {
    /// Payload types in declaration order
    pub fn types(&self) -> Vec<TypeId> {
        match self {
            VariantShape::Unit => Vec::new(),
            VariantShape::Tuple(types) => types.clone(),
            VariantShape::Struct(fields) => fields.iter().map(|f| f.ty).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub shape: VariantShape,
}

/// Field or variant layout of a declared struct or enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Struct(Vec<Field>),
    Enum(Vec<Variant>),
}

/// Owner of every type of a program.
///
/// Replaces process-wide type caches: one arena per program build, passed
/// to whoever needs to intern or inspect types.
#[derive(Debug)]
pub struct TypeArena {
    kinds: IndexSet<TypeKind>,
    layouts: IndexMap<TypeId, Layout>,
}

impl TypeArena {
    pub fn new() -> Self {
        let mut arena = Self {
            kinds: IndexSet::new(),
            layouts: IndexMap::new(),
        };
        arena.seed();
        arena
    }

    fn seed(&mut self) {
        for kind in PRIMITIVES {
            self.kinds.insert(kind);
        }
        debug_assert_eq!(self.kinds.len(), PRIMITIVES.len());
    }

    /// Drop every composite type and layout, keeping the primitives
    pub fn reset(&mut self) {
        debug!(types = self.kinds.len(), "resetting type arena");
        self.kinds.clear();
        self.layouts.clear();
        self.seed();
    }

    /// Intern a type, returning its canonical handle
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        let (index, _) = self.kinds.insert_full(kind);
        TypeId(index as u32)
    }

    /// Handle of an already interned type
    pub fn lookup(&self, kind: &TypeKind) -> Option<TypeId> {
        self.kinds.get_index_of(kind).map(|index| TypeId(index as u32))
    }

    /// Kind of an interned type, `Unknown` for stale handles
    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        self.kinds.get_index(ty.index()).unwrap_or(&UNKNOWN_KIND)
    }

    pub fn pointer(&mut self, inner: TypeId, mutable: bool) -> TypeId {
        self.intern(TypeKind::Pointer { inner, mutable })
    }

    pub fn reference(&mut self, inner: TypeId, mutable: bool) -> TypeId {
        self.intern(TypeKind::Reference { inner, mutable })
    }

    pub fn array(&mut self, element: TypeId, length: u64) -> TypeId {
        self.intern(TypeKind::Array { element, length })
    }

    /// Intern a tuple type. The empty tuple is unit.
    pub fn tuple(&mut self, elements: Vec<TypeId>) -> TypeId {
        if elements.is_empty() {
            return TypeId::UNIT;
        }
        self.intern(TypeKind::Tuple(elements))
    }

    /// Declare a struct; fields are attached later by [`define_struct`](Self::define_struct)
    pub fn declare_struct(&mut self, name: &str, owner: UnitId) -> TypeId {
        self.intern(TypeKind::Struct {
            name: name.to_string(),
            owner,
        })
    }

    /// Declare an enum; variants are attached later by [`define_enum`](Self::define_enum)
    pub fn declare_enum(&mut self, name: &str, owner: UnitId) -> TypeId {
        self.intern(TypeKind::Enum {
            name: name.to_string(),
            owner,
        })
    }

    pub fn define_struct(&mut self, ty: TypeId, fields: Vec<Field>) {
        self.layouts.insert(ty, Layout::Struct(fields));
    }

    /// Attach variants to a declared enum, pairing names with shapes
    pub fn define_enum(&mut self, ty: TypeId, names: Vec<String>, shapes: Vec<VariantShape>) -> FrontendResult<()> {
        if names.len() != shapes.len() {
            return Err(FrontendError::ArityMismatch {
                name: self.display(ty).to_string(),
                variants: names.len(),
                shapes: shapes.len(),
            });
        }
        let variants = names
            .into_iter()
            .zip(shapes)
            .map(|(name, shape)| Variant { name, shape })
            .collect();
        self.layouts.insert(ty, Layout::Enum(variants));
        Ok(())
    }

    pub fn layout(&self, ty: TypeId) -> Option<&Layout> {
        self.layouts.get(&ty)
    }

    /// Fields of a struct, empty for anything else
    pub fn fields(&self, ty: TypeId) -> &[Field] {
        match self.layouts.get(&ty) {
            Some(Layout::Struct(fields)) => fields,
            _ => &[],
        }
    }

    /// Variants of an enum, empty for anything else
    pub fn variants(&self, ty: TypeId) -> &[Variant] {
        match self.layouts.get(&ty) {
            Some(Layout::Enum(variants)) => variants,
            _ => &[],
        }
    }

    pub fn variant(&self, ty: TypeId, name: &str) -> Option<&Variant> {
        self.variants(ty).iter().find(|v| v.name == name)
    }

    /// Struct declared in `owner` under `name`
    pub fn find_struct(&self, name: &str, owner: UnitId) -> Option<TypeId> {
        self.lookup(&TypeKind::Struct {
            name: name.to_string(),
            owner,
        })
    }

    /// Enum declared in `owner` under `name`
    pub fn find_enum(&self, name: &str, owner: UnitId) -> Option<TypeId> {
        self.lookup(&TypeKind::Enum {
            name: name.to_string(),
            owner,
        })
    }

    /// Struct or enum declared in `owner` under `name`
    pub fn find_named(&self, name: &str, owner: UnitId) -> Option<TypeId> {
        self.find_struct(name, owner).or_else(|| self.find_enum(name, owner))
    }

    pub fn is_struct(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Struct { .. })
    }

    pub fn is_enum(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Enum { .. })
    }

    /// Every interned type, in interning order
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeKind)> {
        self.kinds.iter().enumerate().map(|(i, kind)| (TypeId(i as u32), kind))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether the arena holds only the primitives
    pub fn is_empty(&self) -> bool {
        self.kinds.len() == PRIMITIVES.len()
    }

    /// Source-like rendering of a type
    pub fn display(&self, ty: TypeId) -> TypeDisplay<'_> {
        TypeDisplay { arena: self, ty }
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TypeDisplay<'a> {
    arena: &'a TypeArena,
    ty: TypeId,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena;
        match arena.kind(self.ty) {
            TypeKind::Unknown => write!(f, "untyped"),
            TypeKind::Unit => write!(f, "()"),
            TypeKind::Bool => write!(f, "bool"),
            TypeKind::Char => write!(f, "char"),
            TypeKind::Str => write!(f, "str"),
            TypeKind::Int(int) => write!(f, "{}", int.name()),
            TypeKind::Uint(uint) => write!(f, "{}", uint.name()),
            TypeKind::Float(FloatTy::F32) => write!(f, "f32"),
            TypeKind::Float(FloatTy::F64) => write!(f, "f64"),
            TypeKind::Pointer { inner, mutable } => {
                let qualifier = if *mutable { "mut " } else { "" };
                write!(f, "*{}{}", qualifier, arena.display(*inner))
            }
            TypeKind::Reference { inner, mutable } => {
                let qualifier = if *mutable { "mut " } else { "" };
                write!(f, "&{}{}", qualifier, arena.display(*inner))
            }
            TypeKind::Array { element, length } => write!(f, "[{}; {}]", arena.display(*element), length),
            TypeKind::Tuple(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arena.display(*elem))?;
                }
                write!(f, ")")
            }
            TypeKind::Struct { name, .. } | TypeKind::Enum { name, .. } => write!(f, "{}", name),
        }
    }
}

impl IntTy {
    pub fn name(self) -> &'static str {
        match self {
            IntTy::I8 => "i8",
            IntTy::I16 => "i16",
            IntTy::I32 => "i32",
            IntTy::I64 => "i64",
            IntTy::I128 => "i128",
            IntTy::Isize => "isize",
        }
    }
}

impl UintTy {
    pub fn name(self) -> &'static str {
        match self {
            UintTy::U8 => "u8",
            UintTy::U16 => "u16",
            UintTy::U32 => "u32",
            UintTy::U64 => "u64",
            UintTy::U128 => "u128",
            UintTy::Usize => "usize",
        }
    }
}
