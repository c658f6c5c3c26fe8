//! Compilation units: the module, its structs and its enums

use crate::cfg::Cfg;
use crate::location::CodeLocation;
use crate::types::TypeId;
use indexmap::IndexMap;
use std::fmt;

/// Handle of a compilation unit inside a [`Program`](super::Program)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u32);

impl UnitId {
    pub fn new(index: u32) -> Self {
        UnitId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Top-level unit of a source file, owning free functions and constants
    Module,
    Struct,
    Enum,
}

/// A typed global: a struct field or a module-level `const`/`static`
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: TypeId,
    pub location: CodeLocation,
}

/// A named container of globals and CFGs
#[derive(Debug)]
pub struct CompilationUnit {
    pub id: UnitId,
    pub name: String,
    pub kind: UnitKind,
    pub location: CodeLocation,
    /// Enclosing unit; `None` for modules
    pub owner: Option<UnitId>,
    /// Canonical type of a struct or enum unit
    pub ty: Option<TypeId>,
    globals: IndexMap<String, Global>,
    cfgs: Vec<Cfg>,
}

impl CompilationUnit {
    pub fn new(id: UnitId, name: impl Into<String>, kind: UnitKind, location: CodeLocation) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            location,
            owner: None,
            ty: None,
            globals: IndexMap::new(),
            cfgs: Vec::new(),
        }
    }

    pub fn add_global(&mut self, global: Global) {
        self.globals.insert(global.name.clone(), global);
    }

    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.get(name)
    }

    /// Globals in declaration order
    pub fn globals(&self) -> impl Iterator<Item = &Global> {
        self.globals.values()
    }

    pub fn add_cfg(&mut self, cfg: Cfg) {
        self.cfgs.push(cfg);
    }

    pub fn cfgs(&self) -> &[Cfg] {
        &self.cfgs
    }

    /// First CFG (function or method) with this name
    pub fn cfg(&self, name: &str) -> Option<&Cfg> {
        self.cfgs.iter().find(|cfg| cfg.descriptor().name == name)
    }
}
