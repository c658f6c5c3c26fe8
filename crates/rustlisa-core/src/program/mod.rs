//! Programs assembled from parsed source files
//!
//! A [`Program`] owns the compilation units, the type arena they share and
//! the diagnostics recorded for items that could not be lowered.

mod assemble;
mod unit;

pub use assemble::RustFrontend;
pub use unit::{CompilationUnit, Global, UnitId, UnitKind};

use crate::cfg::Cfg;
use crate::error::FrontendError;
use crate::types::TypeArena;
use std::fmt;

/// A lowering failure confined to one item
#[derive(Debug)]
pub struct Diagnostic {
    /// Unit the failed item belongs to
    pub unit: String,
    /// Function, method or type that failed
    pub item: String,
    pub error: FrontendError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}: {}", self.unit, self.item, self.error)
    }
}

#[derive(Debug, Default)]
pub struct Program {
    units: Vec<CompilationUnit>,
    types: TypeArena,
    diagnostics: Vec<Diagnostic>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Units in registration order
    pub fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&CompilationUnit> {
        self.units.get(id.index())
    }

    /// First unit registered under `name`
    pub fn unit_by_name(&self, name: &str) -> Option<&CompilationUnit> {
        self.units.iter().find(|unit| unit.name == name)
    }

    /// Every CFG of every unit
    pub fn cfgs(&self) -> impl Iterator<Item = &Cfg> {
        self.units.iter().flat_map(|unit| unit.cfgs().iter())
    }

    /// CFG `name` of the unit called `unit`
    pub fn cfg(&self, unit: &str, name: &str) -> Option<&Cfg> {
        self.unit_by_name(unit)?.cfg(name)
    }

    pub fn types(&self) -> &TypeArena {
        &self.types
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn types_mut(&mut self) -> &mut TypeArena {
        &mut self.types
    }

    pub(crate) fn next_unit_id(&self) -> UnitId {
        UnitId::new(self.units.len() as u32)
    }

    pub(crate) fn add_unit(&mut self, unit: CompilationUnit) -> UnitId {
        let id = unit.id;
        self.units.push(unit);
        id
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut CompilationUnit> {
        self.units.get_mut(id.index())
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
