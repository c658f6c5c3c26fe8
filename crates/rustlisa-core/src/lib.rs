//! # RustLiSA Core
//!
//! Frontend that lowers Rust source files into typed control flow graphs
//! for abstract interpretation.
//!
//! ## Modules
//!
//! - **[`types`]** - Interned type arena, assignability lattice and type resolution
//! - **[`cfg`]** - Statement graphs, the CFG builder and return normalization
//! - **[`program`]** - Compilation units and the [`RustFrontend`] assembler
//! - **[`config`]** - Frontend configuration loaded from JSON
//!
//! ## Quick Start
//!
//! ```rust
//! use rustlisa_core::prelude::*;
//!
//! let source = r#"
//!     struct Point { x: i32, y: i32 }
//!
//!     fn origin() -> Point {
//!         Point { x: 0, y: 0 }
//!     }
//! "#;
//!
//! let program = RustFrontend::default().build_source(source, "point.rs").unwrap();
//! let cfg = program.cfg("point", "origin").unwrap();
//! assert_eq!(cfg.exitpoints().len(), 1);
//! assert!(program.diagnostics().is_empty());
//! ```

pub mod cfg;
pub mod config;
pub mod error;
pub mod location;
mod lower;
pub mod program;
pub mod types;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cfg::{Cfg, CfgDescriptor, EdgeKind, Expr, NodeId, Statement, StatementKind};
    pub use crate::config::FrontendConfig;
    pub use crate::error::{FrontendError, FrontendResult};
    pub use crate::location::CodeLocation;
    pub use crate::program::{CompilationUnit, Diagnostic, Program, RustFrontend, UnitId, UnitKind};
    pub use crate::types::{TypeArena, TypeId, TypeKind};
}

// Re-export main types at crate root for convenience
pub use cfg::{Cfg, CfgBuilder, CfgDescriptor, EdgeKind, NodeId, Parameter, Receiver, Statement, StatementKind};
pub use config::FrontendConfig;
pub use error::{FrontendError, FrontendResult};
pub use location::CodeLocation;
pub use program::{CompilationUnit, Diagnostic, Global, Program, RustFrontend, UnitId, UnitKind};
pub use types::{TypeArena, TypeId, TypeKind, TypeScope};
