//! Post-lowering normalization of function CFGs
//!
//! Unit functions end in one canonical `ret` node. Value functions end in
//! `return e` nodes only. No written `return` survives either way.

use super::{Cfg, EdgeKind, Expr, NodeId, Statement, StatementKind};
use crate::config::FrontendConfig;
use crate::error::{FrontendError, FrontendResult};
use tracing::trace;

pub(crate) fn normalize(cfg: &mut Cfg, config: &FrontendConfig) -> FrontendResult<()> {
    let returns_unit = cfg.descriptor().returns_unit();
    if returns_unit {
        close_unit(cfg);
    } else {
        close_value(cfg)?;
    }

    if config.simplify {
        simplify(cfg);
    }

    if !returns_unit && cfg.node_count() == 1 {
        guard_single_node(cfg);
    }
    Ok(())
}

/// Take the value of a written `return`, leaving `NoOp` in its place
fn take_return(cfg: &mut Cfg, node: NodeId) -> Option<Option<Expr>> {
    let stmt = cfg.node_mut(node)?;
    match std::mem::replace(&mut stmt.kind, StatementKind::NoOp) {
        StatementKind::ReturnStmt(value) => Some(value),
        other => {
            stmt.kind = other;
            None
        }
    }
}

fn written_returns(cfg: &Cfg) -> Vec<NodeId> {
    cfg.find_nodes(|stmt| matches!(stmt.kind, StatementKind::ReturnStmt(_)))
}

fn close_unit(cfg: &mut Cfg) {
    let location = cfg.descriptor().location.clone();
    let ret = cfg.add_node(Statement::new(StatementKind::Ret, location));

    for node in written_returns(cfg) {
        match take_return(cfg, node) {
            Some(Some(value)) => {
                // The value is still evaluated for its effects
                if let Some(stmt) = cfg.node_mut(node) {
                    stmt.kind = StatementKind::Expression(value);
                }
                cfg.clear_successors(node);
                cfg.add_edge(node, ret, EdgeKind::Sequential);
            }
            Some(None) => cfg.redirect_and_remove(node, ret),
            None => {}
        }
    }

    let removed = cfg.remove_unreachable(Some(ret));
    trace!(cfg = %cfg.name(), removed, "pruned unreachable nodes");

    for exit in cfg.exitpoints() {
        if exit != ret {
            cfg.add_edge(exit, ret, EdgeKind::Sequential);
        }
    }
}

fn close_value(cfg: &mut Cfg) -> FrontendResult<()> {
    for node in written_returns(cfg) {
        match take_return(cfg, node) {
            Some(Some(value)) => {
                if let Some(stmt) = cfg.node_mut(node) {
                    stmt.kind = StatementKind::Return(value);
                }
                cfg.clear_successors(node);
            }
            Some(None) => return Err(missing_value(cfg, node)),
            None => {}
        }
    }

    let removed = cfg.remove_unreachable(None);
    trace!(cfg = %cfg.name(), removed, "pruned unreachable nodes");

    for exit in cfg.exitpoints() {
        let Some(stmt) = cfg.node_mut(exit) else {
            continue;
        };
        match std::mem::replace(&mut stmt.kind, StatementKind::NoOp) {
            // A diverging call such as `panic!()`
            StatementKind::Expression(expr) => stmt.kind = StatementKind::Return(expr),
            StatementKind::NoOp => return Err(missing_value(cfg, exit)),
            other => stmt.kind = other,
        }
    }
    Ok(())
}

fn missing_value(cfg: &Cfg, node: NodeId) -> FrontendError {
    let location = cfg
        .node(node)
        .map(|stmt| stmt.location.clone())
        .unwrap_or_else(|| cfg.descriptor().location.clone());
    FrontendError::MissingReturnValue {
        function: cfg.name().to_string(),
        location,
    }
}

/// Splice out pass-through no-ops until none is left
fn simplify(cfg: &mut Cfg) {
    loop {
        let mut changed = false;
        for node in cfg.find_nodes(Statement::is_noop) {
            if cfg.is_entrypoint(node) {
                continue;
            }
            if cfg.splice(node) {
                trace!(cfg = %cfg.name(), node = node.index(), "spliced no-op");
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn guard_single_node(cfg: &mut Cfg) {
    let Some(&only) = cfg.entrypoints().first() else {
        return;
    };
    let location = cfg
        .node(only)
        .map(|stmt| stmt.location.clone())
        .unwrap_or_else(|| cfg.descriptor().location.clone());
    let entry = cfg.add_node(Statement::noop(location));
    cfg.add_edge(entry, only, EdgeKind::Sequential);
    cfg.set_entrypoints([entry]);
}
