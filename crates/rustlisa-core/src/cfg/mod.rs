//! Control flow graphs of function and method bodies
//!
//! A [`Cfg`] is a stable directed graph of [`Statement`] nodes joined by
//! [`EdgeKind`] edges. Node ids survive removals, so lowering passes can
//! splice nodes out and retarget edges without invalidating handles.

mod builder;
mod node;
mod normalize;

pub use builder::{CfgBuilder, Fragment};
pub use node::{
    AbstractState, BinaryOp, CallKind, CallPolicy, EnumPayload, EvaluationOrder, Expr, ExprKind, Literal,
    MethodMatching, ParameterAssignment, Pattern, Statement, StatementKind, UnaryOp, UnresolvedCall, VariableRef,
};

use crate::location::CodeLocation;
use crate::program::UnitId;
use crate::types::TypeId;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{DfsPostOrder, EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;

/// Unique identifier of a node within one CFG
pub type NodeId = NodeIndex;

/// Condition under which an edge is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Sequential,
    True,
    False,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EdgeKind::Sequential => "seq",
            EdgeKind::True => "true",
            EdgeKind::False => "false",
        })
    }
}

/// A formal parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Bound name, or the rendered pattern of a destructuring parameter
    pub name: String,
    pub ty: TypeId,
    pub mutable: bool,
    pub pattern: Pattern,
    pub location: CodeLocation,
}

/// How a method takes `self`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    Value,
    Ref,
    RefMut,
}

/// Signature and ownership of a CFG
#[derive(Debug, Clone, PartialEq)]
pub struct CfgDescriptor {
    pub name: String,
    pub unit: UnitId,
    pub location: CodeLocation,
    pub params: Vec<Parameter>,
    pub return_type: TypeId,
    /// Set for methods; the receiver is also the first parameter
    pub receiver: Option<Receiver>,
}

impl CfgDescriptor {
    pub fn returns_unit(&self) -> bool {
        self.return_type == TypeId::UNIT
    }
}

/// Control Flow Graph
#[derive(Debug, Clone)]
pub struct Cfg {
    descriptor: CfgDescriptor,
    graph: StableDiGraph<Statement, EdgeKind>,
    entrypoints: SmallVec<[NodeId; 1]>,
}

impl Cfg {
    pub fn new(descriptor: CfgDescriptor) -> Self {
        Self {
            descriptor,
            graph: StableDiGraph::new(),
            entrypoints: SmallVec::new(),
        }
    }

    pub fn descriptor(&self) -> &CfgDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn add_node(&mut self, stmt: Statement) -> NodeId {
        self.graph.add_node(stmt)
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        self.graph.add_edge(from, to, kind);
    }

    pub fn add_entrypoint(&mut self, node: NodeId) {
        if !self.entrypoints.contains(&node) {
            self.entrypoints.push(node);
        }
    }

    pub fn entrypoints(&self) -> &[NodeId] {
        &self.entrypoints
    }

    pub fn is_entrypoint(&self, node: NodeId) -> bool {
        self.entrypoints.contains(&node)
    }

    /// Nodes without successors
    pub fn exitpoints(&self) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|&n| self.graph.neighbors_directed(n, Direction::Outgoing).next().is_none())
            .collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&Statement> {
        self.graph.node_weight(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Statement> {
        self.graph.node_weight_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Statement)> {
        self.graph.node_indices().map(move |n| (n, &self.graph[n]))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges as `(from, to, kind)`
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, EdgeKind)> + '_ {
        self.graph.edge_references().map(|e| (e.source(), e.target(), *e.weight()))
    }

    pub fn successors(&self, node: NodeId) -> Vec<(NodeId, EdgeKind)> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.target(), *e.weight()))
            .collect()
    }

    pub fn predecessors(&self, node: NodeId) -> Vec<(NodeId, EdgeKind)> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.source(), *e.weight()))
            .collect()
    }

    /// Kind of the edge `from -> to`, if there is one
    pub fn edge_kind(&self, from: NodeId, to: NodeId) -> Option<EdgeKind> {
        self.graph.find_edge(from, to).map(|e| self.graph[e])
    }

    /// Nodes whose statement satisfies `pred`
    pub fn find_nodes(&self, pred: impl Fn(&Statement) -> bool) -> Vec<NodeId> {
        self.nodes().filter(|(_, stmt)| pred(stmt)).map(|(n, _)| n).collect()
    }

    /// First node whose rendering equals `text`
    pub fn find_by_text(&self, text: &str) -> Option<NodeId> {
        self.nodes().find(|(_, stmt)| stmt.to_string() == text).map(|(n, _)| n)
    }

    /// Nodes in reverse postorder from the entrypoints (useful for forward dataflow)
    pub fn reverse_postorder(&self) -> Vec<NodeId> {
        let mut order = self.postorder();
        order.reverse();
        order
    }

    /// Nodes in postorder from the entrypoints (useful for backward dataflow)
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for &entry in self.entrypoints.iter().rev() {
            if seen.contains(&entry) {
                continue;
            }
            let mut dfs = DfsPostOrder::new(&self.graph, entry);
            while let Some(n) = dfs.next(&self.graph) {
                if seen.insert(n) {
                    order.push(n);
                }
            }
        }
        order
    }

    /// Drop every outgoing edge of `node`
    pub(crate) fn clear_successors(&mut self, node: NodeId) {
        let outgoing: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for edge in outgoing {
            self.graph.remove_edge(edge);
        }
    }

    /// Remove `node`, redirecting each incoming edge to `target` with its kind
    /// unchanged. Outgoing edges of `node` are dropped.
    pub(crate) fn redirect_and_remove(&mut self, node: NodeId, target: NodeId) {
        let incoming = self.predecessors(node);
        self.graph.remove_node(node);
        for (pred, kind) in incoming.into_iter().filter(|(pred, _)| *pred != node) {
            self.graph.add_edge(pred, target, kind);
        }
        self.replace_entrypoint(node, target);
    }

    /// Remove a pass-through node, joining its predecessor to its successor.
    /// The joined edge keeps the kind of the incoming edge.
    pub(crate) fn splice(&mut self, node: NodeId) -> bool {
        let preds = self.predecessors(node);
        let succs = self.successors(node);
        let ([(pred, kind)], [(succ, _)]) = (preds.as_slice(), succs.as_slice()) else {
            return false;
        };
        if *pred == node || *succ == node {
            return false;
        }
        let (pred, kind, succ) = (*pred, *kind, *succ);
        self.graph.remove_node(node);
        self.graph.add_edge(pred, succ, kind);
        true
    }

    /// Remove nodes not reachable from any entrypoint, except `keep`
    pub(crate) fn remove_unreachable(&mut self, keep: Option<NodeId>) -> usize {
        let reachable: HashSet<NodeId> = self.postorder().into_iter().collect();
        let dead: Vec<NodeId> = self
            .graph
            .node_indices()
            .filter(|n| !reachable.contains(n) && Some(*n) != keep)
            .collect();
        for &n in &dead {
            self.graph.remove_node(n);
        }
        dead.len()
    }

    pub(crate) fn set_entrypoints(&mut self, entries: impl IntoIterator<Item = NodeId>) {
        self.entrypoints = entries.into_iter().collect();
    }

    fn replace_entrypoint(&mut self, old: NodeId, new: NodeId) {
        if let Some(pos) = self.entrypoints.iter().position(|&e| e == old) {
            if self.entrypoints.contains(&new) {
                self.entrypoints.remove(pos);
            } else {
                self.entrypoints[pos] = new;
            }
        }
    }
}

impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cfg {}", self.descriptor.name)?;
        for n in self.reverse_postorder() {
            let marker = if self.is_entrypoint(n) { ">" } else { " " };
            write!(f, "{} n{}: {}", marker, n.index(), self.graph[n])?;
            for (succ, kind) in self.successors(n) {
                write!(f, " -{}-> n{}", kind, succ.index())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> CodeLocation {
        CodeLocation::new("cfg.rs", 1, 1)
    }

    fn make_cfg(return_type: TypeId) -> Cfg {
        Cfg::new(CfgDescriptor {
            name: "f".into(),
            unit: UnitId::new(0),
            location: loc(),
            params: Vec::new(),
            return_type,
            receiver: None,
        })
    }

    fn call(name: &str) -> Statement {
        Statement::expression(Expr::new(
            ExprKind::Call(UnresolvedCall {
                target: name.into(),
                qualifier: None,
                kind: CallKind::Function,
                args: Vec::new(),
                policy: CallPolicy::default(),
            }),
            TypeId::UNKNOWN,
            loc(),
        ))
    }

    #[test]
    fn test_splice_keeps_incoming_kind() {
        let mut cfg = make_cfg(TypeId::UNIT);
        let guard = cfg.add_node(call("c"));
        let hop = cfg.add_node(Statement::noop(loc()));
        let next = cfg.add_node(call("g"));
        cfg.add_entrypoint(guard);
        cfg.add_edge(guard, hop, EdgeKind::True);
        cfg.add_edge(hop, next, EdgeKind::Sequential);

        assert!(cfg.splice(hop));
        assert_eq!(cfg.node_count(), 2);
        assert_eq!(cfg.edge_kind(guard, next), Some(EdgeKind::True));
        assert!(cfg.node(hop).is_none());
    }

    #[test]
    fn test_edges_lists_every_edge_with_kind() {
        let mut cfg = make_cfg(TypeId::UNIT);
        let guard = cfg.add_node(call("c"));
        let then = cfg.add_node(call("f"));
        let ret = cfg.add_node(Statement::new(StatementKind::Ret, loc()));
        cfg.add_entrypoint(guard);
        cfg.add_edge(guard, then, EdgeKind::True);
        cfg.add_edge(guard, ret, EdgeKind::False);
        cfg.add_edge(then, ret, EdgeKind::Sequential);

        let mut edges: Vec<_> = cfg.edges().collect();
        edges.sort_by_key(|(from, to, _)| (*from, *to));
        assert_eq!(
            edges,
            vec![
                (guard, then, EdgeKind::True),
                (guard, ret, EdgeKind::False),
                (then, ret, EdgeKind::Sequential),
            ]
        );
        assert_eq!(cfg.edge_count(), edges.len());
    }

    #[test]
    fn test_splice_refuses_self_loop() {
        let mut cfg = make_cfg(TypeId::UNIT);
        let entry = cfg.add_node(call("a"));
        let hop = cfg.add_node(Statement::noop(loc()));
        cfg.add_entrypoint(entry);
        cfg.add_edge(entry, hop, EdgeKind::Sequential);
        cfg.add_edge(hop, hop, EdgeKind::Sequential);
        assert!(!cfg.splice(hop));
    }

    #[test]
    fn test_stable_ids_after_removal() {
        let mut cfg = make_cfg(TypeId::UNIT);
        let a = cfg.add_node(call("a"));
        let b = cfg.add_node(Statement::noop(loc()));
        let c = cfg.add_node(call("c"));
        cfg.add_entrypoint(a);
        cfg.add_edge(a, b, EdgeKind::Sequential);
        cfg.add_edge(b, c, EdgeKind::Sequential);
        cfg.splice(b);
        assert_eq!(cfg.node(c).map(|s| s.to_string()), Some("c()".to_string()));
    }

    #[test]
    fn test_redirect_moves_entrypoint() {
        let mut cfg = make_cfg(TypeId::UNIT);
        let ret = cfg.add_node(Statement::new(StatementKind::Ret, loc()));
        let early = cfg.add_node(Statement::new(StatementKind::ReturnStmt(None), loc()));
        cfg.add_entrypoint(early);
        cfg.redirect_and_remove(early, ret);
        assert_eq!(cfg.entrypoints(), &[ret]);
    }

    #[test]
    fn test_remove_unreachable() {
        let mut cfg = make_cfg(TypeId::UNIT);
        let a = cfg.add_node(call("a"));
        let dead = cfg.add_node(call("dead"));
        let ret = cfg.add_node(Statement::new(StatementKind::Ret, loc()));
        cfg.add_entrypoint(a);
        cfg.add_edge(dead, ret, EdgeKind::Sequential);

        assert_eq!(cfg.remove_unreachable(Some(ret)), 1);
        assert!(cfg.node(ret).is_some());
        assert!(cfg.node(dead).is_none());
    }

    #[test]
    fn test_reverse_postorder_starts_at_entry() {
        let mut cfg = make_cfg(TypeId::UNIT);
        let a = cfg.add_node(call("a"));
        let b = cfg.add_node(call("b"));
        cfg.add_entrypoint(a);
        cfg.add_edge(a, b, EdgeKind::Sequential);
        let rpo = cfg.reverse_postorder();
        assert_eq!(rpo, vec![a, b]);
        assert_eq!(cfg.exitpoints(), vec![b]);
    }
}
