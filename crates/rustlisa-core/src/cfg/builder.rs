//! CFG construction from `syn` function bodies

use super::normalize::normalize;
use super::{Cfg, CfgDescriptor, EdgeKind, NodeId};
use super::{
    BinaryOp, CallKind, CallPolicy, Expr, ExprKind, Pattern, Statement, StatementKind, UnresolvedCall, VariableRef,
};
use crate::config::FrontendConfig;
use crate::error::{FrontendError, FrontendResult};
use crate::location::CodeLocation;
use crate::lower::LoweringContext;
use crate::types::{TypeArena, TypeId, TypeScope};
use syn::spanned::Spanned;
use syn::{Expr as SynExpr, Item, Pat, Stmt};
use tracing::{debug, trace};

/// Entry and exit of a lowered construct.
///
/// `exit` is `None` when control never falls out of the construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub entry: NodeId,
    pub exit: Option<NodeId>,
}

/// Where the value of a tail expression goes
#[derive(Debug, Clone)]
enum Sink {
    Discard,
    Return,
    Assign(Expr),
}

#[derive(Debug, Clone, Copy)]
enum Jump {
    Break,
    Continue,
}

impl Jump {
    fn keyword(self) -> &'static str {
        match self {
            Jump::Break => "break",
            Jump::Continue => "continue",
        }
    }
}

/// Jumps waiting for the targets of the loop they leave
#[derive(Debug, Default)]
struct LoopContext {
    label: Option<String>,
    breaks: Vec<NodeId>,
    continues: Vec<NodeId>,
}

/// Builder for constructing a CFG from one function body
pub struct CfgBuilder<'a> {
    cfg: Cfg,
    cx: LoweringContext<'a>,
    config: &'a FrontendConfig,
    loop_stack: Vec<LoopContext>,
    fresh: usize,
}

impl<'a> CfgBuilder<'a> {
    pub fn new(
        descriptor: CfgDescriptor,
        types: &'a mut TypeArena,
        scope: &'a TypeScope,
        config: &'a FrontendConfig,
    ) -> Self {
        let mut cx = LoweringContext::new(types, scope);
        for param in &descriptor.params {
            cx.bind_pattern(&param.pattern, param.ty);
        }
        Self {
            cfg: Cfg::new(descriptor),
            cx,
            config,
            loop_stack: Vec::new(),
            fresh: 0,
        }
    }

    /// The graph built so far
    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    /// Lower a function body without normalizing it.
    ///
    /// The tail expression of a value-returning body becomes a return node.
    pub fn lower_body(&mut self, body: &syn::Block) -> FrontendResult<Fragment> {
        let sink = if self.cfg.descriptor().returns_unit() {
            Sink::Discard
        } else {
            Sink::Return
        };
        self.lower_block(body, &sink)
    }

    /// Lower and normalize a complete function body
    pub fn build_function(mut self, body: &syn::Block) -> FrontendResult<Cfg> {
        let fragment = self.lower_body(body)?;
        self.cfg.add_entrypoint(fragment.entry);
        normalize(&mut self.cfg, self.config)?;
        debug!(
            cfg = %self.cfg.name(),
            nodes = self.cfg.node_count(),
            edges = self.cfg.edge_count(),
            "built cfg"
        );
        Ok(self.cfg)
    }

    fn add(&mut self, stmt: Statement) -> NodeId {
        self.cfg.add_node(stmt)
    }

    fn noop(&mut self, location: CodeLocation) -> NodeId {
        self.add(Statement::noop(location))
    }

    fn noop_at<T: Spanned + ?Sized>(&mut self, node: &T) -> NodeId {
        let location = self.cx.location(node);
        self.noop(location)
    }

    /// A construct made of one node
    fn single(&mut self, stmt: Statement) -> Fragment {
        let node = self.add(stmt);
        Fragment {
            entry: node,
            exit: Some(node),
        }
    }

    /// Sequence `next` after `prev`. Once control has left, later fragments
    /// stay disconnected and are pruned as unreachable.
    fn chain(&mut self, prev: Option<Fragment>, next: Fragment) -> Fragment {
        let Some(prev) = prev else {
            return next;
        };
        match prev.exit {
            Some(exit) => {
                self.cfg.add_edge(exit, next.entry, EdgeKind::Sequential);
                Fragment {
                    entry: prev.entry,
                    exit: next.exit,
                }
            }
            None => prev,
        }
    }

    fn connect(&mut self, from: Option<NodeId>, to: NodeId) {
        if let Some(from) = from {
            self.cfg.add_edge(from, to, EdgeKind::Sequential);
        }
    }

    fn lower_block(&mut self, block: &syn::Block, sink: &Sink) -> FrontendResult<Fragment> {
        let tail = block.stmts.len().checked_sub(1);
        let mut current = None;
        for (i, stmt) in block.stmts.iter().enumerate() {
            let is_tail = Some(i) == tail;
            let fragment = match stmt {
                Stmt::Expr(expr, None) if is_tail => Some(self.lower_tail(expr, sink)?),
                Stmt::Macro(mac) if is_tail && mac.semi_token.is_none() => {
                    let location = self.cx.location(mac);
                    let expr = self.cx.lower_macro(&mac.mac, location);
                    Some(self.sink_expr(expr, sink))
                }
                _ => self.lower_stmt(stmt)?,
            };
            if let Some(fragment) = fragment {
                current = Some(self.chain(current, fragment));
            }
        }

        match current {
            Some(fragment) => Ok(fragment),
            None => {
                let node = self.noop_at(block);
                Ok(Fragment {
                    entry: node,
                    exit: Some(node),
                })
            }
        }
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> FrontendResult<Option<Fragment>> {
        match stmt {
            Stmt::Local(local) => self.lower_local(local).map(Some),
            Stmt::Expr(expr, _) => self.lower_stmt_expr(expr).map(Some),
            Stmt::Macro(mac) => {
                let location = self.cx.location(mac);
                let expr = self.cx.lower_macro(&mac.mac, location);
                Ok(Some(self.single(Statement::expression(expr))))
            }
            Stmt::Item(Item::Use(_)) => Ok(None),
            Stmt::Item(item) => Err(FrontendError::unsupported(
                "item nested in a function body",
                self.cx.location(item),
            )),
        }
    }

    fn lower_local(&mut self, local: &syn::Local) -> FrontendResult<Fragment> {
        let location = self.cx.location(local);
        let (pat, annotation) = match &local.pat {
            Pat::Type(typed) => (typed.pat.as_ref(), Some(typed.ty.as_ref())),
            other => (other, None),
        };
        let declared = match annotation {
            Some(ty) => Some(self.cx.types.resolve(self.cx.scope, ty)?),
            None => None,
        };
        let pattern = self.cx.lower_pattern(pat)?;
        let annotation_text =
            annotation.map(|syntax| self.cx.type_text(syntax, declared.unwrap_or(TypeId::UNKNOWN)));

        let Some(init) = &local.init else {
            let ty = declared.unwrap_or(TypeId::UNKNOWN);
            self.cx.bind_pattern(&pattern, ty);
            return Ok(self.declare(pattern, annotation_text, ty, location));
        };
        if init.diverge.is_some() {
            return Err(FrontendError::unsupported("`let ... else`", location));
        }

        if is_control_flow(&init.expr) {
            let Pattern::Binding(var) = &pattern else {
                return Err(FrontendError::unsupported(
                    "destructuring `let` with a control-flow initializer",
                    location,
                ));
            };
            let ty = declared.unwrap_or(TypeId::UNKNOWN);
            let var = var.clone();
            let target = Expr::new(ExprKind::Variable(var.clone()), ty, location.clone());
            let declaration = self.declare(pattern, annotation_text, ty, location);
            let value = self.lower_tail(&init.expr, &Sink::Assign(target))?;
            self.cx.bind_local(&var.name, ty, var.mutable);
            return Ok(self.chain(Some(declaration), value));
        }

        let value = self.cx.lower_expr(&init.expr)?;
        let ty = declared.unwrap_or(value.ty);
        self.cx.bind_pattern(&pattern, ty);
        let expr = Expr::new(
            ExprKind::Let {
                pattern,
                annotation: annotation_text,
                init: Some(Box::new(value)),
            },
            ty,
            location,
        );
        Ok(self.single(Statement::expression(expr)))
    }

    /// `let pattern : annotation` with no initializer
    fn declare(&mut self, pattern: Pattern, annotation: Option<String>, ty: TypeId, location: CodeLocation) -> Fragment {
        let expr = Expr::new(
            ExprKind::Let {
                pattern,
                annotation,
                init: None,
            },
            ty,
            location,
        );
        self.single(Statement::expression(expr))
    }

    /// An expression in statement position
    fn lower_stmt_expr(&mut self, expr: &SynExpr) -> FrontendResult<Fragment> {
        let location = self.cx.location(expr);
        match expr {
            SynExpr::If(expr_if) => self.lower_if(expr_if, &Sink::Discard),
            SynExpr::Match(expr_match) => self.lower_match(expr_match, &Sink::Discard),
            SynExpr::While(expr_while) => self.lower_while(expr_while),
            SynExpr::Loop(expr_loop) => self.lower_loop(expr_loop),
            SynExpr::ForLoop(expr_for) => self.lower_for(expr_for),
            SynExpr::Block(block) if block.label.is_some() => Err(FrontendError::unsupported("labeled block", location)),
            SynExpr::Block(block) => self.lower_block(&block.block, &Sink::Discard),
            SynExpr::Unsafe(block) => self.lower_block(&block.block, &Sink::Discard),
            SynExpr::Return(ret) => self.lower_return(ret),
            SynExpr::Break(brk) => {
                if brk.expr.is_some() {
                    return Err(FrontendError::unsupported("`break` with a value", location));
                }
                self.lower_jump(Jump::Break, brk.label.as_ref(), location)
            }
            SynExpr::Continue(cont) => self.lower_jump(Jump::Continue, cont.label.as_ref(), location),
            SynExpr::Assign(assign) if is_control_flow(&assign.right) => {
                let target = self.cx.lower_expr(&assign.left)?;
                self.lower_tail(&assign.right, &Sink::Assign(target))
            }
            other => {
                let expr = self.cx.lower_expr(other)?;
                Ok(self.single(Statement::expression(expr)))
            }
        }
    }

    /// An expression whose value flows into `sink`
    fn lower_tail(&mut self, expr: &SynExpr, sink: &Sink) -> FrontendResult<Fragment> {
        if matches!(sink, Sink::Discard) {
            return self.lower_stmt_expr(expr);
        }
        let location = self.cx.location(expr);
        match expr {
            SynExpr::If(expr_if) => self.lower_if(expr_if, sink),
            SynExpr::Match(expr_match) => self.lower_match(expr_match, sink),
            SynExpr::Block(block) if block.label.is_none() => self.lower_block(&block.block, sink),
            SynExpr::Unsafe(block) => self.lower_block(&block.block, sink),
            SynExpr::While(_) | SynExpr::Loop(_) | SynExpr::ForLoop(_) => match sink {
                Sink::Assign(_) => Err(FrontendError::unsupported("loop in value position", location)),
                _ => self.lower_stmt_expr(expr),
            },
            SynExpr::Return(_) | SynExpr::Break(_) | SynExpr::Continue(_) => self.lower_stmt_expr(expr),
            other => {
                let value = self.cx.lower_expr(other)?;
                Ok(self.sink_expr(value, sink))
            }
        }
    }

    fn sink_expr(&mut self, expr: Expr, sink: &Sink) -> Fragment {
        match sink {
            Sink::Discard => self.single(Statement::expression(expr)),
            Sink::Return => {
                let location = expr.location.clone();
                let node = self.add(Statement::new(StatementKind::Return(expr), location));
                Fragment { entry: node, exit: None }
            }
            Sink::Assign(target) => {
                let location = expr.location.clone();
                let assign = Expr::new(
                    ExprKind::Assign {
                        target: Box::new(target.clone()),
                        value: Box::new(expr),
                    },
                    TypeId::UNIT,
                    location,
                );
                self.single(Statement::expression(assign))
            }
        }
    }

    fn lower_return(&mut self, ret: &syn::ExprReturn) -> FrontendResult<Fragment> {
        let location = self.cx.location(ret);
        match ret.expr.as_deref() {
            None => Ok(self.single(Statement::new(StatementKind::ReturnStmt(None), location))),
            Some(value) if is_control_flow(value) => {
                if self.cfg.descriptor().returns_unit() {
                    let body = self.lower_stmt_expr(value)?;
                    let bare = self.single(Statement::new(StatementKind::ReturnStmt(None), location));
                    Ok(self.chain(Some(body), bare))
                } else {
                    self.lower_tail(value, &Sink::Return)
                }
            }
            Some(value) => {
                let value = self.cx.lower_expr(value)?;
                Ok(self.single(Statement::new(StatementKind::ReturnStmt(Some(value)), location)))
            }
        }
    }

    /// `if`/`else if`/`else` chain: each guard falls through to the next
    fn lower_if(&mut self, expr_if: &syn::ExprIf, sink: &Sink) -> FrontendResult<Fragment> {
        let convergence = self.noop_at(expr_if);
        let mut entry = None;
        let mut pending_false: Option<NodeId> = None;
        let mut current = expr_if;

        loop {
            let condition = self.cx.lower_expr(&current.cond)?;
            let guard = self.add(Statement::expression(condition));
            if let Some(previous) = pending_false {
                self.cfg.add_edge(previous, guard, EdgeKind::False);
            }
            entry.get_or_insert(guard);

            let then = self.lower_block(&current.then_branch, sink)?;
            self.cfg.add_edge(guard, then.entry, EdgeKind::True);
            self.connect(then.exit, convergence);

            match current.else_branch.as_ref().map(|(_, branch)| branch.as_ref()) {
                Some(SynExpr::If(next)) => {
                    pending_false = Some(guard);
                    current = next;
                }
                Some(other) => {
                    let alternative = self.lower_tail(other, sink)?;
                    self.cfg.add_edge(guard, alternative.entry, EdgeKind::False);
                    self.connect(alternative.exit, convergence);
                    break;
                }
                None => {
                    self.cfg.add_edge(guard, convergence, EdgeKind::False);
                    break;
                }
            }
        }

        Ok(Fragment {
            entry: entry.unwrap_or(convergence),
            exit: Some(convergence),
        })
    }

    /// Arms form a guard chain testing each pattern in turn
    fn lower_match(&mut self, expr_match: &syn::ExprMatch, sink: &Sink) -> FrontendResult<Fragment> {
        let scrutinee = self.cx.lower_expr(&expr_match.expr)?;
        let convergence = self.noop_at(expr_match);
        let mut entry = None;
        let mut pending_false: Option<NodeId> = None;
        let mut exhaustive = false;

        for arm in &expr_match.arms {
            let location = self.cx.location(&arm.pat);
            let pattern = self.cx.lower_pattern(&arm.pat)?;
            exhaustive = pattern.is_catch_all() && arm.guard.is_none();
            self.cx.bind_pattern(&pattern, scrutinee.ty);
            let test = Expr::new(
                ExprKind::PatternTest {
                    pattern,
                    scrutinee: Box::new(scrutinee.clone()),
                },
                TypeId::BOOL,
                location.clone(),
            );
            let condition = match &arm.guard {
                Some((_, extra)) => {
                    let extra = self.cx.lower_expr(extra)?;
                    self.cx.binary(BinaryOp::And, test, extra, location)
                }
                None => test,
            };

            let guard = self.add(Statement::expression(condition));
            if let Some(previous) = pending_false {
                self.cfg.add_edge(previous, guard, EdgeKind::False);
            }
            entry.get_or_insert(guard);

            let body = self.lower_tail(&arm.body, sink)?;
            self.cfg.add_edge(guard, body.entry, EdgeKind::True);
            self.connect(body.exit, convergence);
            pending_false = Some(guard);
        }

        // Falling off the last arm is impossible after a catch-all, and a
        // returned match is exhaustive by typing
        if let Some(last) = pending_false {
            if !exhaustive && !matches!(sink, Sink::Return) {
                self.cfg.add_edge(last, convergence, EdgeKind::False);
            }
        }
        let reached = entry.is_none() || !self.cfg.predecessors(convergence).is_empty();
        Ok(Fragment {
            entry: entry.unwrap_or(convergence),
            exit: reached.then_some(convergence),
        })
    }

    fn lower_while(&mut self, expr_while: &syn::ExprWhile) -> FrontendResult<Fragment> {
        let condition = self.cx.lower_expr(&expr_while.cond)?;
        let guard = self.add(Statement::expression(condition));
        let convergence = self.noop_at(expr_while);

        let (body, frame) = self.in_loop(expr_while.label.as_ref(), |this| {
            this.lower_block(&expr_while.body, &Sink::Discard)
        })?;

        self.cfg.add_edge(guard, body.entry, EdgeKind::True);
        self.connect(body.exit, guard);
        self.cfg.add_edge(guard, convergence, EdgeKind::False);
        self.resolve_jumps(frame, convergence, guard);

        Ok(Fragment {
            entry: guard,
            exit: Some(convergence),
        })
    }

    /// An unconditional loop. Without a `break` the body's own exit is the
    /// exit of the loop.
    fn lower_loop(&mut self, expr_loop: &syn::ExprLoop) -> FrontendResult<Fragment> {
        let (body, frame) = self.in_loop(expr_loop.label.as_ref(), |this| {
            this.lower_block(&expr_loop.body, &Sink::Discard)
        })?;
        self.connect(body.exit, body.entry);

        if frame.breaks.is_empty() {
            self.resolve_jumps(frame, body.entry, body.entry);
            return Ok(body);
        }

        let convergence = self.noop_at(expr_loop);
        self.resolve_jumps(frame, convergence, body.entry);
        Ok(Fragment {
            entry: body.entry,
            exit: Some(convergence),
        })
    }

    /// `for pat in iterable { body }` desugars to
    ///
    /// ```text
    /// let mut __iterN = iterable
    /// let pat = __iterN.next()
    /// while pat != None { body; let pat = __iterN.next() }
    /// ```
    fn lower_for(&mut self, expr_for: &syn::ExprForLoop) -> FrontendResult<Fragment> {
        let location = self.cx.location(expr_for);
        let binder_location = self.cx.location(&expr_for.pat);
        let iterator = format!("{}{}", self.config.fresh_prefix, self.fresh);
        self.fresh += 1;

        let iterable = self.cx.lower_expr(&expr_for.expr)?;
        let iterable_ty = iterable.ty;
        let init = self.add(Statement::expression(Expr::new(
            ExprKind::Let {
                pattern: Pattern::Binding(VariableRef::new(iterator.clone(), true)),
                annotation: None,
                init: Some(Box::new(iterable)),
            },
            iterable_ty,
            location.clone(),
        )));
        self.cx.bind_local(&iterator, iterable_ty, true);

        let pattern = self.cx.lower_pattern(&expr_for.pat)?;
        self.cx.bind_pattern(&pattern, TypeId::UNKNOWN);
        let first = self.next_step(&iterator, &pattern, &binder_location);
        let first = self.add(first);
        self.cfg.add_edge(init, first, EdgeKind::Sequential);

        let exhausted = Expr::new(ExprKind::Exhausted, TypeId::UNKNOWN, binder_location.clone());
        let current = Expr::from_pattern(pattern.clone(), binder_location.clone());
        let condition = self.cx.binary(BinaryOp::Ne, current, exhausted, binder_location.clone());
        let guard = self.add(Statement::expression(condition));
        self.cfg.add_edge(first, guard, EdgeKind::Sequential);
        let convergence = self.noop(location);

        let (body, frame) = self.in_loop(expr_for.label.as_ref(), |this| {
            this.lower_block(&expr_for.body, &Sink::Discard)
        })?;

        let step = self.next_step(&iterator, &pattern, &binder_location);
        let step = self.add(step);
        self.cfg.add_edge(guard, body.entry, EdgeKind::True);
        self.cfg.add_edge(guard, convergence, EdgeKind::False);
        self.connect(body.exit, step);
        self.cfg.add_edge(step, guard, EdgeKind::Sequential);
        self.resolve_jumps(frame, convergence, step);

        trace!(iterator = %iterator, "desugared for loop");
        Ok(Fragment {
            entry: init,
            exit: Some(convergence),
        })
    }

    /// `let pat = iterator.next()`
    fn next_step(&self, iterator: &str, pattern: &Pattern, location: &CodeLocation) -> Statement {
        let receiver = Expr::new(
            ExprKind::Variable(self.cx.variable(iterator)),
            self.cx.local_type(iterator).unwrap_or(TypeId::UNKNOWN),
            location.clone(),
        );
        let next = Expr::new(
            ExprKind::Call(UnresolvedCall {
                target: "next".to_string(),
                qualifier: None,
                kind: CallKind::Method,
                args: vec![receiver],
                policy: CallPolicy::default(),
            }),
            TypeId::UNKNOWN,
            location.clone(),
        );
        Statement::expression(Expr::new(
            ExprKind::Let {
                pattern: pattern.clone(),
                annotation: None,
                init: Some(Box::new(next)),
            },
            TypeId::UNKNOWN,
            location.clone(),
        ))
    }

    /// Lower a loop body with its jump targets pending
    fn in_loop(
        &mut self,
        label: Option<&syn::Label>,
        body: impl FnOnce(&mut Self) -> FrontendResult<Fragment>,
    ) -> FrontendResult<(Fragment, LoopContext)> {
        self.loop_stack.push(LoopContext {
            label: label.map(|l| l.name.ident.to_string()),
            ..LoopContext::default()
        });
        let fragment = body(self);
        let frame = self.loop_stack.pop().unwrap_or_default();
        Ok((fragment?, frame))
    }

    fn resolve_jumps(&mut self, frame: LoopContext, break_target: NodeId, continue_target: NodeId) {
        for hop in frame.breaks {
            self.cfg.add_edge(hop, break_target, EdgeKind::Sequential);
        }
        for hop in frame.continues {
            self.cfg.add_edge(hop, continue_target, EdgeKind::Sequential);
        }
    }

    /// A `break`/`continue` hop. It is wired to its target once the
    /// enclosing loop is complete.
    fn lower_jump(
        &mut self,
        jump: Jump,
        label: Option<&syn::Lifetime>,
        location: CodeLocation,
    ) -> FrontendResult<Fragment> {
        let wanted = label.map(|l| l.ident.to_string());
        let index = match &wanted {
            Some(name) => self
                .loop_stack
                .iter()
                .rposition(|frame| frame.label.as_ref() == Some(name)),
            None => self.loop_stack.len().checked_sub(1),
        };
        let Some(index) = index else {
            return Err(FrontendError::InvalidBreak {
                keyword: jump.keyword(),
                location,
            });
        };

        let hop = self.noop(location);
        let frame = &mut self.loop_stack[index];
        match jump {
            Jump::Break => frame.breaks.push(hop),
            Jump::Continue => frame.continues.push(hop),
        }
        Ok(Fragment { entry: hop, exit: None })
    }
}

fn is_control_flow(expr: &SynExpr) -> bool {
    match expr {
        SynExpr::If(_)
        | SynExpr::Match(_)
        | SynExpr::Loop(_)
        | SynExpr::While(_)
        | SynExpr::ForLoop(_)
        | SynExpr::Return(_)
        | SynExpr::Break(_)
        | SynExpr::Continue(_)
        | SynExpr::Unsafe(_) => true,
        SynExpr::Block(block) => block.label.is_none(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::UnitId;
    use std::sync::Arc;

    fn descriptor(return_type: TypeId) -> CfgDescriptor {
        CfgDescriptor {
            name: "f".into(),
            unit: UnitId::new(0),
            location: CodeLocation::new("builder.rs", 1, 1),
            params: Vec::new(),
            return_type,
            receiver: None,
        }
    }

    /// Lower `body` without normalizing it
    fn lower(body: &str, return_type: TypeId) -> (Cfg, FrontendResult<Fragment>) {
        let block: syn::Block = syn::parse_str(body).unwrap();
        let mut arena = TypeArena::new();
        let scope = TypeScope::new(UnitId::new(0), Arc::from("builder.rs"), false);
        let config = FrontendConfig::default();
        let mut builder = CfgBuilder::new(descriptor(return_type), &mut arena, &scope, &config);
        let fragment = builder.lower_body(&block);
        (builder.cfg().clone(), fragment)
    }

    fn node(cfg: &Cfg, text: &str) -> NodeId {
        cfg.find_by_text(text).unwrap_or_else(|| {
            let texts: Vec<_> = cfg.nodes().map(|(_, s)| s.to_string()).collect();
            panic!("no node `{}` among {:?}", text, texts)
        })
    }

    fn successor(cfg: &Cfg, from: NodeId, kind: EdgeKind) -> NodeId {
        cfg.successors(from)
            .into_iter()
            .find(|(_, k)| *k == kind)
            .map(|(n, _)| n)
            .unwrap_or_else(|| panic!("no {} edge out of n{}", kind, from.index()))
    }

    #[test]
    fn test_empty_body_is_single_noop() {
        let (cfg, fragment) = lower("{}", TypeId::UNIT);
        let fragment = fragment.unwrap();
        assert_eq!(Some(fragment.entry), fragment.exit);
        assert_eq!(cfg.node_count(), 1);
        assert!(cfg.node(fragment.entry).unwrap().is_noop());
    }

    #[test]
    fn test_statements_chain_sequentially() {
        let (cfg, fragment) = lower("{ a(); b(); c(); }", TypeId::UNIT);
        let fragment = fragment.unwrap();
        let (a, b, c) = (node(&cfg, "a()"), node(&cfg, "b()"), node(&cfg, "c()"));
        assert_eq!(fragment.entry, a);
        assert_eq!(fragment.exit, Some(c));
        assert_eq!(cfg.edge_kind(a, b), Some(EdgeKind::Sequential));
        assert_eq!(cfg.edge_kind(b, c), Some(EdgeKind::Sequential));
    }

    #[test]
    fn test_if_chain() {
        let (cfg, fragment) = lower("{ if a { f(); } else if b { g(); } else { h(); } }", TypeId::UNIT);
        let fragment = fragment.unwrap();
        let (a, b) = (node(&cfg, "a"), node(&cfg, "b"));
        let (f, g, h) = (node(&cfg, "f()"), node(&cfg, "g()"), node(&cfg, "h()"));
        let convergence = fragment.exit.unwrap();

        assert_eq!(fragment.entry, a);
        assert_eq!(cfg.edge_kind(a, f), Some(EdgeKind::True));
        assert_eq!(cfg.edge_kind(a, b), Some(EdgeKind::False));
        assert_eq!(cfg.edge_kind(b, g), Some(EdgeKind::True));
        assert_eq!(cfg.edge_kind(b, h), Some(EdgeKind::False));
        for branch in [f, g, h] {
            assert_eq!(cfg.edge_kind(branch, convergence), Some(EdgeKind::Sequential));
        }
        assert!(cfg.node(convergence).unwrap().is_noop());
    }

    #[test]
    fn test_if_without_else_falls_to_convergence() {
        let (cfg, fragment) = lower("{ if a { f(); } }", TypeId::UNIT);
        let fragment = fragment.unwrap();
        let a = node(&cfg, "a");
        assert_eq!(cfg.edge_kind(a, fragment.exit.unwrap()), Some(EdgeKind::False));
    }

    #[test]
    fn test_while_back_edge() {
        let (cfg, fragment) = lower("{ while i < 10 { i += 1; } }", TypeId::UNIT);
        let fragment = fragment.unwrap();
        let guard = node(&cfg, "i < 10");
        let body = node(&cfg, "i = i + 1");
        assert_eq!(fragment.entry, guard);
        assert_eq!(cfg.edge_kind(guard, body), Some(EdgeKind::True));
        assert_eq!(cfg.edge_kind(body, guard), Some(EdgeKind::Sequential));
        assert_eq!(cfg.edge_kind(guard, fragment.exit.unwrap()), Some(EdgeKind::False));
    }

    #[test]
    fn test_while_let_guard_is_pattern_test() {
        let (cfg, fragment) = lower("{ while let Some(top) = stack.pop() { visit(top); } }", TypeId::UNIT);
        let guard = fragment.unwrap().entry;
        assert_eq!(cfg.node(guard).unwrap().to_string(), "let Some(top) = stack.pop()");
        assert_eq!(cfg.node(guard).unwrap().static_type(), TypeId::BOOL);
    }

    #[test]
    fn test_loop_without_break() {
        let (cfg, fragment) = lower("{ loop { tick(); } }", TypeId::UNIT);
        let fragment = fragment.unwrap();
        let tick = node(&cfg, "tick()");
        assert_eq!(fragment.entry, tick);
        assert_eq!(fragment.exit, Some(tick));
        assert_eq!(cfg.edge_kind(tick, tick), Some(EdgeKind::Sequential));
    }

    #[test]
    fn test_loop_break_targets_convergence() {
        let (cfg, fragment) = lower("{ loop { if done { break; } step(); } }", TypeId::UNIT);
        let fragment = fragment.unwrap();
        let done = node(&cfg, "done");
        let step = node(&cfg, "step()");
        let exit = fragment.exit.unwrap();
        let hop = successor(&cfg, done, EdgeKind::True);

        assert_eq!(fragment.entry, done);
        assert!(cfg.node(exit).unwrap().is_noop());
        assert_eq!(cfg.successors(hop), vec![(exit, EdgeKind::Sequential)]);
        assert_eq!(cfg.edge_kind(step, done), Some(EdgeKind::Sequential));
    }

    #[test]
    fn test_for_desugaring() {
        let (cfg, fragment) = lower("{ for x in 0..3 { use_it(x); } }", TypeId::UNIT);
        let fragment = fragment.unwrap();
        let init = node(&cfg, "let mut __iter0 = 0..3");
        let guard = node(&cfg, "x != None");
        let body = node(&cfg, "use_it(x)");
        let steps = cfg.find_nodes(|s| s.to_string() == "let x = mut __iter0.next()");
        assert_eq!(steps.len(), 2);

        let first = successor(&cfg, init, EdgeKind::Sequential);
        let increment = successor(&cfg, body, EdgeKind::Sequential);
        assert_ne!(first, increment);
        assert!(steps.contains(&first) && steps.contains(&increment));

        assert_eq!(fragment.entry, init);
        assert_eq!(cfg.edge_kind(first, guard), Some(EdgeKind::Sequential));
        assert_eq!(cfg.edge_kind(guard, body), Some(EdgeKind::True));
        assert_eq!(cfg.edge_kind(guard, fragment.exit.unwrap()), Some(EdgeKind::False));
        assert_eq!(cfg.edge_kind(increment, guard), Some(EdgeKind::Sequential));
    }

    #[test]
    fn test_for_fresh_names_are_per_cfg() {
        let (cfg, _) = lower("{ for a in xs { } for b in ys { } }", TypeId::UNIT);
        assert!(cfg.find_by_text("let mut __iter0 = xs").is_some());
        assert!(cfg.find_by_text("let mut __iter1 = ys").is_some());
    }

    #[test]
    fn test_continue_targets_increment() {
        let (cfg, _) = lower("{ for x in xs { if skip { continue; } use_it(x); } }", TypeId::UNIT);
        let skip = node(&cfg, "skip");
        let hop = successor(&cfg, skip, EdgeKind::True);
        let target = successor(&cfg, hop, EdgeKind::Sequential);
        let body = node(&cfg, "use_it(x)");
        assert_eq!(successor(&cfg, body, EdgeKind::Sequential), target);
    }

    #[test]
    fn test_labeled_break_leaves_outer_loop() {
        let (cfg, fragment) = lower("{ 'outer: while c { loop { break 'outer; } } }", TypeId::UNIT);
        let fragment = fragment.unwrap();
        let guard = node(&cfg, "c");
        let hop = successor(&cfg, guard, EdgeKind::True);
        assert_eq!(cfg.successors(hop), vec![(fragment.exit.unwrap(), EdgeKind::Sequential)]);
    }

    #[test]
    fn test_invalid_jumps() {
        for body in ["{ break; }", "{ continue; }", "{ loop { break 'missing; } }"] {
            let (_, fragment) = lower(body, TypeId::UNIT);
            assert!(
                matches!(fragment, Err(FrontendError::InvalidBreak { .. })),
                "{}: {:?}",
                body,
                fragment
            );
        }
        let (_, fragment) = lower("{ loop { break 1; } }", TypeId::UNIT);
        assert!(matches!(fragment, Err(FrontendError::Unsupported { .. })));
    }

    #[test]
    fn test_let_typing() {
        let (cfg, _) = lower("{ let a = 1; let b: u8 = 2; let mut c; }", TypeId::UNIT);
        let a = node(&cfg, "let a = 1");
        let b = node(&cfg, "let b : u8 = 2");
        let c = node(&cfg, "let mut c");
        assert_eq!(cfg.node(a).unwrap().static_type(), TypeId::I32);
        assert_eq!(cfg.node(b).unwrap().static_type(), TypeId::U8);
        assert_eq!(cfg.node(c).unwrap().static_type(), TypeId::UNKNOWN);
    }

    #[test]
    fn test_locals_type_later_uses() {
        let (cfg, _) = lower("{ let n: u64 = 4; let m = n * 2u64; }", TypeId::UNIT);
        let m = node(&cfg, "let m = n * 2");
        assert_eq!(cfg.node(m).unwrap().static_type(), TypeId::U64);
    }

    #[test]
    fn test_value_position_if_assigns_each_branch() {
        let (cfg, fragment) = lower("{ let x = if c { 1 } else { 2 }; }", TypeId::UNIT);
        let declaration = node(&cfg, "let x");
        let guard = node(&cfg, "c");
        assert_eq!(fragment.unwrap().entry, declaration);
        assert_eq!(cfg.edge_kind(declaration, guard), Some(EdgeKind::Sequential));
        assert_eq!(cfg.edge_kind(guard, node(&cfg, "x = 1")), Some(EdgeKind::True));
        assert_eq!(cfg.edge_kind(guard, node(&cfg, "x = 2")), Some(EdgeKind::False));

        let (_, fragment) = lower("{ let (a, b) = if c { (1, 2) } else { (3, 4) }; }", TypeId::UNIT);
        assert!(matches!(fragment, Err(FrontendError::Unsupported { .. })));
    }

    #[test]
    fn test_value_tail_becomes_return() {
        let (cfg, fragment) = lower("{ if c { 1 } else { 2 } }", TypeId::I32);
        let fragment = fragment.unwrap();
        let guard = node(&cfg, "c");
        let one = successor(&cfg, guard, EdgeKind::True);
        let two = successor(&cfg, guard, EdgeKind::False);
        for ret in [one, two] {
            assert!(matches!(cfg.node(ret).unwrap().kind, StatementKind::Return(_)));
            assert!(cfg.successors(ret).is_empty());
        }
        assert!(cfg.predecessors(fragment.exit.unwrap()).is_empty());
    }

    #[test]
    fn test_match_guard_chain() {
        let (cfg, fragment) = lower(
            "{ match v { 0 => zero(), n if n > 10 => big(n), _ => other() } }",
            TypeId::UNIT,
        );
        let fragment = fragment.unwrap();
        let first = node(&cfg, "let 0 = v");
        let second = node(&cfg, "let n = v && n > 10");
        let third = node(&cfg, "let _ = v");

        assert_eq!(fragment.entry, first);
        assert_eq!(cfg.edge_kind(first, node(&cfg, "zero()")), Some(EdgeKind::True));
        assert_eq!(cfg.edge_kind(first, second), Some(EdgeKind::False));
        assert_eq!(cfg.edge_kind(second, node(&cfg, "big(n)")), Some(EdgeKind::True));
        assert_eq!(cfg.edge_kind(second, third), Some(EdgeKind::False));
        // `_` cannot fail, so only the arm bodies reach the convergence
        let exit = fragment.exit.unwrap();
        assert_eq!(cfg.successors(third), vec![(node(&cfg, "other()"), EdgeKind::True)]);
        assert_eq!(cfg.predecessors(exit).len(), 3);
        assert!(cfg.predecessors(exit).iter().all(|(_, k)| *k == EdgeKind::Sequential));
    }

    #[test]
    fn test_match_refutable_last_arm_falls_through() {
        let (cfg, fragment) = lower("{ match v { 0 => zero(), n if n > 10 => big(n) } }", TypeId::UNIT);
        let second = node(&cfg, "let n = v && n > 10");
        assert_eq!(cfg.edge_kind(second, fragment.unwrap().exit.unwrap()), Some(EdgeKind::False));
    }

    #[test]
    fn test_returned_match_has_no_fall_through() {
        let (cfg, fragment) = lower("{ match v { 0 => 1, 1 => 2 } }", TypeId::I32);
        assert_eq!(fragment.unwrap().exit, None);
        let last = node(&cfg, "let 1 = v");
        assert_eq!(cfg.successors(last), vec![(node(&cfg, "return 2"), EdgeKind::True)]);
    }

    #[test]
    fn test_mutable_locals_render_at_uses() {
        let (cfg, _) = lower("{ let mut n = 1; let k = 2; n = n + k; }", TypeId::UNIT);
        let update = node(&cfg, "mut n = mut n + k");
        let StatementKind::Expression(expr) = &cfg.node(update).unwrap().kind else {
            panic!("expected an expression statement");
        };
        let ExprKind::Assign { target, .. } = &expr.kind else {
            panic!("expected an assignment");
        };
        assert!(matches!(&target.kind, ExprKind::Variable(var) if var.mutable && var.name == "n"));
    }

    #[test]
    fn test_nested_items() {
        let (_, fragment) = lower("{ use std::fmt; f(); }", TypeId::UNIT);
        assert!(fragment.is_ok());
        let (_, fragment) = lower("{ fn inner() {} }", TypeId::UNIT);
        assert!(matches!(fragment, Err(FrontendError::Unsupported { .. })));
    }

    #[test]
    fn test_macro_statements() {
        let (cfg, _) = lower("{ println!(\"hi\"); }", TypeId::UNIT);
        assert_eq!(cfg.find_nodes(|s| s.to_string().starts_with("println!")).len(), 1);
    }
}
