//! Statement, expression and pattern nodes stored in a CFG
//!
//! Every node kind is a closed enum. Each node renders to source-like text
//! through `Display`, carries a static type, and exposes a semantics hook
//! that downstream analyses call with their own abstract state.

use crate::location::CodeLocation;
use crate::types::TypeId;
use std::fmt;

/// Abstract state of a downstream analysis
pub trait AbstractState: Sized {
    /// The state carrying no information
    fn top(&self) -> Self;
}

/// A vertex of a CFG
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: CodeLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// An expression evaluated for its effect or as a branch guard
    Expression(Expr),
    /// Placeholder with no effect
    NoOp,
    /// The single terminator of a unit-returning function
    Ret,
    /// Return of a value; an exit of a value-returning function
    Return(Expr),
    /// A `return` as written in the source. Removed by normalization.
    ReturnStmt(Option<Expr>),
}

impl Statement {
    pub fn new(kind: StatementKind, location: CodeLocation) -> Self {
        Self { kind, location }
    }

    pub fn noop(location: CodeLocation) -> Self {
        Self::new(StatementKind::NoOp, location)
    }

    pub fn expression(expr: Expr) -> Self {
        let location = expr.location.clone();
        Self::new(StatementKind::Expression(expr), location)
    }

    pub fn is_noop(&self) -> bool {
        matches!(self.kind, StatementKind::NoOp)
    }

    /// The expression the node evaluates, if any
    pub fn expr(&self) -> Option<&Expr> {
        match &self.kind {
            StatementKind::Expression(expr) | StatementKind::Return(expr) => Some(expr),
            StatementKind::ReturnStmt(expr) => expr.as_ref(),
            StatementKind::NoOp | StatementKind::Ret => None,
        }
    }

    pub fn static_type(&self) -> TypeId {
        match &self.kind {
            StatementKind::Expression(expr) | StatementKind::Return(expr) => expr.ty,
            StatementKind::ReturnStmt(Some(expr)) => expr.ty,
            StatementKind::NoOp | StatementKind::Ret | StatementKind::ReturnStmt(None) => TypeId::UNIT,
        }
    }

    /// Effect of the node on `entry`. No node is modelled yet: every node
    /// yields the state carrying no information.
    pub fn semantics<S: AbstractState>(&self, entry: &S) -> S {
        match self.expr() {
            Some(expr) => expr.semantics(entry),
            None => entry.top(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StatementKind::Expression(expr) => write!(f, "{}", expr),
            StatementKind::NoOp => write!(f, "no-op"),
            StatementKind::Ret => write!(f, "ret"),
            StatementKind::Return(expr) | StatementKind::ReturnStmt(Some(expr)) => write!(f, "return {}", expr),
            StatementKind::ReturnStmt(None) => write!(f, "return"),
        }
    }
}

/// A typed expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
    pub location: CodeLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Variable(VariableRef),
    /// A qualified path that names no variable, e.g. `Rect::new`
    Path(String),
    /// Unexpanded macro invocation
    Macro { path: String, tokens: String },
    /// Value produced by an exhausted iterator
    Exhausted,
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Borrow { mutable: bool, operand: Box<Expr> },
    /// `operand as target`; the target type is the node type
    Cast { operand: Box<Expr>, target: String },
    Range {
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        inclusive: bool,
    },
    /// `let pattern : annotation = init`
    Let {
        pattern: Pattern,
        annotation: Option<String>,
        init: Option<Box<Expr>>,
    },
    Assign { target: Box<Expr>, value: Box<Expr> },
    /// Whether `scrutinee` matches `pattern`, binding its variables
    PatternTest { pattern: Pattern, scrutinee: Box<Expr> },
    /// A pattern in value position
    Pattern(Pattern),
    ArrayAccess { base: Box<Expr>, index: Box<Expr> },
    TupleAccess { base: Box<Expr>, index: u32 },
    AttributeAccess { base: Box<Expr>, field: String },
    Call(UnresolvedCall),
    /// Field values in declaration order
    StructLiteral { name: String, fields: Vec<Expr> },
    EnumLiteral {
        name: String,
        variant: String,
        payload: EnumPayload,
    },
    Tuple(Vec<Expr>),
    Array(Vec<Expr>),
    ArrayRepeat { element: Box<Expr>, length: u64 },
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeId, location: CodeLocation) -> Self {
        Self { kind, ty, location }
    }

    /// A pattern used as a value; bindings become variable references
    pub fn from_pattern(pattern: Pattern, location: CodeLocation) -> Self {
        let ty = pattern.static_type();
        match pattern {
            Pattern::Binding(var) => Self::new(ExprKind::Variable(var), ty, location),
            other => Self::new(ExprKind::Pattern(other), ty, location),
        }
    }

    pub fn semantics<S: AbstractState>(&self, entry: &S) -> S {
        entry.top()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{}", lit),
            ExprKind::Variable(var) => write!(f, "{}", var),
            ExprKind::Path(path) => write!(f, "{}", path),
            ExprKind::Macro { path, tokens } => write!(f, "{}!({})", path, tokens),
            ExprKind::Exhausted => write!(f, "None"),
            ExprKind::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            ExprKind::Unary { op, operand } => write!(f, "{}{}", op, operand),
            ExprKind::Borrow { mutable, operand } => {
                if *mutable {
                    write!(f, "&mut {}", operand)
                } else {
                    write!(f, "&{}", operand)
                }
            }
            ExprKind::Cast { operand, target } => write!(f, "{} as {}", operand, target),
            ExprKind::Range { start, end, inclusive } => {
                if let Some(start) = start {
                    write!(f, "{}", start)?;
                }
                write!(f, "{}", if *inclusive { "..=" } else { ".." })?;
                if let Some(end) = end {
                    write!(f, "{}", end)?;
                }
                Ok(())
            }
            ExprKind::Let {
                pattern,
                annotation,
                init,
            } => {
                write!(f, "let {}", pattern)?;
                if let Some(annotation) = annotation {
                    write!(f, " : {}", annotation)?;
                }
                if let Some(init) = init {
                    write!(f, " = {}", init)?;
                }
                Ok(())
            }
            ExprKind::Assign { target, value } => write!(f, "{} = {}", target, value),
            ExprKind::PatternTest { pattern, scrutinee } => write!(f, "let {} = {}", pattern, scrutinee),
            ExprKind::Pattern(pattern) => write!(f, "{}", pattern),
            ExprKind::ArrayAccess { base, index } => write!(f, "{}[{}]", base, index),
            ExprKind::TupleAccess { base, index } => write!(f, "{}.{}", base, index),
            ExprKind::AttributeAccess { base, field } => write!(f, "{}.{}", base, field),
            ExprKind::Call(call) => write!(f, "{}", call),
            ExprKind::StructLiteral { name, fields } => {
                write!(f, "{}{{", name)?;
                write_list(f, fields)?;
                write!(f, "}}")
            }
            ExprKind::EnumLiteral { name, variant, payload } => {
                write!(f, "{}::{}", name, variant)?;
                match payload {
                    EnumPayload::Unit => Ok(()),
                    EnumPayload::Tuple(values) => {
                        write!(f, "(")?;
                        write_list(f, values)?;
                        write!(f, ")")
                    }
                    EnumPayload::Struct(values) => {
                        write!(f, "{{")?;
                        write_list(f, values)?;
                        write!(f, "}}")
                    }
                }
            }
            ExprKind::Tuple(values) => {
                write!(f, "(")?;
                write_list(f, values)?;
                if values.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            ExprKind::Array(values) => {
                write!(f, "[")?;
                write_list(f, values)?;
                write!(f, "]")
            }
            ExprKind::ArrayRepeat { element, length } => write!(f, "[{}; {}]", element, length),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(u128),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    Unit,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{}", value),
            Literal::Float(value) => write!(f, "{:?}", value),
            Literal::Bool(value) => write!(f, "{}", value),
            Literal::Char(value) => write!(f, "{:?}", value),
            Literal::Str(value) => write!(f, "{:?}", value),
            Literal::Unit => write!(f, "()"),
        }
    }
}

/// Reference to a local variable; mutability is part of its identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableRef {
    pub name: String,
    pub mutable: bool,
}

impl VariableRef {
    pub fn new(name: impl Into<String>, mutable: bool) -> Self {
        Self {
            name: name.into(),
            mutable,
        }
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mutable {
            write!(f, "mut {}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Comparisons and short-circuit operators produce `bool`
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    Deref,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Deref => "*",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnumPayload {
    Unit,
    Tuple(Vec<Expr>),
    /// Field values in declaration order
    Struct(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `receiver.target(args)`; the receiver is the first argument
    Method,
    /// `path::target(args)`
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterAssignment {
    /// Actuals bind to formals by position
    #[default]
    OrderPreserving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MethodMatching {
    /// Candidates are matched on the runtime types of the actuals
    #[default]
    RuntimeTypes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvaluationOrder {
    #[default]
    LeftToRight,
}

/// How a call site is to be resolved by the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CallPolicy {
    pub parameter_assignment: ParameterAssignment,
    pub method_matching: MethodMatching,
    pub evaluation_order: EvaluationOrder,
}

/// A call whose target is resolved later, by the analysis
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedCall {
    pub target: String,
    /// Path before the target name, e.g. `Rect` in `Rect::new`
    pub qualifier: Option<String>,
    pub kind: CallKind,
    pub args: Vec<Expr>,
    pub policy: CallPolicy,
}

impl UnresolvedCall {
    pub fn receiver(&self) -> Option<&Expr> {
        match self.kind {
            CallKind::Method => self.args.first(),
            CallKind::Function => None,
        }
    }
}

impl fmt::Display for UnresolvedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CallKind::Method => {
                let (receiver, rest) = match self.args.split_first() {
                    Some((receiver, rest)) => (receiver.to_string(), rest),
                    None => (String::new(), &self.args[..]),
                };
                write!(f, "{}.{}(", receiver, self.target)?;
                write_list(f, rest)?;
            }
            CallKind::Function => {
                if let Some(qualifier) = &self.qualifier {
                    write!(f, "{}::", qualifier)?;
                }
                write!(f, "{}(", self.target)?;
                write_list(f, &self.args)?;
            }
        }
        write!(f, ")")
    }
}

/// Binding patterns of `let`, `for`, `match` and `if let`
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Binding(VariableRef),
    Ref { mutable: bool, inner: Box<Pattern> },
    Struct {
        name: String,
        ty: TypeId,
        fields: Vec<(String, Pattern)>,
        rest: bool,
    },
    TupleStruct { path: String, elements: Vec<Pattern> },
    Path(String),
    Tuple(Vec<Pattern>),
    Literal(Box<Expr>),
    Range {
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        inclusive: bool,
    },
    Or(Vec<Pattern>),
    Rest,
    Wildcard,
}

impl Pattern {
    pub fn static_type(&self) -> TypeId {
        match self {
            Pattern::Struct { ty, .. } => *ty,
            Pattern::Literal(expr) => expr.ty,
            _ => TypeId::UNKNOWN,
        }
    }

    /// Whether the pattern matches every value without looking at it
    pub fn is_catch_all(&self) -> bool {
        matches!(self, Pattern::Wildcard | Pattern::Binding(_))
    }

    /// Variables the pattern binds, left to right
    pub fn bindings(&self) -> Vec<&VariableRef> {
        let mut out = Vec::new();
        self.collect_bindings(&mut out);
        out
    }

    fn collect_bindings<'a>(&'a self, out: &mut Vec<&'a VariableRef>) {
        match self {
            Pattern::Binding(var) => out.push(var),
            Pattern::Ref { inner, .. } => inner.collect_bindings(out),
            Pattern::Struct { fields, .. } => fields.iter().for_each(|(_, p)| p.collect_bindings(out)),
            Pattern::TupleStruct { elements, .. } | Pattern::Tuple(elements) | Pattern::Or(elements) => {
                elements.iter().for_each(|p| p.collect_bindings(out))
            }
            Pattern::Path(_) | Pattern::Literal(_) | Pattern::Range { .. } | Pattern::Rest | Pattern::Wildcard => {}
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Binding(var) => write!(f, "{}", var),
            Pattern::Ref { mutable: true, inner } => write!(f, "&mut {}", inner),
            // `&mut b` would read as a mutable reference pattern
            Pattern::Ref { mutable: false, inner } => match inner.as_ref() {
                Pattern::Binding(var) if var.mutable => write!(f, "&({})", inner),
                _ => write!(f, "&{}", inner),
            },
            Pattern::Struct { name, fields, rest, .. } => {
                write!(f, "{} {{ ", name)?;
                for (i, (field, pat)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field, pat)?;
                }
                if *rest {
                    if !fields.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "..")?;
                }
                write!(f, " }}")
            }
            Pattern::TupleStruct { path, elements } => {
                write!(f, "{}(", path)?;
                write_list(f, elements)?;
                write!(f, ")")
            }
            Pattern::Path(path) => write!(f, "{}", path),
            Pattern::Tuple(elements) => {
                write!(f, "(")?;
                write_list(f, elements)?;
                if elements.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Pattern::Literal(expr) => write!(f, "{}", expr),
            Pattern::Range { start, end, inclusive } => {
                if let Some(start) = start {
                    write!(f, "{}", start)?;
                }
                write!(f, "{}", if *inclusive { "..=" } else { ".." })?;
                if let Some(end) = end {
                    write!(f, "{}", end)?;
                }
                Ok(())
            }
            Pattern::Or(alternatives) => {
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", alt)?;
                }
                Ok(())
            }
            Pattern::Rest => write!(f, ".."),
            Pattern::Wildcard => write!(f, "_"),
        }
    }
}
