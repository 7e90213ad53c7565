//! Sequence operations: symbolic, length-preserving transforms.
//!
//! A `SeqOp` describes how to turn an input sequence of length n into an
//! output sequence of length n. Nothing is computed when a `SeqOp` is built;
//! operators and combinators only allocate new immutable nodes that share
//! their children. Evaluation happens in [`crate::eval`].
//!
//! The leaves are [`tokens`] (the input itself) and [`indices`] (positions
//! `0..n`). Scalars are lifted to constant nodes, broadcast to the input
//! length at evaluation time.

use std::fmt;
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Neg, Not, Rem, Sub};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::Config;
use crate::eval::{evaluate, EvalError};
use crate::selector::Selector;
use crate::value::{BinaryOp, IntoInput, UnaryOp, Value};

static NEXT_NODE_ID: AtomicUsize = AtomicUsize::new(0);

/// Identity of an expression node.
///
/// Handles that share an id denote the same computation; the evaluator
/// memoizes on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scalar function applied elementwise by a `map` node.
pub type MapFn = Rc<dyn Fn(&Value) -> Result<Value, String>>;

/// The operation performed by a `SeqOp` node.
#[derive(Clone)]
pub enum SeqKind {
    /// The raw input sequence
    Tokens,
    /// Positions `0..n`
    Indices,
    /// A scalar broadcast to the input length
    Constant(Value),
    /// A user function applied to every element
    Map {
        inner: SeqOp,
        /// Display name of the function
        name: String,
        func: MapFn,
    },
    Unary {
        op: UnaryOp,
        inner: SeqOp,
    },
    Binary {
        op: BinaryOp,
        left: SeqOp,
        right: SeqOp,
    },
    /// Per-position choice between two branches (both are evaluated)
    Where {
        cond: SeqOp,
        then: SeqOp,
        otherwise: SeqOp,
    },
    /// Sum of `value` over the keys selected by each query row
    Aggregate {
        selector: Selector,
        value: SeqOp,
        /// Result for rows that select nothing
        default: Value,
    },
}

impl SeqKind {
    /// Short structural tag, used for synthetic names.
    pub fn tag(&self) -> &'static str {
        match self {
            SeqKind::Tokens => "tokens",
            SeqKind::Indices => "indices",
            SeqKind::Constant(_) => "constant",
            SeqKind::Map { .. } => "map",
            SeqKind::Unary { .. } => "unary",
            SeqKind::Binary { .. } => "binary",
            SeqKind::Where { .. } => "where",
            SeqKind::Aggregate { .. } => "aggregate",
        }
    }
}

impl fmt::Debug for SeqKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeqKind::Tokens => write!(f, "Tokens"),
            SeqKind::Indices => write!(f, "Indices"),
            SeqKind::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            SeqKind::Map { inner, name, .. } => f
                .debug_struct("Map")
                .field("name", name)
                .field("inner", inner)
                .finish_non_exhaustive(),
            SeqKind::Unary { op, inner } => f
                .debug_struct("Unary")
                .field("op", op)
                .field("inner", inner)
                .finish(),
            SeqKind::Binary { op, left, right } => f
                .debug_struct("Binary")
                .field("op", op)
                .field("left", left)
                .field("right", right)
                .finish(),
            SeqKind::Where {
                cond,
                then,
                otherwise,
            } => f
                .debug_struct("Where")
                .field("cond", cond)
                .field("then", then)
                .field("otherwise", otherwise)
                .finish(),
            SeqKind::Aggregate {
                selector,
                value,
                default,
            } => f
                .debug_struct("Aggregate")
                .field("selector", selector)
                .field("value", value)
                .field("default", default)
                .finish(),
        }
    }
}

struct SeqNode {
    id: NodeId,
    label: Option<String>,
    kind: SeqKind,
}

impl Drop for SeqNode {
    // Unlink operands with a work list; long chains would otherwise drop
    // recursively, one stack frame group per level.
    fn drop(&mut self) {
        let mut pending = take_operands(&mut self.kind);
        while let Some(op) = pending.pop() {
            if let Ok(mut node) = Rc::try_unwrap(op.0) {
                pending.extend(take_operands(&mut node.kind));
            }
        }
    }
}

fn take_operands(kind: &mut SeqKind) -> Vec<SeqOp> {
    match std::mem::replace(kind, SeqKind::Tokens) {
        SeqKind::Tokens | SeqKind::Indices | SeqKind::Constant(_) => Vec::new(),
        SeqKind::Map { inner, .. } | SeqKind::Unary { inner, .. } => vec![inner],
        SeqKind::Binary { left, right, .. } => vec![left, right],
        SeqKind::Where {
            cond,
            then,
            otherwise,
        } => vec![cond, then, otherwise],
        SeqKind::Aggregate { value, .. } => vec![value],
    }
}

/// Handle to an immutable sequence-operation node.
///
/// Cloning is cheap and keeps the node identity.
#[derive(Clone)]
pub struct SeqOp(Rc<SeqNode>);

thread_local! {
    static TOKENS: SeqOp = SeqOp::new(SeqKind::Tokens);
    static INDICES: SeqOp = SeqOp::new(SeqKind::Indices);
}

/// The input sequence itself.
pub fn tokens() -> SeqOp {
    TOKENS.with(|t| t.clone())
}

/// The positions of the input, `[0, 1, ..., n-1]`.
pub fn indices() -> SeqOp {
    INDICES.with(|i| i.clone())
}

/// A scalar broadcast to the input length.
pub fn constant(value: impl Into<Value>) -> SeqOp {
    SeqOp::new(SeqKind::Constant(value.into()))
}

/// Elementwise choice: `then` where `cond` holds, `otherwise` elsewhere.
#[doc(alias = "where")]
pub fn where_(
    cond: impl Into<SeqOp>,
    then: impl Into<SeqOp>,
    otherwise: impl Into<SeqOp>,
) -> SeqOp {
    SeqOp::new(SeqKind::Where {
        cond: cond.into(),
        then: then.into(),
        otherwise: otherwise.into(),
    })
}

impl SeqOp {
    pub(crate) fn new(kind: SeqKind) -> Self {
        SeqOp(Rc::new(SeqNode {
            id: NodeId::fresh(),
            label: None,
            kind,
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn label(&self) -> Option<&str> {
        self.0.label.as_deref()
    }

    pub fn kind(&self) -> &SeqKind {
        &self.0.kind
    }

    /// The label if set, otherwise `tag#id`.
    pub fn display_name(&self) -> String {
        match self.label() {
            Some(label) => label.to_string(),
            None => format!("{}{}", self.kind().tag(), self.id()),
        }
    }

    /// Attach a display label. The result is the same logical node: it
    /// shares this node's identity, so evaluation results do not change.
    ///
    /// Labels are not aliases. When differently labelled handles of one node
    /// meet in a single evaluation, the node is computed once and its trace
    /// layer carries the label of whichever handle was reached first (the
    /// leftmost operand). In `x.name("a") * x.name("b")` the layer is `a`.
    pub fn name(&self, label: impl Into<String>) -> SeqOp {
        SeqOp(Rc::new(SeqNode {
            id: self.0.id,
            label: Some(label.into()),
            kind: self.0.kind.clone(),
        }))
    }

    /// Ids of the nodes this one reads, in evaluation order.
    pub fn dependencies(&self) -> Vec<NodeId> {
        match self.kind() {
            SeqKind::Tokens | SeqKind::Indices | SeqKind::Constant(_) => vec![],
            SeqKind::Map { inner, .. } | SeqKind::Unary { inner, .. } => vec![inner.id()],
            SeqKind::Binary { left, right, .. } => vec![left.id(), right.id()],
            SeqKind::Where {
                cond,
                then,
                otherwise,
            } => vec![cond.id(), then.id(), otherwise.id()],
            SeqKind::Aggregate {
                selector, value, ..
            } => vec![selector.id(), value.id()],
        }
    }

    /// Apply a scalar function to every element.
    ///
    /// An `Err` from `func` fails the evaluation with a mapping error.
    pub fn map<F>(&self, func: F) -> SeqOp
    where
        F: Fn(&Value) -> Result<Value, String> + 'static,
    {
        self.map_named("map", func)
    }

    /// Like [`SeqOp::map`], with a display name for the function.
    pub fn map_named<F>(&self, name: impl Into<String>, func: F) -> SeqOp
    where
        F: Fn(&Value) -> Result<Value, String> + 'static,
    {
        SeqOp::new(SeqKind::Map {
            inner: self.clone(),
            name: name.into(),
            func: Rc::new(func),
        })
    }

    pub fn binary(&self, op: BinaryOp, rhs: impl Into<SeqOp>) -> SeqOp {
        SeqOp::new(SeqKind::Binary {
            op,
            left: self.clone(),
            right: rhs.into(),
        })
    }

    pub fn unary(&self, op: UnaryOp) -> SeqOp {
        SeqOp::new(SeqKind::Unary {
            op,
            inner: self.clone(),
        })
    }

    // Comparisons cannot go through `PartialEq`/`PartialOrd` (those return
    // `bool`), so they are plain builder methods.

    pub fn eq(&self, rhs: impl Into<SeqOp>) -> SeqOp {
        self.binary(BinaryOp::Eq, rhs)
    }

    pub fn ne(&self, rhs: impl Into<SeqOp>) -> SeqOp {
        self.binary(BinaryOp::Ne, rhs)
    }

    pub fn lt(&self, rhs: impl Into<SeqOp>) -> SeqOp {
        self.binary(BinaryOp::Lt, rhs)
    }

    pub fn le(&self, rhs: impl Into<SeqOp>) -> SeqOp {
        self.binary(BinaryOp::Le, rhs)
    }

    pub fn gt(&self, rhs: impl Into<SeqOp>) -> SeqOp {
        self.binary(BinaryOp::Gt, rhs)
    }

    pub fn ge(&self, rhs: impl Into<SeqOp>) -> SeqOp {
        self.binary(BinaryOp::Ge, rhs)
    }

    /// Evaluate against a concrete input.
    pub fn input(&self, input: impl IntoInput) -> Result<Vec<Value>, EvalError> {
        evaluate(self, input)
    }

    /// Evaluate against the configured preview input. Nothing is ever
    /// evaluated implicitly; this is the explicit opt-in.
    pub fn preview(&self, config: &Config) -> Result<Vec<Value>, EvalError> {
        evaluate(self, config.preview_input.as_str())
    }
}

impl fmt::Debug for SeqOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SeqOp");
        s.field("id", &self.0.id);
        if let Some(label) = &self.0.label {
            s.field("label", label);
        }
        s.field("kind", &self.0.kind).finish()
    }
}

// ============================================================================
// LIFTING
// ============================================================================

impl From<&SeqOp> for SeqOp {
    fn from(op: &SeqOp) -> Self {
        op.clone()
    }
}

impl From<Value> for SeqOp {
    fn from(v: Value) -> Self {
        constant(v)
    }
}

macro_rules! lift_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SeqOp {
                fn from(v: $ty) -> Self {
                    constant(Value::from(v))
                }
            }
        )*
    };
}

lift_scalar!(i64, i32, usize, char, bool);

// ============================================================================
// OPERATOR SUGAR
// ============================================================================

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<SeqOp>> $trait<T> for SeqOp {
            type Output = SeqOp;

            fn $method(self, rhs: T) -> SeqOp {
                self.binary($op, rhs)
            }
        }

        impl<T: Into<SeqOp>> $trait<T> for &SeqOp {
            type Output = SeqOp;

            fn $method(self, rhs: T) -> SeqOp {
                self.binary($op, rhs)
            }
        }

        impl $trait<SeqOp> for i64 {
            type Output = SeqOp;

            fn $method(self, rhs: SeqOp) -> SeqOp {
                constant(self).binary($op, rhs)
            }
        }

        impl $trait<SeqOp> for i32 {
            type Output = SeqOp;

            fn $method(self, rhs: SeqOp) -> SeqOp {
                constant(self).binary($op, rhs)
            }
        }
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Sub);
binary_operator!(Mul, mul, BinaryOp::Mul);
binary_operator!(Div, div, BinaryOp::Div);
binary_operator!(Rem, rem, BinaryOp::Mod);

impl<T: Into<SeqOp>> BitAnd<T> for SeqOp {
    type Output = SeqOp;

    fn bitand(self, rhs: T) -> SeqOp {
        self.binary(BinaryOp::And, rhs)
    }
}

impl<T: Into<SeqOp>> BitOr<T> for SeqOp {
    type Output = SeqOp;

    fn bitor(self, rhs: T) -> SeqOp {
        self.binary(BinaryOp::Or, rhs)
    }
}

impl<T: Into<SeqOp>> BitAnd<T> for &SeqOp {
    type Output = SeqOp;

    fn bitand(self, rhs: T) -> SeqOp {
        self.binary(BinaryOp::And, rhs)
    }
}

impl<T: Into<SeqOp>> BitOr<T> for &SeqOp {
    type Output = SeqOp;

    fn bitor(self, rhs: T) -> SeqOp {
        self.binary(BinaryOp::Or, rhs)
    }
}

impl Not for SeqOp {
    type Output = SeqOp;

    fn not(self) -> SeqOp {
        self.unary(UnaryOp::Not)
    }
}

impl Not for &SeqOp {
    type Output = SeqOp;

    fn not(self) -> SeqOp {
        self.unary(UnaryOp::Not)
    }
}

impl Neg for SeqOp {
    type Output = SeqOp;

    fn neg(self) -> SeqOp {
        self.unary(UnaryOp::Neg)
    }
}

impl Neg for &SeqOp {
    type Output = SeqOp;

    fn neg(self) -> SeqOp {
        self.unary(UnaryOp::Neg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_does_not_evaluate() {
        // A failing map is fine to build; it only fails when bound.
        let op = tokens().map(|_| Err("boom".to_string()));
        assert!(matches!(op.kind(), SeqKind::Map { .. }));
    }

    #[test]
    fn test_leaves_are_shared() {
        assert_eq!(tokens().id(), tokens().id());
        assert_eq!(indices().id(), indices().id());
        assert_ne!(tokens().id(), indices().id());
    }

    #[test]
    fn test_name_keeps_identity() {
        let op = indices() + 1;
        let named = op.name("shifted");
        assert_eq!(op.id(), named.id());
        assert_eq!(named.label(), Some("shifted"));
        assert_eq!(op.label(), None);
        assert_eq!(named.display_name(), "shifted");
        assert_eq!(op.display_name(), format!("binary{}", op.id()));
    }

    #[test]
    fn test_scalar_lifting() {
        let op = 10i64 - indices();
        match op.kind() {
            SeqKind::Binary { op, left, .. } => {
                assert_eq!(*op, BinaryOp::Sub);
                assert!(matches!(left.kind(), SeqKind::Constant(Value::Int(10))));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_dependencies() {
        let a = indices() + tokens();
        assert_eq!(a.dependencies(), vec![indices().id(), tokens().id()]);
        let w = where_(tokens().eq('a'), &a, 0);
        assert_eq!(w.dependencies().len(), 3);
        assert_eq!(w.dependencies()[1], a.id());
    }

    #[test]
    fn test_reference_logic_operators() {
        let a = tokens().gt(0);
        let b = indices().lt(2);
        for (op, expected) in [(&a & &b, BinaryOp::And), (&a | &b, BinaryOp::Or)] {
            match op.kind() {
                SeqKind::Binary { op, left, right } => {
                    assert_eq!(*op, expected);
                    assert_eq!(left.id(), a.id());
                    assert_eq!(right.id(), b.id());
                }
                other => panic!("unexpected kind {:?}", other),
            }
        }
        assert_eq!(
            evaluate(&(&a & &b), [1, 0, 1]).unwrap(),
            vec![Value::Bool(true), Value::Bool(false), Value::Bool(false)]
        );
    }

    #[test]
    fn test_preview_uses_configured_input() {
        let op = tokens().eq('l');
        assert_eq!(
            op.preview(&Config::default()).unwrap(),
            evaluate(&op, "hello").unwrap()
        );

        let mut config = Config::default();
        config.apply_overrides(|name| (name == "RASP_PREVIEW_INPUT").then(|| "ll".to_string()));
        assert_eq!(
            op.preview(&config).unwrap(),
            vec![Value::Bool(true), Value::Bool(true)]
        );
        assert_ne!(op.preview(&config).unwrap(), op.preview(&Config::default()).unwrap());
    }

    #[test]
    fn test_long_chain_drops() {
        let mut op = indices();
        for _ in 0..100_000 {
            op = -op;
        }
        drop(op);
    }
}
