//! Evaluation error types.

use std::fmt;

use crate::selector::Selector;
use crate::seq::{NodeId, SeqOp};
use crate::value::{Value, ValueError, ValueKind};

/// The node an evaluation error is attributed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRef {
    pub id: NodeId,
    pub label: Option<String>,
    /// Structural tag such as `map` or `aggregate`
    pub kind: &'static str,
}

impl NodeRef {
    pub fn of_seq(op: &SeqOp) -> Self {
        Self {
            id: op.id(),
            label: op.label().map(String::from),
            kind: op.kind().tag(),
        }
    }

    pub fn of_selector(selector: &Selector) -> Self {
        Self {
            id: selector.id(),
            label: selector.label().map(String::from),
            kind: selector.kind().tag(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "'{}' ({}{})", label, self.kind, self.id),
            None => write!(f, "{}{}", self.kind, self.id),
        }
    }
}

/// What went wrong.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Operands whose kinds cannot be reconciled
    TypeMismatch {
        op: &'static str,
        left: ValueKind,
        right: Option<ValueKind>,
    },
    /// A user map function rejected an element
    Mapping {
        function: String,
        value: Value,
        message: String,
    },
    /// Aggregation over values that have no sum
    AggregationType { position: usize, message: String },
    DivisionByZero { op: &'static str },
    /// A node produced the wrong number of elements. Indicates an engine bug.
    Length { expected: usize, actual: usize },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalErrorKind::TypeMismatch {
                op,
                left,
                right: Some(right),
            } => write!(f, "type mismatch: cannot apply '{}' to {} and {}", op, left, right),
            EvalErrorKind::TypeMismatch {
                op,
                left,
                right: None,
            } => write!(f, "type mismatch: cannot apply '{}' to {}", op, left),
            EvalErrorKind::Mapping {
                function,
                value,
                message,
            } => write!(f, "mapping '{}' failed on '{}': {}", function, value, message),
            EvalErrorKind::AggregationType { position, message } => {
                write!(f, "cannot aggregate at position {}: {}", position, message)
            }
            EvalErrorKind::DivisionByZero { op } => write!(f, "division by zero in '{}'", op),
            EvalErrorKind::Length { expected, actual } => write!(
                f,
                "length invariant violated: expected {} elements, got {}",
                expected, actual
            ),
        }
    }
}

impl From<ValueError> for EvalErrorKind {
    fn from(err: ValueError) -> Self {
        match err {
            ValueError::TypeMismatch { op, left, right } => {
                EvalErrorKind::TypeMismatch { op, left, right }
            }
            ValueError::DivisionByZero { op } => EvalErrorKind::DivisionByZero { op },
        }
    }
}

/// An evaluation failure, attributed to the deepest failing node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub node: NodeRef,
    pub kind: EvalErrorKind,
}

impl EvalError {
    pub fn new(node: NodeRef, kind: impl Into<EvalErrorKind>) -> Self {
        Self {
            node,
            kind: kind.into(),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in {}: {}", self.node, self.kind)
    }
}

impl std::error::Error for EvalError {}

pub type EvalResult<T> = Result<T, EvalError>;
