//! Selectors: symbolic n×n relations between query and key positions.
//!
//! A selector is formed by comparing a [`Key`] with a [`Query`]. The key
//! expression is laid out along the key axis (columns) and the query
//! expression along the query axis (rows), so entry `(q, k)` is
//! `key[k] op query[q]`. Both may come from the same `SeqOp`; the role tags
//! are what tell the axes apart.
//!
//! Selectors compose with `&`, `|` and `!`, and turn back into sequences
//! through aggregation ([`Selector::value`]).

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::rc::Rc;

use crate::seq::{NodeId, SeqKind, SeqOp};
use crate::value::{CompareOp, Value};

/// An expression playing the key role (columns).
#[derive(Clone, Debug)]
pub struct Key(SeqOp);

/// An expression playing the query role (rows).
#[derive(Clone, Debug)]
pub struct Query(SeqOp);

/// Tag an expression (or scalar) as the key side of a comparison.
pub fn key(expr: impl Into<SeqOp>) -> Key {
    Key(expr.into())
}

/// Tag an expression (or scalar) as the query side of a comparison.
pub fn query(expr: impl Into<SeqOp>) -> Query {
    Query(expr.into())
}

impl Key {
    pub fn expr(&self) -> &SeqOp {
        &self.0
    }

    /// Selector with entry `(q, k) = key[k] op query[q]`.
    pub fn compare(&self, op: CompareOp, query: &Query) -> Selector {
        Selector::new(SelectorKind::Compare {
            key: self.0.clone(),
            query: query.0.clone(),
            op,
        })
    }

    pub fn eq(&self, query: &Query) -> Selector {
        self.compare(CompareOp::Eq, query)
    }

    pub fn ne(&self, query: &Query) -> Selector {
        self.compare(CompareOp::Ne, query)
    }

    pub fn lt(&self, query: &Query) -> Selector {
        self.compare(CompareOp::Lt, query)
    }

    pub fn le(&self, query: &Query) -> Selector {
        self.compare(CompareOp::Le, query)
    }

    pub fn gt(&self, query: &Query) -> Selector {
        self.compare(CompareOp::Gt, query)
    }

    pub fn ge(&self, query: &Query) -> Selector {
        self.compare(CompareOp::Ge, query)
    }
}

impl Query {
    pub fn expr(&self) -> &SeqOp {
        &self.0
    }
}

/// Boolean connectives between selectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BoolOp::And => "&",
            BoolOp::Or => "|",
        }
    }

    pub fn apply(self, a: bool, b: bool) -> bool {
        match self {
            BoolOp::And => a && b,
            BoolOp::Or => a || b,
        }
    }
}

/// The relation described by a selector node.
#[derive(Clone, Debug)]
pub enum SelectorKind {
    Compare {
        key: SeqOp,
        query: SeqOp,
        op: CompareOp,
    },
    Combine {
        op: BoolOp,
        left: Selector,
        right: Selector,
    },
    Not(Selector),
}

impl SelectorKind {
    pub fn tag(&self) -> &'static str {
        match self {
            SelectorKind::Compare { .. } => "select",
            SelectorKind::Combine { op: BoolOp::And, .. } => "and",
            SelectorKind::Combine { op: BoolOp::Or, .. } => "or",
            SelectorKind::Not(_) => "not",
        }
    }
}

struct SelectorNode {
    id: NodeId,
    label: Option<String>,
    kind: SelectorKind,
}

/// Handle to an immutable selector node.
#[derive(Clone)]
pub struct Selector(Rc<SelectorNode>);

impl Selector {
    pub(crate) fn new(kind: SelectorKind) -> Self {
        Selector(Rc::new(SelectorNode {
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

    pub fn kind(&self) -> &SelectorKind {
        &self.0.kind
    }

    pub fn display_name(&self) -> String {
        match self.label() {
            Some(label) => label.to_string(),
            None => format!("{}{}", self.kind().tag(), self.id()),
        }
    }

    /// Attach a display label, keeping the node identity. As with
    /// [`SeqOp::name`], a trace shows the first label it reaches.
    pub fn name(&self, label: impl Into<String>) -> Selector {
        Selector(Rc::new(SelectorNode {
            id: self.0.id,
            label: Some(label.into()),
            kind: self.0.kind.clone(),
        }))
    }

    pub fn dependencies(&self) -> Vec<NodeId> {
        match self.kind() {
            SelectorKind::Compare { key, query, .. } => vec![key.id(), query.id()],
            SelectorKind::Combine { left, right, .. } => vec![left.id(), right.id()],
            SelectorKind::Not(inner) => vec![inner.id()],
        }
    }

    pub fn combine(&self, op: BoolOp, other: &Selector) -> Selector {
        Selector::new(SelectorKind::Combine {
            op,
            left: self.clone(),
            right: other.clone(),
        })
    }

    pub fn negate(&self) -> Selector {
        Selector::new(SelectorKind::Not(self.clone()))
    }

    /// Aggregate `value` over the selected keys, with default 0 for rows
    /// that select nothing.
    pub fn value(&self, value: impl Into<SeqOp>) -> SeqOp {
        self.value_or(value, 0)
    }

    /// Aggregate `value` over the selected keys.
    ///
    /// At query position q the result is the sum of `value[k]` over every
    /// key k selected by row q. A row that selects nothing yields `default`,
    /// which is distinct from a selection that happens to sum to zero.
    pub fn value_or(&self, value: impl Into<SeqOp>, default: impl Into<Value>) -> SeqOp {
        SeqOp::new(SeqKind::Aggregate {
            selector: self.clone(),
            value: value.into(),
            default: default.into(),
        })
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Selector");
        s.field("id", &self.0.id);
        if let Some(label) = &self.0.label {
            s.field("label", label);
        }
        s.field("kind", &self.0.kind).finish()
    }
}

impl BitAnd for Selector {
    type Output = Selector;

    fn bitand(self, rhs: Selector) -> Selector {
        self.combine(BoolOp::And, &rhs)
    }
}

impl BitAnd<&Selector> for &Selector {
    type Output = Selector;

    fn bitand(self, rhs: &Selector) -> Selector {
        self.combine(BoolOp::And, rhs)
    }
}

impl BitOr for Selector {
    type Output = Selector;

    fn bitor(self, rhs: Selector) -> Selector {
        self.combine(BoolOp::Or, &rhs)
    }
}

impl BitOr<&Selector> for &Selector {
    type Output = Selector;

    fn bitor(self, rhs: &Selector) -> Selector {
        self.combine(BoolOp::Or, rhs)
    }
}

impl Not for Selector {
    type Output = Selector;

    fn not(self) -> Selector {
        self.negate()
    }
}

impl Not for &Selector {
    type Output = Selector;

    fn not(self) -> Selector {
        self.negate()
    }
}
