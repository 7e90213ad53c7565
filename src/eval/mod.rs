//! Evaluation of sequence operations and selectors against a bound input.
//!
//! An [`Evaluator`] is bound to exactly one input sequence, which fixes the
//! length n for every node it computes. It walks the expression DAG
//! bottom-up and memoizes each node by [`NodeId`], so a sub-expression
//! reachable along several paths is computed once. The cache lives and dies
//! with the evaluator: binding the same expression to another input starts
//! from scratch.
//!
//! The walk keeps its own work stack, so arbitrarily deep compositions
//! evaluate without growing the call stack.
//!
//! Sequences evaluate to n values; selectors evaluate to an n×n
//! [`SelectorMatrix`]. An optional [`Observer`] sees every node exactly once,
//! right after it is computed, which is how [`crate::trace`] records layers
//! without duplicating any evaluation logic.

mod error;

pub use error::{EvalError, EvalErrorKind, EvalResult, NodeRef};

use std::collections::HashMap;
use std::rc::Rc;

use crate::selector::{Selector, SelectorKind};
use crate::seq::{NodeId, SeqKind, SeqOp};
use crate::value::{IntoInput, Value};

/// A concrete selector: one boolean per (query, key) pair, row-major by query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorMatrix {
    n: usize,
    cells: Vec<bool>,
}

impl SelectorMatrix {
    pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut cells = Vec::with_capacity(n * n);
        for q in 0..n {
            for k in 0..n {
                cells.push(f(q, k));
            }
        }
        Self { n, cells }
    }

    /// Side length n.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Whether query position `q` selects key position `k`.
    pub fn get(&self, q: usize, k: usize) -> bool {
        self.cells[q * self.n + k]
    }

    /// The keys selected by query position `q`.
    pub fn row(&self, q: usize) -> &[bool] {
        &self.cells[q * self.n..(q + 1) * self.n]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        // chunks(0) panics, and an empty matrix has no rows anyway
        self.cells.chunks(self.n.max(1))
    }

    /// Number of keys selected by query position `q`.
    pub fn count(&self, q: usize) -> usize {
        self.row(q).iter().filter(|&&b| b).count()
    }
}

/// Hook invoked once per distinct node, after its value is computed.
pub trait Observer {
    fn on_sequence(&mut self, _op: &SeqOp, _values: &[Value]) {}

    fn on_selector(&mut self, _selector: &Selector, _matrix: &SelectorMatrix) {}
}

/// Memoizing evaluator bound to one input sequence.
pub struct Evaluator<'a> {
    input: Vec<Value>,
    sequences: HashMap<NodeId, Rc<[Value]>>,
    selectors: HashMap<NodeId, Rc<SelectorMatrix>>,
    observer: Option<&'a mut dyn Observer>,
}

impl<'a> Evaluator<'a> {
    pub fn new(input: impl IntoInput) -> Self {
        Self {
            input: input.into_input(),
            sequences: HashMap::new(),
            selectors: HashMap::new(),
            observer: None,
        }
    }

    pub fn with_observer(input: impl IntoInput, observer: &'a mut dyn Observer) -> Self {
        Self {
            observer: Some(observer),
            ..Self::new(input)
        }
    }

    /// The bound input.
    pub fn input(&self) -> &[Value] {
        &self.input
    }

    /// The bound length n.
    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Number of distinct nodes computed so far.
    pub fn cached_nodes(&self) -> usize {
        self.sequences.len() + self.selectors.len()
    }

    /// Evaluate a sequence operation to n values.
    pub fn sequence(&mut self, op: &SeqOp) -> EvalResult<Rc<[Value]>> {
        if !self.sequences.contains_key(&op.id()) {
            self.run(Node::Seq(op.clone()))?;
        }
        Ok(self.sequences[&op.id()].clone())
    }

    /// Evaluate a selector to an n×n matrix.
    pub fn selector(&mut self, selector: &Selector) -> EvalResult<Rc<SelectorMatrix>> {
        if !self.selectors.contains_key(&selector.id()) {
            self.run(Node::Selector(selector.clone()))?;
        }
        Ok(self.selectors[&selector.id()].clone())
    }

    fn is_cached(&self, node: &Node) -> bool {
        match node {
            Node::Seq(op) => self.sequences.contains_key(&op.id()),
            Node::Selector(sel) => self.selectors.contains_key(&sel.id()),
        }
    }

    /// Post-order walk with an explicit work stack, so the depth of the
    /// expression graph never reaches the call stack. On success `root` and
    /// every node below it are cached.
    fn run(&mut self, root: Node) -> EvalResult<()> {
        let mut stack = vec![Task::Visit(root)];
        while let Some(task) = stack.pop() {
            match task {
                Task::Visit(node) => {
                    if self.is_cached(&node) {
                        continue;
                    }
                    let children = node.children();
                    stack.push(Task::Compute(node));
                    // leftmost child on top, so operands are computed in order
                    stack.extend(children.into_iter().rev().map(Task::Visit));
                }
                Task::Compute(node) => {
                    if self.is_cached(&node) {
                        continue;
                    }
                    match node {
                        Node::Seq(op) => self.compute_sequence(&op)?,
                        Node::Selector(sel) => self.compute_selector(&sel)?,
                    }
                }
            }
        }
        Ok(())
    }

    // Children are always computed before their parent, so the lookups
    // below never miss.

    fn computed_sequence(&self, op: &SeqOp) -> Rc<[Value]> {
        self.sequences[&op.id()].clone()
    }

    fn computed_selector(&self, selector: &Selector) -> Rc<SelectorMatrix> {
        self.selectors[&selector.id()].clone()
    }

    fn compute_sequence(&mut self, op: &SeqOp) -> EvalResult<()> {
        let n = self.len();
        let values: Vec<Value> = match op.kind() {
            SeqKind::Tokens => self.input.clone(),
            SeqKind::Indices => (0..n).map(|i| Value::Int(i as i64)).collect(),
            SeqKind::Constant(v) => vec![*v; n],
            SeqKind::Map { inner, name, func } => {
                let xs = self.computed_sequence(inner);
                xs.iter()
                    .map(|x| {
                        func(x).map_err(|message| {
                            EvalError::new(
                                NodeRef::of_seq(op),
                                EvalErrorKind::Mapping {
                                    function: name.clone(),
                                    value: *x,
                                    message,
                                },
                            )
                        })
                    })
                    .collect::<EvalResult<_>>()?
            }
            SeqKind::Unary { op: unary, inner } => {
                let xs = self.computed_sequence(inner);
                xs.iter()
                    .map(|&x| unary.apply(x).map_err(|e| EvalError::new(NodeRef::of_seq(op), e)))
                    .collect::<EvalResult<_>>()?
            }
            SeqKind::Binary {
                op: binary,
                left,
                right,
            } => {
                let ls = self.computed_sequence(left);
                let rs = self.computed_sequence(right);
                ls.iter()
                    .zip(rs.iter())
                    .map(|(&l, &r)| {
                        binary
                            .apply(l, r)
                            .map_err(|e| EvalError::new(NodeRef::of_seq(op), e))
                    })
                    .collect::<EvalResult<_>>()?
            }
            SeqKind::Where {
                cond,
                then,
                otherwise,
            } => {
                let cs = self.computed_sequence(cond);
                let ts = self.computed_sequence(then);
                let os = self.computed_sequence(otherwise);
                cs.iter()
                    .zip(ts.iter().zip(os.iter()))
                    .map(|(c, (&t, &o))| match c.truthy() {
                        Some(true) => Ok(t),
                        Some(false) => Ok(o),
                        None => Err(EvalError::new(
                            NodeRef::of_seq(op),
                            EvalErrorKind::TypeMismatch {
                                op: "where",
                                left: c.kind(),
                                right: None,
                            },
                        )),
                    })
                    .collect::<EvalResult<_>>()?
            }
            SeqKind::Aggregate {
                selector,
                value,
                default,
            } => {
                let matrix = self.computed_selector(selector);
                let vs = self.computed_sequence(value);
                (0..n)
                    .map(|q| {
                        aggregate_row(matrix.row(q), &vs, *default).map_err(|message| {
                            EvalError::new(
                                NodeRef::of_seq(op),
                                EvalErrorKind::AggregationType {
                                    position: q,
                                    message,
                                },
                            )
                        })
                    })
                    .collect::<EvalResult<_>>()?
            }
        };

        if values.len() != n {
            log::warn!("{} produced {} values for input of length {}", op.display_name(), values.len(), n);
            return Err(EvalError::new(
                NodeRef::of_seq(op),
                EvalErrorKind::Length {
                    expected: n,
                    actual: values.len(),
                },
            ));
        }

        log::trace!("computed {} = {:?}", op.display_name(), values);
        if let Some(observer) = self.observer.as_mut() {
            observer.on_sequence(op, &values);
        }

        self.sequences.insert(op.id(), values.into());
        Ok(())
    }

    fn compute_selector(&mut self, selector: &Selector) -> EvalResult<()> {
        let n = self.len();
        let matrix = match selector.kind() {
            SelectorKind::Compare { key, query, op } => {
                let keys = self.computed_sequence(key);
                let queries = self.computed_sequence(query);
                let mut cells = Vec::with_capacity(n * n);
                for q in 0..n {
                    for k in 0..n {
                        let cell = op
                            .apply(keys[k], queries[q])
                            .map_err(|e| EvalError::new(NodeRef::of_selector(selector), e))?;
                        cells.push(cell);
                    }
                }
                SelectorMatrix { n, cells }
            }
            SelectorKind::Combine { op, left, right } => {
                let a = self.computed_selector(left);
                let b = self.computed_selector(right);
                SelectorMatrix {
                    n,
                    cells: a
                        .cells
                        .iter()
                        .zip(b.cells.iter())
                        .map(|(&x, &y)| op.apply(x, y))
                        .collect(),
                }
            }
            SelectorKind::Not(inner) => {
                let a = self.computed_selector(inner);
                SelectorMatrix {
                    n,
                    cells: a.cells.iter().map(|&x| !x).collect(),
                }
            }
        };

        if matrix.n != n || matrix.cells.len() != n * n {
            log::warn!("{} produced a malformed {}-cell matrix", selector.display_name(), matrix.cells.len());
            return Err(EvalError::new(
                NodeRef::of_selector(selector),
                EvalErrorKind::Length {
                    expected: n * n,
                    actual: matrix.cells.len(),
                },
            ));
        }

        log::trace!("computed {}", selector.display_name());
        if let Some(observer) = self.observer.as_mut() {
            observer.on_selector(selector, &matrix);
        }

        self.selectors.insert(selector.id(), Rc::new(matrix));
        Ok(())
    }
}

/// A node of either kind.
#[derive(Clone)]
enum Node {
    Seq(SeqOp),
    Selector(Selector),
}

impl Node {
    /// Operands, in evaluation order.
    fn children(&self) -> Vec<Node> {
        match self {
            Node::Seq(op) => match op.kind() {
                SeqKind::Tokens | SeqKind::Indices | SeqKind::Constant(_) => vec![],
                SeqKind::Map { inner, .. } | SeqKind::Unary { inner, .. } => {
                    vec![Node::Seq(inner.clone())]
                }
                SeqKind::Binary { left, right, .. } => {
                    vec![Node::Seq(left.clone()), Node::Seq(right.clone())]
                }
                SeqKind::Where {
                    cond,
                    then,
                    otherwise,
                } => vec![
                    Node::Seq(cond.clone()),
                    Node::Seq(then.clone()),
                    Node::Seq(otherwise.clone()),
                ],
                SeqKind::Aggregate {
                    selector, value, ..
                } => vec![Node::Selector(selector.clone()), Node::Seq(value.clone())],
            },
            Node::Selector(sel) => match sel.kind() {
                SelectorKind::Compare { key, query, .. } => {
                    vec![Node::Seq(key.clone()), Node::Seq(query.clone())]
                }
                SelectorKind::Combine { left, right, .. } => {
                    vec![Node::Selector(left.clone()), Node::Selector(right.clone())]
                }
                SelectorKind::Not(inner) => vec![Node::Selector(inner.clone())],
            },
        }
    }
}

enum Task {
    /// Schedule the node's missing operands, then the node itself
    Visit(Node),
    /// Every operand is cached
    Compute(Node),
}

/// Combine the values selected by one query row.
///
/// Numbers (ints and booleans) sum to an int. A single selected char is
/// passed through unchanged, which is how tokens are moved between
/// positions. Anything else has no defined sum.
fn aggregate_row(row: &[bool], values: &[Value], default: Value) -> Result<Value, String> {
    let selected: Vec<Value> = row
        .iter()
        .zip(values)
        .filter(|(hit, _)| **hit)
        .map(|(_, v)| *v)
        .collect();

    match selected.as_slice() {
        [] => Ok(default),
        [only @ Value::Char(_)] => Ok(*only),
        many => {
            let mut sum: i64 = 0;
            for v in many {
                match v.as_number() {
                    Some(x) => sum = sum.wrapping_add(x),
                    None => {
                        return Err(format!(
                            "{} values selected, including {} '{}' which has no sum",
                            many.len(),
                            v.kind(),
                            v
                        ))
                    }
                }
            }
            Ok(Value::Int(sum))
        }
    }
}

/// Evaluate a sequence operation against `input`.
pub fn evaluate(op: &SeqOp, input: impl IntoInput) -> EvalResult<Vec<Value>> {
    let mut evaluator = Evaluator::new(input);
    log::debug!("evaluating {} on input of length {}", op.display_name(), evaluator.len());
    Ok(evaluator.sequence(op)?.to_vec())
}

/// Evaluate a selector against `input`.
pub fn evaluate_selector(selector: &Selector, input: impl IntoInput) -> EvalResult<SelectorMatrix> {
    let mut evaluator = Evaluator::new(input);
    log::debug!("evaluating {} on input of length {}", selector.display_name(), evaluator.len());
    Ok((*evaluator.selector(selector)?).clone())
}
