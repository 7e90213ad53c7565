//! Layer traces for inspection and visualization.
//!
//! A trace records every distinct node touched while evaluating one
//! top-level expression against one input, in the order nodes were first
//! computed (post-order, so children always precede their parents). It is
//! built by an [`Observer`] plugged into the ordinary [`Evaluator`]; tracing
//! never changes results.
//!
//! Each layer carries a role for renderers (input, feed-forward, attention,
//! output) and an attention depth: the number of aggregation steps on the
//! longest path from the input, i.e. how many Transformer layers the value
//! needs.

use indexmap::IndexMap;

use crate::eval::{EvalResult, Evaluator, Observer, SelectorMatrix};
use crate::selector::Selector;
use crate::seq::{NodeId, SeqKind, SeqOp};
use crate::value::{IntoInput, Value};

/// What part of a Transformer a layer corresponds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Tokens, indices and constants
    Input,
    /// Elementwise (feed-forward) computation
    Ffn,
    /// Selectors and aggregations
    Attention,
    /// The traced expression itself
    Output,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Input => "input",
            Role::Ffn => "ffn",
            Role::Attention => "attention",
            Role::Output => "output",
        }
    }
}

/// Concrete value of a layer.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerValue {
    Sequence(Vec<Value>),
    Selector(SelectorMatrix),
}

/// One recorded node.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub id: NodeId,
    pub label: Option<String>,
    /// Structural tag, e.g. `map` or `select`
    pub kind: &'static str,
    pub role: Role,
    /// Attention steps needed to compute this node
    pub depth: usize,
    pub value: LayerValue,
}

impl Layer {
    /// The label if set, otherwise `kind#id`.
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("{}{}", self.kind, self.id),
        }
    }

    pub fn sequence(&self) -> Option<&[Value]> {
        match &self.value {
            LayerValue::Sequence(values) => Some(values),
            LayerValue::Selector(_) => None,
        }
    }

    pub fn matrix(&self) -> Option<&SelectorMatrix> {
        match &self.value {
            LayerValue::Selector(matrix) => Some(matrix),
            LayerValue::Sequence(_) => None,
        }
    }
}

/// Ordered record of an evaluation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trace {
    layers: IndexMap<NodeId, Layer>,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    /// Layers in first-computed order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    /// Position of a node in the trace order.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.layers.get_index_of(&id)
    }

    /// The traced expression (always last).
    pub fn output(&self) -> Option<&Layer> {
        self.layers.last().map(|(_, layer)| layer)
    }

    /// Attention depth of the whole computation.
    pub fn attention_layers(&self) -> usize {
        self.output().map_or(0, |layer| layer.depth)
    }

    /// Number of aggregation nodes.
    pub fn attention_count(&self) -> usize {
        self.layers
            .values()
            .filter(|layer| layer.kind == "aggregate")
            .count()
    }

    /// Display names in trace order.
    pub fn names(&self) -> Vec<String> {
        self.layers.values().map(Layer::display_name).collect()
    }

    fn depth_of(&self, deps: &[NodeId]) -> usize {
        deps.iter()
            .filter_map(|id| self.layers.get(id))
            .map(|layer| layer.depth)
            .max()
            .unwrap_or(0)
    }

    fn mark_output(&mut self) {
        if let Some((_, layer)) = self.layers.last_mut() {
            layer.role = Role::Output;
        }
    }
}

struct Recorder {
    trace: Trace,
}

impl Observer for Recorder {
    fn on_sequence(&mut self, op: &SeqOp, values: &[Value]) {
        let deps = op.dependencies();
        let below = self.trace.depth_of(&deps);
        let (role, depth) = match op.kind() {
            SeqKind::Tokens | SeqKind::Indices | SeqKind::Constant(_) => (Role::Input, 0),
            SeqKind::Aggregate { .. } => (Role::Attention, below + 1),
            _ => (Role::Ffn, below),
        };
        self.trace.layers.insert(
            op.id(),
            Layer {
                id: op.id(),
                label: op.label().map(String::from),
                kind: op.kind().tag(),
                role,
                depth,
                value: LayerValue::Sequence(values.to_vec()),
            },
        );
    }

    fn on_selector(&mut self, selector: &Selector, matrix: &SelectorMatrix) {
        let depth = self.trace.depth_of(&selector.dependencies());
        self.trace.layers.insert(
            selector.id(),
            Layer {
                id: selector.id(),
                label: selector.label().map(String::from),
                kind: selector.kind().tag(),
                role: Role::Attention,
                depth,
                value: LayerValue::Selector(matrix.clone()),
            },
        );
    }
}

/// Evaluate `op` and record every layer.
pub fn trace_evaluate(op: &SeqOp, input: impl IntoInput) -> EvalResult<(Vec<Value>, Trace)> {
    let mut recorder = Recorder {
        trace: Trace::default(),
    };
    let values = {
        let mut evaluator = Evaluator::with_observer(input, &mut recorder);
        log::debug!("tracing {} on input of length {}", op.display_name(), evaluator.len());
        evaluator.sequence(op)?.to_vec()
    };
    recorder.trace.mark_output();
    Ok((values, recorder.trace))
}

/// Evaluate `selector` and record every layer.
pub fn trace_evaluate_selector(
    selector: &Selector,
    input: impl IntoInput,
) -> EvalResult<(SelectorMatrix, Trace)> {
    let mut recorder = Recorder {
        trace: Trace::default(),
    };
    let matrix = {
        let mut evaluator = Evaluator::with_observer(input, &mut recorder);
        log::debug!("tracing {} on input of length {}", selector.display_name(), evaluator.len());
        (*evaluator.selector(selector)?).clone()
    };
    recorder.trace.mark_output();
    Ok((matrix, recorder.trace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::evaluate;
    use crate::selector::{key, query};
    use crate::seq::{indices, tokens};

    #[test]
    fn test_trace_is_post_order() {
        let doubled = (tokens() * 2).name("doubled");
        let out = (&doubled + &indices()).name("out");
        let (values, trace) = trace_evaluate(&out, [1, 2]).unwrap();

        assert_eq!(values, vec![Value::Int(2), Value::Int(5)]);
        let tokens_at = trace.position(tokens().id()).unwrap();
        let doubled_at = trace.position(doubled.id()).unwrap();
        let out_at = trace.position(out.id()).unwrap();
        assert!(tokens_at < doubled_at && doubled_at < out_at);
        assert_eq!(trace.output().unwrap().label.as_deref(), Some("out"));
        assert_eq!(trace.output().unwrap().role, Role::Output);
        assert_eq!(trace.get(doubled.id()).unwrap().role, Role::Ffn);
        assert_eq!(trace.get(tokens().id()).unwrap().role, Role::Input);
    }

    #[test]
    fn test_trace_matches_evaluate() {
        let op = key(indices()).lt(&query(indices())).value(tokens());
        let (traced, trace) = trace_evaluate(&op, [3, 1, 4]).unwrap();
        assert_eq!(traced, evaluate(&op, [3, 1, 4]).unwrap());
        assert_eq!(trace.attention_layers(), 1);
        assert_eq!(trace.attention_count(), 1);
    }

    #[test]
    fn test_first_label_wins() {
        let x = indices() + 1;
        let op = x.name("a") * x.name("b");
        let (values, trace) = trace_evaluate(&op, "ab").unwrap();
        assert_eq!(values, vec![Value::Int(1), Value::Int(4)]);
        assert_eq!(trace.layers().filter(|l| l.id == x.id()).count(), 1);
        assert_eq!(trace.get(x.id()).unwrap().label.as_deref(), Some("a"));
        assert!(!trace.names().contains(&"b".to_string()));
    }

    #[test]
    fn test_shared_nodes_recorded_once() {
        let shared = indices() + 1;
        let op = &shared * &shared;
        let (_, trace) = trace_evaluate(&op, "ab").unwrap();
        let count = trace.layers().filter(|l| l.id == shared.id()).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_selector_trace() {
        let sel = key(tokens()).eq(&query('a')).name("is_a");
        let (matrix, trace) = trace_evaluate_selector(&sel, "ab").unwrap();
        assert!(matrix.get(1, 0));
        assert!(!matrix.get(1, 1));
        let out = trace.output().unwrap();
        assert_eq!(out.display_name(), "is_a");
        assert_eq!(out.matrix(), Some(&matrix));
    }
}
