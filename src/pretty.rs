//! Pretty-printer for RASP
//!
//! Renders the AST back to source syntax for round-trip testing, shows
//! compiled expression nodes in the same syntax, and lays out traces as
//! plain-text tables.

use crate::ast::*;
use crate::eval::SelectorMatrix;
use crate::selector::{Selector, SelectorKind};
use crate::seq::{SeqKind, SeqOp};
use crate::trace::{LayerValue, Trace};
use crate::value::{format_sequence, BinaryOp, UnaryOp, Value};

// Binding strengths above the binary operators (see BinaryOp::precedence)
const UNARY: u8 = 6;
const POSTFIX: u8 = 7;
const ATOM: u8 = 8;

/// A rendered fragment with the binding strength of its outermost operator
struct Doc {
    text: String,
    prec: u8,
}

impl Doc {
    fn new(text: impl Into<String>, prec: u8) -> Self {
        Self {
            text: text.into(),
            prec,
        }
    }

    fn atom(text: impl Into<String>) -> Self {
        Self::new(text, ATOM)
    }

    /// Text, parenthesized if it binds looser than `min`
    fn at_least(self, min: u8) -> String {
        if self.prec < min {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

fn binary_doc(op: BinaryOp, lhs: Doc, rhs: Doc) -> Doc {
    let prec = op.precedence();
    // Comparisons do not chain, so neither side may be a bare comparison
    let left_min = if op.as_compare().is_some() { prec + 1 } else { prec };
    Doc::new(
        format!(
            "{} {} {}",
            lhs.at_least(left_min),
            op.symbol(),
            rhs.at_least(prec + 1)
        ),
        prec,
    )
}

fn unary_doc(op: UnaryOp, operand: Doc) -> Doc {
    Doc::new(format!("{}{}", op.symbol(), operand.at_least(UNARY)), UNARY)
}

fn call_doc(func: &str, args: Vec<Doc>) -> Doc {
    let args: Vec<String> = args.into_iter().map(|d| d.text).collect();
    Doc::atom(format!("{}({})", func, args.join(", ")))
}

pub fn escape_char(c: char) -> String {
    match c {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\t' => "'\\t'".to_string(),
        c => format!("'{}'", c),
    }
}

pub fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A scalar as it would be written in source.
pub fn value_literal(value: &Value) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::Char(c) => escape_char(*c),
        Value::Bool(b) => b.to_string(),
    }
}

// ============================================================================
// AST
// ============================================================================

fn expr_doc(expr: &Expr) -> Doc {
    match expr {
        Expr::Int(n) if *n < 0 => Doc::new(n.to_string(), UNARY),
        Expr::Int(n) => Doc::atom(n.to_string()),
        Expr::Char(c) => Doc::atom(escape_char(*c)),
        Expr::Str(s) => Doc::atom(escape_str(s)),
        Expr::Bool(b) => Doc::atom(b.to_string()),
        Expr::Var(name) => Doc::atom(name.clone()),
        Expr::Call { func, args } => {
            call_doc(func, args.iter().map(|a| expr_doc(&a.node)).collect())
        }
        Expr::Method {
            receiver,
            method,
            args,
        } => {
            let args: Vec<String> = args.iter().map(|a| expr_doc(&a.node).text).collect();
            Doc::new(
                format!(
                    "{}.{}({})",
                    expr_doc(&receiver.node).at_least(POSTFIX),
                    method,
                    args.join(", ")
                ),
                POSTFIX,
            )
        }
        Expr::Unary { op, operand } => unary_doc(*op, expr_doc(&operand.node)),
        Expr::Binary { op, lhs, rhs } => binary_doc(*op, expr_doc(&lhs.node), expr_doc(&rhs.node)),
    }
}

/// Render an expression in source syntax, with only the parentheses needed.
pub fn pretty_expr(expr: &Expr) -> String {
    expr_doc(expr).text
}

/// A pretty-printer accumulating a whole program
#[derive(Default)]
pub struct Pretty {
    output: String,
}

impl Pretty {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn writeln(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }

    pub fn program(&mut self, program: &Program) {
        for stmt in &program.statements {
            self.statement(&stmt.node);
        }
    }

    pub fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Let { name, value } => {
                self.write("let ");
                self.write(name);
                self.write(" = ");
                self.write(&pretty_expr(&value.node));
                self.writeln(";");
            }
            Statement::Expr(expr) => {
                self.write(&pretty_expr(&expr.node));
                self.writeln(";");
            }
        }
    }
}

/// Convenience function to pretty-print a program
pub fn pretty_print(program: &Program) -> String {
    let mut p = Pretty::new();
    p.program(program);
    p.finish()
}

// ============================================================================
// Expression nodes
// ============================================================================

// Labelled children print as their label; the root is always expanded.

fn seq_doc(op: &SeqOp, root: bool) -> Doc {
    if let (false, Some(label)) = (root, op.label()) {
        return Doc::atom(label);
    }
    match op.kind() {
        SeqKind::Tokens => Doc::atom("tokens"),
        SeqKind::Indices => Doc::atom("indices"),
        SeqKind::Constant(Value::Int(n)) if *n < 0 => Doc::new(n.to_string(), UNARY),
        SeqKind::Constant(v) => Doc::atom(value_literal(v)),
        SeqKind::Map { inner, name, .. } => call_doc(name, vec![seq_doc(inner, false)]),
        SeqKind::Unary { op, inner } => unary_doc(*op, seq_doc(inner, false)),
        SeqKind::Binary { op, left, right } => {
            binary_doc(*op, seq_doc(left, false), seq_doc(right, false))
        }
        SeqKind::Where {
            cond,
            then,
            otherwise,
        } => call_doc(
            "where",
            vec![
                seq_doc(cond, false),
                seq_doc(then, false),
                seq_doc(otherwise, false),
            ],
        ),
        SeqKind::Aggregate {
            selector,
            value,
            default,
        } => {
            let receiver = selector_doc(selector, false).at_least(POSTFIX);
            let value = seq_doc(value, false).text;
            let text = if *default == Value::Int(0) {
                format!("{}.value({})", receiver, value)
            } else {
                format!("{}.value({}, {})", receiver, value, value_literal(default))
            };
            Doc::new(text, POSTFIX)
        }
    }
}

fn selector_doc(sel: &Selector, root: bool) -> Doc {
    if let (false, Some(label)) = (root, sel.label()) {
        return Doc::atom(label);
    }
    match sel.kind() {
        SelectorKind::Compare { key, query, op } => binary_doc(
            BinaryOp::from(*op),
            call_doc("key", vec![seq_doc(key, false)]),
            call_doc("query", vec![seq_doc(query, false)]),
        ),
        SelectorKind::Combine { op, left, right } => {
            let op = match op {
                crate::selector::BoolOp::And => BinaryOp::And,
                crate::selector::BoolOp::Or => BinaryOp::Or,
            };
            binary_doc(op, selector_doc(left, false), selector_doc(right, false))
        }
        SelectorKind::Not(inner) => unary_doc(UnaryOp::Not, selector_doc(inner, false)),
    }
}

/// Render a sequence node in source syntax.
pub fn pretty_seq(op: &SeqOp) -> String {
    seq_doc(op, true).text
}

/// Render a selector node in source syntax.
pub fn pretty_selector(sel: &Selector) -> String {
    selector_doc(sel, true).text
}

// ============================================================================
// Values and traces
// ============================================================================

/// Render a selector matrix, one query row per line (`1` = selected).
pub fn format_matrix(matrix: &SelectorMatrix) -> String {
    let mut out = String::new();
    for row in matrix.rows() {
        let cells: Vec<&str> = row.iter().map(|&hit| if hit { "1" } else { "." }).collect();
        out.push_str(&cells.join(" "));
        out.push('\n');
    }
    out
}

fn layer_value_summary(value: &LayerValue) -> String {
    match value {
        LayerValue::Sequence(values) => format_sequence(values),
        LayerValue::Selector(matrix) => {
            let counts: Vec<String> = (0..matrix.len())
                .map(|q| matrix.count(q).to_string())
                .collect();
            format!("selects [{}]", counts.join(", "))
        }
    }
}

fn write_row(out: &mut String, cells: &[&str], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{:<width$}", c, width = *w))
        .collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
}

/// Render a trace as a table: one line per layer, in evaluation order.
pub fn format_trace(trace: &Trace) -> String {
    let rows: Vec<[String; 4]> = trace
        .layers()
        .map(|layer| {
            [
                layer.display_name(),
                layer.role.as_str().to_string(),
                layer.depth.to_string(),
                layer_value_summary(&layer.value),
            ]
        })
        .collect();

    let headers = ["layer", "role", "depth", "value"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    write_row(&mut out, &headers, &widths);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        write_row(&mut out, &cells, &widths);
    }
    out.push_str(&format!(
        "{} layers, attention depth {}\n",
        trace.len(),
        trace.attention_layers()
    ));
    out
}

// Round-trip tests live in tests/unit_pretty.rs
