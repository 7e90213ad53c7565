//! Compilation from the surface AST to expression nodes
//!
//! Every expression compiles to a [`Term`]: a sequence, a selector, one of
//! the two role tags, or a bare string (only meaningful as a `.name()`
//! argument). Scalar literals become constant sequences and are turned back
//! into scalars where a library function needs one.

use std::fmt;

use indexmap::IndexMap;

use crate::ast::{Expr, Program, Span, Spanned, Statement};
use crate::library;
use crate::selector::{key, query, BoolOp, Key, Query, Selector};
use crate::seq::{constant, indices, tokens, where_, SeqKind, SeqOp};
use crate::value::{BinaryOp, UnaryOp, Value};

/// A compiled expression.
#[derive(Clone, Debug)]
pub enum Term {
    Seq(SeqOp),
    Key(Key),
    Query(Query),
    Selector(Selector),
    Str(String),
}

impl Term {
    /// What kind of term this is, for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Term::Seq(_) => "sequence",
            Term::Key(_) => "key",
            Term::Query(_) => "query",
            Term::Selector(_) => "selector",
            Term::Str(_) => "string",
        }
    }
}

/// Variable bindings, in definition order.
pub type Bindings = IndexMap<String, Term>;

/// Error from compiling a syntactically valid program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    pub message: String,
    pub span: Span,
}

impl CompileError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {}..{})", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for CompileError {}

type CompileResult<T> = Result<T, CompileError>;

/// Names that resolve without a binding.
pub const BUILTINS: &[&str] = &[
    "tokens", "indices", "key", "query", "where", "atoi", "length", "flip", "cumsum", "index",
    "shift", "ralign", "split", "minimum", "min", "first", "slide", "add",
];

/// Compile a program, adding its `let` bindings to `bindings`.
///
/// Returns the terms of the expression statements, in order. A `let` of an
/// unlabelled sequence or selector labels it with the bound name. On error,
/// bindings made by earlier statements are kept.
pub fn compile_program(program: &Program, bindings: &mut Bindings) -> CompileResult<Vec<Term>> {
    let mut results = Vec::new();
    for stmt in &program.statements {
        if let Some(term) = compile_statement(&stmt.node, bindings)? {
            results.push(term);
        }
    }
    Ok(results)
}

/// Compile one statement. A `let` updates `bindings` and yields `None`.
pub fn compile_statement(stmt: &Statement, bindings: &mut Bindings) -> CompileResult<Option<Term>> {
    match stmt {
        Statement::Let { name, value } => {
            if BUILTINS.contains(&name.as_str()) && !bindings.contains_key(name) {
                log::debug!("binding '{}' shadows a builtin", name);
            }
            let term = label_term(compile_expr(value, bindings)?, name);
            bindings.insert(name.clone(), term);
            Ok(None)
        }
        Statement::Expr(expr) => compile_expr(expr, bindings).map(Some),
    }
}

fn label_term(term: Term, name: &str) -> Term {
    match term {
        Term::Seq(op) if op.label().is_none() => Term::Seq(op.name(name)),
        Term::Selector(sel) if sel.label().is_none() => Term::Selector(sel.name(name)),
        other => other,
    }
}

/// Compile a single expression against the current bindings.
pub fn compile_expr(expr: &Spanned<Expr>, bindings: &Bindings) -> CompileResult<Term> {
    let span = expr.span;
    match &expr.node {
        Expr::Int(n) => Ok(Term::Seq(constant(*n))),
        Expr::Char(c) => Ok(Term::Seq(constant(*c))),
        Expr::Bool(b) => Ok(Term::Seq(constant(*b))),
        Expr::Str(s) => Ok(Term::Str(s.clone())),
        Expr::Var(name) => resolve(name, bindings, span),
        Expr::Call { func, args } => call(func, args, bindings, span),
        Expr::Method {
            receiver,
            method,
            args,
        } => {
            let receiver = compile_expr(receiver, bindings)?;
            method_call(receiver, method, args, bindings, span)
        }
        Expr::Unary { op, operand } => {
            // Fold negative literals so they stay usable as scalars
            if let (UnaryOp::Neg, Expr::Int(n)) = (op, &operand.node) {
                return Ok(Term::Seq(constant(n.wrapping_neg())));
            }
            match compile_expr(operand, bindings)? {
                Term::Selector(sel) if *op == UnaryOp::Not => Ok(Term::Selector(sel.negate())),
                other => {
                    let seq = into_seq(other, operand.span)?;
                    Ok(Term::Seq(seq.unary(*op)))
                }
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let left = compile_expr(lhs, bindings)?;
            let right = compile_expr(rhs, bindings)?;
            binary(*op, left, lhs.span, right, rhs.span, span)
        }
    }
}

fn resolve(name: &str, bindings: &Bindings, span: Span) -> CompileResult<Term> {
    if let Some(term) = bindings.get(name) {
        return Ok(term.clone());
    }
    match name {
        "tokens" => Ok(Term::Seq(tokens())),
        "indices" => Ok(Term::Seq(indices())),
        "length" => Ok(Term::Seq(library::length())),
        _ if BUILTINS.contains(&name) => Err(CompileError::new(
            format!("'{}' is a function; call it as {}(...)", name, name),
            span,
        )),
        _ => Err(CompileError::new(format!("unknown name '{}'", name), span)),
    }
}

fn binary(
    op: BinaryOp,
    left: Term,
    left_span: Span,
    right: Term,
    right_span: Span,
    span: Span,
) -> CompileResult<Term> {
    match (left, right) {
        (Term::Key(k), Term::Query(q)) => match op.as_compare() {
            Some(cmp) => Ok(Term::Selector(k.compare(cmp, &q))),
            None => Err(role_operator_error(op, span)),
        },
        // `query < key` means `key > query`
        (Term::Query(q), Term::Key(k)) => match op.as_compare() {
            Some(cmp) => Ok(Term::Selector(k.compare(cmp.flip(), &q))),
            None => Err(role_operator_error(op, span)),
        },
        (Term::Selector(a), Term::Selector(b)) => match op {
            BinaryOp::And => Ok(Term::Selector(a.combine(BoolOp::And, &b))),
            BinaryOp::Or => Ok(Term::Selector(a.combine(BoolOp::Or, &b))),
            _ => Err(CompileError::new(
                format!("selectors combine with & and |, not '{}'", op.symbol()),
                span,
            )),
        },
        (left, right) => {
            let left = into_seq(left, left_span)?;
            let right = into_seq(right, right_span)?;
            Ok(Term::Seq(left.binary(op, right)))
        }
    }
}

fn role_operator_error(op: BinaryOp, span: Span) -> CompileError {
    CompileError::new(
        format!(
            "key and query can only be compared, not combined with '{}'",
            op.symbol()
        ),
        span,
    )
}

/// Coerce a term to a sequence. One-character strings are characters.
fn into_seq(term: Term, span: Span) -> CompileResult<SeqOp> {
    match term {
        Term::Seq(op) => Ok(op),
        Term::Str(s) => single_char(&s)
            .map(constant)
            .ok_or_else(|| CompileError::new(format!("expected a sequence, found string \"{}\"", s), span)),
        Term::Selector(_) => Err(CompileError::new(
            "expected a sequence, found a selector (use .value(...) to aggregate it)",
            span,
        )),
        other => Err(CompileError::new(
            format!(
                "expected a sequence, found a {} (compare key(...) with query(...) to build a selector)",
                other.describe()
            ),
            span,
        )),
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

// ============================================================================
// Calls
// ============================================================================

/// Positional arguments of one call, with optional trailing ones.
struct Args<'a> {
    func: &'a str,
    args: &'a [Spanned<Expr>],
    bindings: &'a Bindings,
    span: Span,
}

impl<'a> Args<'a> {
    fn arity(&self, min: usize, max: usize) -> CompileResult<()> {
        let n = self.args.len();
        if n < min || n > max {
            let expected = if min == max {
                format!("{}", min)
            } else {
                format!("{} to {}", min, max)
            };
            return Err(CompileError::new(
                format!(
                    "{}() takes {} argument{}, found {}",
                    self.func,
                    expected,
                    if max == 1 { "" } else { "s" },
                    n
                ),
                self.span,
            ));
        }
        Ok(())
    }

    fn term(&self, i: usize) -> CompileResult<Term> {
        compile_expr(&self.args[i], self.bindings)
    }

    fn seq(&self, i: usize) -> CompileResult<SeqOp> {
        into_seq(self.term(i)?, self.args[i].span)
    }

    /// The sequence at `i`, or `tokens` when omitted.
    fn seq_or_tokens(&self, i: usize) -> CompileResult<SeqOp> {
        if i < self.args.len() {
            self.seq(i)
        } else {
            Ok(tokens())
        }
    }

    fn scalar(&self, i: usize) -> CompileResult<Value> {
        let span = self.args[i].span;
        let term = self.term(i)?;
        scalar_of(&term).ok_or_else(|| {
            CompileError::new(
                format!("{}() expects a literal here, found a {}", self.func, term.describe()),
                span,
            )
        })
    }

    fn scalar_or(&self, i: usize, default: Value) -> CompileResult<Value> {
        if i < self.args.len() {
            self.scalar(i)
        } else {
            Ok(default)
        }
    }

    fn int(&self, i: usize) -> CompileResult<i64> {
        match self.scalar(i)? {
            Value::Int(n) => Ok(n),
            other => Err(CompileError::new(
                format!("{}() expects an integer, found {}", self.func, other.kind()),
                self.args[i].span,
            )),
        }
    }
}

/// The scalar behind a literal term.
fn scalar_of(term: &Term) -> Option<Value> {
    match term {
        Term::Seq(op) => match op.kind() {
            SeqKind::Constant(v) => Some(*v),
            _ => None,
        },
        Term::Str(s) => single_char(s).map(Value::Char),
        _ => None,
    }
}

fn call(func: &str, args: &[Spanned<Expr>], bindings: &Bindings, span: Span) -> CompileResult<Term> {
    let a = Args {
        func,
        args,
        bindings,
        span,
    };
    let term = match func {
        "tokens" => {
            a.arity(0, 0)?;
            Term::Seq(tokens())
        }
        "indices" => {
            a.arity(0, 0)?;
            Term::Seq(indices())
        }
        "key" => {
            a.arity(1, 1)?;
            Term::Key(key(a.seq(0)?))
        }
        "query" => {
            a.arity(1, 1)?;
            Term::Query(query(a.seq(0)?))
        }
        "where" => {
            a.arity(3, 3)?;
            Term::Seq(where_(a.seq(0)?, a.seq(1)?, a.seq(2)?))
        }
        "atoi" => {
            a.arity(0, 1)?;
            Term::Seq(library::atoi(&a.seq_or_tokens(0)?))
        }
        "length" => {
            a.arity(0, 0)?;
            Term::Seq(library::length())
        }
        "flip" => {
            a.arity(0, 1)?;
            Term::Seq(library::flip(&a.seq_or_tokens(0)?))
        }
        "cumsum" => {
            a.arity(0, 1)?;
            Term::Seq(library::cumsum(&a.seq_or_tokens(0)?))
        }
        "index" => {
            a.arity(1, 2)?;
            Term::Seq(library::index(a.int(0)?, &a.seq_or_tokens(1)?))
        }
        "shift" => {
            a.arity(1, 3)?;
            let default = a.scalar_or(1, Value::Char('0'))?;
            Term::Seq(library::shift(a.int(0)?, default, &a.seq_or_tokens(2)?))
        }
        "ralign" => {
            a.arity(0, 2)?;
            let default = a.scalar_or(0, Value::Char('0'))?;
            Term::Seq(library::ralign(default, &a.seq_or_tokens(1)?))
        }
        "split" => {
            a.arity(2, 3)?;
            let first_part = match a.scalar(1)?.truthy() {
                Some(b) => b,
                None => {
                    return Err(CompileError::new(
                        "split() expects true or false as its second argument",
                        args[1].span,
                    ))
                }
            };
            Term::Seq(library::split(a.scalar(0)?, first_part, &a.seq_or_tokens(2)?))
        }
        "minimum" | "min" => {
            a.arity(0, 1)?;
            Term::Seq(library::minimum(&a.seq_or_tokens(0)?))
        }
        "first" => {
            a.arity(1, 2)?;
            Term::Seq(library::first(a.scalar(0)?, &a.seq_or_tokens(1)?))
        }
        "slide" => {
            a.arity(0, 2)?;
            let matching = a.scalar_or(0, Value::Char('<'))?;
            Term::Seq(library::slide(matching, &a.seq_or_tokens(1)?))
        }
        "add" => {
            a.arity(0, 1)?;
            Term::Seq(library::add(&a.seq_or_tokens(0)?))
        }
        _ => {
            let message = if bindings.contains_key(func) {
                format!("'{}' is a value, not a function", func)
            } else {
                format!("unknown function '{}'", func)
            };
            return Err(CompileError::new(message, span));
        }
    };
    Ok(term)
}

fn method_call(
    receiver: Term,
    method: &str,
    args: &[Spanned<Expr>],
    bindings: &Bindings,
    span: Span,
) -> CompileResult<Term> {
    let a = Args {
        func: method,
        args,
        bindings,
        span,
    };
    match (method, receiver) {
        ("value", Term::Selector(sel)) => {
            a.arity(1, 2)?;
            let value = a.seq(0)?;
            let default = a.scalar_or(1, Value::Int(0))?;
            Ok(Term::Seq(sel.value_or(value, default)))
        }
        ("name", receiver) => {
            a.arity(1, 1)?;
            let label = match a.term(0)? {
                Term::Str(s) => s,
                other => {
                    return Err(CompileError::new(
                        format!("name() expects a string, found a {}", other.describe()),
                        args[0].span,
                    ))
                }
            };
            match receiver {
                Term::Seq(op) => Ok(Term::Seq(op.name(label))),
                Term::Selector(sel) => Ok(Term::Selector(sel.name(label))),
                other => Err(CompileError::new(
                    format!("cannot name a {}", other.describe()),
                    span,
                )),
            }
        }
        ("value", other) => Err(CompileError::new(
            format!("value() aggregates a selector, not a {}", other.describe()),
            span,
        )),
        (_, _) => Err(CompileError::new(format!("unknown method '{}'", method), span)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::evaluate;

    fn compile(src: &str) -> CompileResult<Vec<Term>> {
        let program = crate::parse(src).expect("parse failed");
        compile_program(&program, &mut Bindings::new())
    }

    fn compile_one(src: &str) -> Term {
        compile(src).unwrap().pop().expect("no expression")
    }

    #[test]
    fn test_negative_literal_is_scalar() {
        match compile_one("-3;") {
            Term::Seq(op) => assert!(matches!(op.kind(), SeqKind::Constant(Value::Int(-3)))),
            other => panic!("unexpected term {:?}", other),
        }
    }

    #[test]
    fn test_query_on_left_flips() {
        // query(indices) > key(indices)  ==  key(indices) < query(indices)
        let a = match compile_one("(query(indices) > key(indices)).value(tokens);") {
            Term::Seq(op) => op,
            other => panic!("unexpected term {:?}", other),
        };
        let b = match compile_one("(key(indices) < query(indices)).value(tokens);") {
            Term::Seq(op) => op,
            other => panic!("unexpected term {:?}", other),
        };
        assert_eq!(evaluate(&a, [1, 2, 3]).unwrap(), evaluate(&b, [1, 2, 3]).unwrap());
    }

    #[test]
    fn test_let_labels_unnamed_terms() {
        let program = crate::parse("let doubled = tokens * 2;").unwrap();
        let mut bindings = Bindings::new();
        compile_program(&program, &mut bindings).unwrap();
        match bindings.get("doubled") {
            Some(Term::Seq(op)) => assert_eq!(op.label(), Some("doubled")),
            other => panic!("unexpected binding {:?}", other),
        }
    }

    #[test]
    fn test_explicit_name_wins() {
        let program = crate::parse("let x = (tokens + 1).name(\"inc\");").unwrap();
        let mut bindings = Bindings::new();
        compile_program(&program, &mut bindings).unwrap();
        match bindings.get("x") {
            Some(Term::Seq(op)) => assert_eq!(op.label(), Some("inc")),
            other => panic!("unexpected binding {:?}", other),
        }
    }

    #[test]
    fn test_key_in_arithmetic_is_error() {
        let err = compile("key(tokens) + 1;").unwrap_err();
        assert!(err.message.contains("expected a sequence"), "{}", err.message);
    }

    #[test]
    fn test_unknown_name() {
        let err = compile("nope + 1;").unwrap_err();
        assert_eq!(err.message, "unknown name 'nope'");
        assert_eq!(err.span, Span::new(0, 4));
    }

    #[test]
    fn test_arity_error() {
        let err = compile("index();").unwrap_err();
        assert_eq!(err.message, "index() takes 1 to 2 arguments, found 0");
    }

    #[test]
    fn test_one_char_string_is_char() {
        let op = match compile_one("tokens == \"a\";") {
            Term::Seq(op) => op,
            other => panic!("unexpected term {:?}", other),
        };
        assert_eq!(
            evaluate(&op, "ab").unwrap(),
            vec![Value::Bool(true), Value::Bool(false)]
        );
    }
}
