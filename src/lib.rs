//! RASP: a symbolic language for Transformer computations
//!
//! Programs are built from two leaves, the input [`tokens`] and their
//! [`indices`], combined elementwise (feed-forward layers) or through
//! [`Selector`]s and aggregation (attention layers). Expressions are lazy
//! graphs of immutable nodes; nothing is computed until they are bound to a
//! concrete input with [`evaluate`] or traced layer by layer with
//! [`trace_evaluate`].
//!
//! A textual surface syntax (lexer, parser, compiler) and an interactive
//! REPL sit on top of the embedded API.

pub mod ast;
pub mod compile;
pub mod config;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod library;
pub mod parser;
pub mod pretty;
pub mod repl;
pub mod selector;
pub mod seq;
pub mod trace;
pub mod value;

pub use ast::*;
pub use compile::{compile_program, Bindings, CompileError, Term};
pub use config::Config;
pub use eval::{evaluate, evaluate_selector, EvalError, EvalErrorKind, Evaluator, Observer, SelectorMatrix};
pub use lexer::lexer;
pub use parser::parser;
pub use pretty::pretty_print;
pub use selector::{key, query, Key, Query, Selector};
pub use seq::{constant, indices, tokens, where_, NodeId, SeqOp};
pub use trace::{trace_evaluate, trace_evaluate_selector, Layer, Role, Trace};
pub use value::{IntoInput, Value};

/// Parse RASP source into an AST
///
/// Errors come back rendered as ariadne reports against `input`.
pub fn parse(input: &str) -> Result<Program, String> {
    use chumsky::prelude::*;

    let tokens = lexer::lexer()
        .parse(input)
        .map_err(|errs| error::format_lexer_errors(input, errs))?;

    // token spans are char offsets
    let len = input.chars().count();

    parser::parser()
        .parse(chumsky::Stream::from_iter(len..len + 1, tokens.into_iter()))
        .map_err(|errs| error::format_parser_errors(input, errs))
}
