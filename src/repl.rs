//! REPL (Read-Eval-Print Loop) for RASP
//!
//! Holds the `let` bindings of a session and the current input sequence.
//! Expression statements are evaluated against that input as soon as they
//! are submitted; bindings are only compiled.

use std::path::{Path, PathBuf};

use crate::compile::{compile_statement, Bindings, Term};
use crate::config::Config;
use crate::error::format_compile_error;
use crate::eval::{evaluate, evaluate_selector, SelectorMatrix};
use crate::pretty::{format_matrix, format_trace, pretty_selector, pretty_seq};
use crate::trace::{trace_evaluate, trace_evaluate_selector};
use crate::value::{format_sequence, parse_input, IntoInput, Value};

/// REPL state
pub struct ReplState {
    /// Named terms, in definition order
    pub bindings: Bindings,

    /// The sequence expressions are evaluated against
    pub input: Vec<Value>,

    pub config: Config,

    /// Multi-line input buffer
    pub input_buffer: String,

    /// Parenthesis depth for multi-line detection
    pub bracket_depth: i32,
}

impl Default for ReplState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplState {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Start with the configured preview input as the current input
    pub fn with_config(config: Config) -> Self {
        let input = config.preview_input.as_str().into_input();
        Self {
            bindings: Bindings::new(),
            input,
            config,
            input_buffer: String::new(),
            bracket_depth: 0,
        }
    }

    /// Drop all bindings and restore the preview input
    pub fn reset(&mut self) {
        self.bindings.clear();
        self.input = self.config.preview_input.as_str().into_input();
        self.input_buffer.clear();
        self.bracket_depth = 0;
    }

    /// Replace the current input: `[1, 2, 3]` for numbers, anything else as text
    pub fn set_input(&mut self, text: &str) -> Result<(), String> {
        self.input = parse_input(text)?;
        log::debug!("input set to {} values", self.input.len());
        Ok(())
    }

    /// Process a line of input, handling multi-line parenthesis matching
    pub fn process_line(&mut self, line: &str) -> InputResult {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if self.input_buffer.is_empty() {
                return InputResult::Empty;
            }
            return InputResult::Incomplete;
        }

        // Meta-command (only at start, not in continuation)
        if trimmed.starts_with(':') && self.input_buffer.is_empty() {
            return InputResult::MetaCommand(MetaCommand::parse(trimmed));
        }

        if !self.input_buffer.is_empty() {
            self.input_buffer.push('\n');
        }
        self.input_buffer.push_str(line);

        let code = strip_comment(line);
        self.bracket_depth += paren_delta(code);

        // Complete when parentheses balance and the line ends a statement
        if self.bracket_depth <= 0 && code.trim_end().ends_with(';') {
            let input = std::mem::take(&mut self.input_buffer);
            self.bracket_depth = 0;
            InputResult::RaspInput(input)
        } else {
            InputResult::Incomplete
        }
    }

    /// Force submit current buffer (for Ctrl-D or double-empty-line)
    pub fn force_submit(&mut self) -> Option<String> {
        if self.input_buffer.is_empty() {
            None
        } else {
            self.bracket_depth = 0;
            Some(std::mem::take(&mut self.input_buffer))
        }
    }

    /// Execute RASP source: bind every `let`, evaluate every expression.
    ///
    /// Statements run in order; bindings made before a failing statement
    /// are kept.
    pub fn execute(&mut self, source: &str) -> Result<Vec<ExecuteResult>, String> {
        let program = crate::parse(source)?;

        let mut results = Vec::new();
        for stmt in &program.statements {
            let term = compile_statement(&stmt.node, &mut self.bindings)
                .map_err(|e| format_compile_error(source, &e))?;
            match (&stmt.node, term) {
                (crate::ast::Statement::Let { name, .. }, None) => {
                    let kind = self
                        .bindings
                        .get(name)
                        .map_or("value", Term::describe);
                    results.push(ExecuteResult::Bound {
                        name: name.clone(),
                        kind,
                    });
                }
                (_, Some(term)) => results.push(self.evaluate_term(&term)?),
                (_, None) => {}
            }
        }
        Ok(results)
    }

    fn evaluate_term(&self, term: &Term) -> Result<ExecuteResult, String> {
        match term {
            Term::Seq(op) => {
                let values = evaluate(op, self.input.as_slice()).map_err(|e| e.to_string())?;
                Ok(ExecuteResult::Sequence {
                    source: pretty_seq(op),
                    values,
                })
            }
            Term::Selector(sel) => {
                let matrix =
                    evaluate_selector(sel, self.input.as_slice()).map_err(|e| e.to_string())?;
                Ok(ExecuteResult::Selector {
                    source: pretty_selector(sel),
                    matrix,
                })
            }
            other => Err(format!(
                "a {} has no value on its own; compare a key with a query to build a selector",
                other.describe()
            )),
        }
    }

    /// Execute a source file
    pub fn source_file(&mut self, path: &Path) -> Result<Vec<ExecuteResult>, String> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        self.execute(&source)
    }

    /// Bound names with their kind and definition
    pub fn list_bindings(&self) -> Vec<BindingInfo> {
        self.bindings
            .iter()
            .map(|(name, term)| BindingInfo {
                name: name.clone(),
                kind: term.describe(),
                definition: describe_term(term),
            })
            .collect()
    }

    /// Definition of a bound name in source syntax
    pub fn show(&self, name: &str) -> Option<String> {
        self.bindings.get(name).map(describe_term)
    }

    /// Evaluate an expression layer by layer and render the trace table
    pub fn trace(&mut self, expr_source: &str) -> Result<String, String> {
        let source = format!("{};", expr_source.trim().trim_end_matches(';'));
        let program = crate::parse(&source)?;
        let stmt = match program.statements.as_slice() {
            [stmt] => stmt,
            _ => return Err(":trace takes a single expression".to_string()),
        };
        let term = compile_statement(&stmt.node, &mut self.bindings)
            .map_err(|e| format_compile_error(&source, &e))?;

        let input = self.input.as_slice();
        let trace = match term {
            Some(Term::Seq(op)) => trace_evaluate(&op, input).map_err(|e| e.to_string())?.1,
            Some(Term::Selector(sel)) => {
                trace_evaluate_selector(&sel, input)
                    .map_err(|e| e.to_string())?
                    .1
            }
            Some(other) => return Err(format!("cannot trace a {}", other.describe())),
            None => return Err(":trace takes an expression, not a let".to_string()),
        };
        Ok(format_trace(&trace))
    }
}

fn describe_term(term: &Term) -> String {
    match term {
        Term::Seq(op) => pretty_seq(op),
        Term::Selector(sel) => pretty_selector(sel),
        Term::Key(k) => format!("key({})", pretty_seq(k.expr())),
        Term::Query(q) => format!("query({})", pretty_seq(q.expr())),
        Term::Str(s) => crate::pretty::escape_str(s),
    }
}

/// The part of a line before any `//` comment outside a literal
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev_slash = false;
    for (i, ch) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '/' if prev_slash => return &line[..i - 1],
            _ => {}
        }
        prev_slash = ch == '/';
    }
    line
}

/// Net parenthesis change on a line, ignoring literals
fn paren_delta(code: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in code.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Result of processing a line of input
#[derive(Debug)]
pub enum InputResult {
    MetaCommand(MetaCommand),
    RaspInput(String),
    Incomplete,
    Empty,
}

/// Meta-commands supported by the REPL
#[derive(Debug, PartialEq, Eq)]
pub enum MetaCommand {
    Help(Option<String>),
    Quit,
    /// `:input` shows the current input, `:input <text>` replaces it
    Input(Option<String>),
    List,
    Show(String),
    /// `:trace <expr>`
    Trace(String),
    Source(PathBuf),
    Reset,
    Clear,
    Unknown(String),
}

impl MetaCommand {
    pub fn parse(input: &str) -> Self {
        let input = input.trim_start_matches(':').trim();
        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());

        match cmd {
            "help" | "h" | "?" => MetaCommand::Help(arg),
            "quit" | "q" | "exit" => MetaCommand::Quit,
            "input" | "in" => MetaCommand::Input(arg),
            "list" | "ls" | "l" => MetaCommand::List,
            "show" | "s" => match arg {
                Some(name) => MetaCommand::Show(name),
                None => MetaCommand::Unknown(":show requires a name".to_string()),
            },
            "trace" | "t" => match arg {
                Some(expr) => MetaCommand::Trace(expr),
                None => MetaCommand::Unknown(":trace requires an expression".to_string()),
            },
            "source" | "load" => match arg {
                Some(path) => MetaCommand::Source(PathBuf::from(path)),
                None => MetaCommand::Unknown(":source requires a file path".to_string()),
            },
            "reset" => MetaCommand::Reset,
            "clear" | "cls" => MetaCommand::Clear,
            other => MetaCommand::Unknown(format!("Unknown command: :{}", other)),
        }
    }
}

#[derive(Debug)]
pub enum ExecuteResult {
    Bound {
        name: String,
        kind: &'static str,
    },
    Sequence {
        source: String,
        values: Vec<Value>,
    },
    Selector {
        source: String,
        matrix: SelectorMatrix,
    },
}

#[derive(Debug)]
pub struct BindingInfo {
    pub name: String,
    pub kind: &'static str,
    pub definition: String,
}

/// Render an execution result for display
pub fn format_result(result: &ExecuteResult) -> String {
    match result {
        ExecuteResult::Bound { name, kind } => format!("{} : {}", name, kind),
        ExecuteResult::Sequence { values, .. } => format_sequence(values),
        ExecuteResult::Selector { matrix, .. } => format_matrix(matrix).trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comment_ignores_literals() {
        assert_eq!(strip_comment("x; // note"), "x; ");
        assert_eq!(strip_comment("tokens == '/';"), "tokens == '/';");
        assert_eq!(strip_comment("\"a//b\".len"), "\"a//b\".len");
    }

    #[test]
    fn test_paren_delta_ignores_literals() {
        assert_eq!(paren_delta("where(a,"), 1);
        assert_eq!(paren_delta("tokens == '('"), 0);
        assert_eq!(paren_delta("))"), -2);
    }
}
