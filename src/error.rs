//! Error formatting for RASP source
//!
//! Renders lexer, parser and compile errors as ariadne reports.

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::error::SimpleReason;
use chumsky::prelude::Simple;
use std::ops::Range;

use crate::compile::CompileError;
use crate::lexer::Token;

fn render(source: &str, reports: Vec<Report<'_, Range<usize>>>) -> String {
    let mut output = Vec::new();
    for report in reports {
        if report.write(Source::from(source), &mut output).is_err() {
            return "Error formatting failed".to_string();
        }
    }
    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

fn report(title: &str, span: Range<usize>, message: String) -> Report<'static, Range<usize>> {
    Report::build(ReportKind::Error, (), span.start)
        .with_message(title)
        .with_label(Label::new(span).with_message(message).with_color(Color::Red))
        .finish()
}

/// Format lexer errors into a user-friendly string
pub fn format_lexer_errors(source: &str, errors: Vec<Simple<char>>) -> String {
    let reports = errors
        .iter()
        .map(|error| report("Lexical error", error.span(), format_lexer_error(error)))
        .collect();
    render(source, reports)
}

fn format_lexer_error(error: &Simple<char>) -> String {
    if let SimpleReason::Custom(msg) = error.reason() {
        return msg.clone();
    }

    let found = error
        .found()
        .map(|c| format!("'{}'", c))
        .unwrap_or_else(|| "end of input".to_string());

    if error.expected().next().is_some() {
        format!(
            "Unexpected {}, expected {}",
            found,
            format_char_set(error.expected())
        )
    } else {
        format!("Unexpected character {}", found)
    }
}

/// Format parser errors into a user-friendly string
///
/// Parser spans are character offsets (the token stream carries the lexer's
/// spans); the end-of-input span `len..len+1` is clamped to the source.
pub fn format_parser_errors(source: &str, errors: Vec<Simple<Token>>) -> String {
    let len = source.chars().count();
    let reports = errors
        .iter()
        .map(|error| {
            let span = error.span();
            let start = span.start.min(len);
            let end = span.end.min(len).max(start);
            report("Parse error", start..end, format_parser_error(error))
        })
        .collect();
    render(source, reports)
}

fn format_parser_error(error: &Simple<Token>) -> String {
    if let SimpleReason::Custom(msg) = error.reason() {
        return msg.clone();
    }

    let found = error
        .found()
        .map(|t| format!("'{}'", t))
        .unwrap_or_else(|| "end of input".to_string());

    if let SimpleReason::Unclosed { delimiter, .. } = error.reason() {
        return format!("Unclosed '{}', found {}", delimiter, found);
    }

    let expected = format_token_set(error.expected());

    if !expected.is_empty() {
        // The most common slip: a statement without its terminator
        if expected.contains(&"';'".to_string()) && error.found().is_none() {
            return "Expected ';' to end the statement".to_string();
        }
        format!("Unexpected {}, expected one of: {}", found, expected.join(", "))
    } else if let Some(label) = error.label() {
        label.to_string()
    } else {
        format!("Unexpected token {}", found)
    }
}

/// Format a compile error against its source
pub fn format_compile_error(source: &str, error: &CompileError) -> String {
    let len = source.chars().count();
    let start = error.span.start.min(len);
    let end = error.span.end.min(len).max(start);
    render(
        source,
        vec![report("Compile error", start..end, error.message.clone())],
    )
}

fn format_token_set<'a>(expected: impl Iterator<Item = &'a Option<Token>>) -> Vec<String> {
    let mut tokens: Vec<String> = expected
        .filter_map(|opt| opt.as_ref())
        .map(|t| format!("'{}'", t))
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

fn format_char_set<'a>(expected: impl Iterator<Item = &'a Option<char>>) -> String {
    let chars: Vec<String> = expected
        .filter_map(|opt| opt.as_ref())
        .map(|c| format!("'{}'", c))
        .collect();

    if chars.is_empty() {
        "valid character".to_string()
    } else if chars.len() == 1 {
        chars[0].clone()
    } else {
        chars.join(" or ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chumsky::Parser;

    #[test]
    fn test_compile_error_mentions_message() {
        let err = CompileError::new("unknown name 'x'", crate::ast::Span::new(0, 1));
        let out = format_compile_error("x;", &err);
        assert!(out.contains("Compile error"));
        assert!(out.contains("unknown name 'x'"));
    }

    #[test]
    fn test_compile_error_span_clamped_in_chars() {
        // 5 chars, 6 bytes
        let err = CompileError::new("unknown name 'x'", crate::ast::Span::new(4, 9));
        let out = format_compile_error("'é' x", &err);
        assert!(out.contains("unknown name 'x'"), "{}", out);
    }

    #[test]
    fn test_lexer_error_is_reported() {
        let errs = crate::lexer::lexer().parse("let x = @;").unwrap_err();
        let out = format_lexer_errors("let x = @;", errs);
        assert!(out.contains("Lexical error"));
    }
}
