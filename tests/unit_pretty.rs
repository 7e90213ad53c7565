//! Unit tests for pretty-printing

use rasp::library::{atoi, cumsum};
use rasp::pretty::{format_matrix, pretty_expr, pretty_selector, pretty_seq};
use rasp::{evaluate_selector, indices, key, parse, pretty_print, query, tokens, where_};

/// Parse, print, parse again: both prints must agree
fn assert_roundtrip(src: &str) {
    let first = parse(src).expect("first parse failed");
    let printed = pretty_print(&first);
    let second = parse(&printed).expect("reparse failed");
    assert_eq!(printed, pretty_print(&second), "unstable print of {:?}", src);
}

#[test]
fn test_roundtrip_programs() {
    assert_roundtrip("let x = tokens + 1;");
    assert_roundtrip("let sel = key(indices) < query(indices) | key(tokens) == query('a');");
    assert_roundtrip("(key(tokens) == query(tokens)).value(1, 0).name(\"hist\");");
    assert_roundtrip("where(~(tokens == '_'), tokens, '0');");
    assert_roundtrip("-(indices - 1) * (2 + 3) % 4;");
    assert_roundtrip("let s = \"quote\\\"d\";");
}

#[test]
fn test_minimal_parentheses() {
    let program = parse("(a * b) + (c * d); a * (b + c); (a - b) - c; a - (b - c);").unwrap();
    assert_eq!(
        pretty_print(&program),
        "a * b + c * d;\na * (b + c);\na - b - c;\na - (b - c);\n"
    );
}

#[test]
fn test_comparison_operands_keep_parentheses() {
    let program = parse("(a < b) == c;").unwrap();
    assert_eq!(pretty_print(&program), "(a < b) == c;\n");
}

#[test]
fn test_pretty_expr_display() {
    let program = parse("(key(x) == query(y)).value(z);").unwrap();
    match &program.statements[0].node {
        rasp::Statement::Expr(e) => {
            assert_eq!(pretty_expr(&e.node), "(key(x) == query(y)).value(z)");
            assert_eq!(e.node.to_string(), "(key(x) == query(y)).value(z)");
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn test_char_escapes() {
    let program = parse("tokens == '\\'';").unwrap();
    assert_eq!(pretty_print(&program), "tokens == '\\'';\n");
}

// ============================================================================
// Expression nodes
// ============================================================================

#[test]
fn test_pretty_seq_structure() {
    let op = (tokens() + 1) * indices();
    assert_eq!(pretty_seq(&op), "(tokens + 1) * indices");
}

#[test]
fn test_pretty_seq_uses_child_labels() {
    let shifted = (indices() + 1).name("shifted");
    let op = &shifted * 2;
    assert_eq!(pretty_seq(&op), "shifted * 2");
    // The root is always expanded
    assert_eq!(pretty_seq(&shifted), "indices + 1");
}

#[test]
fn test_pretty_seq_map_and_where() {
    let op = where_(tokens().eq('+'), 0, atoi(&tokens()));
    assert_eq!(pretty_seq(&op), "where(tokens == '+', 0, atoi(tokens))");
}

#[test]
fn test_pretty_aggregate() {
    let sel = key(indices()).lt(&query(indices()));
    assert_eq!(pretty_seq(&sel.value(tokens())), "(key(indices) < query(indices)).value(tokens)");
    assert_eq!(
        pretty_seq(&sel.value_or(tokens(), '_')),
        "(key(indices) < query(indices)).value(tokens, '_')"
    );
}

#[test]
fn test_pretty_selector_combinators() {
    let a = key(indices()).lt(&query(indices()));
    let b = key(tokens()).eq(&query(-1)).name("b");
    assert_eq!(pretty_selector(&!(&a | &b)), "~(key(indices) < query(indices) | b)");
}

#[test]
fn test_pretty_library_names() {
    assert_eq!(pretty_seq(&(cumsum(&tokens()) + 1)), "cumsum + 1");
}

#[test]
fn test_format_matrix() {
    let sel = key(indices()).le(&query(indices()));
    let matrix = evaluate_selector(&sel, "abc").unwrap();
    assert_eq!(format_matrix(&matrix), "1 . .\n1 1 .\n1 1 1\n");
}
