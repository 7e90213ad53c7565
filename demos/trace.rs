//! Compile a small program from source and print its layer trace.

use rasp::compile::{compile_program, Bindings, Term};
use rasp::pretty::{format_trace, pretty_seq};
use rasp::{parse, trace_evaluate};

const PROGRAM: &str = r#"
// Histogram: how many times does each token occur?
let same_tok = key(tokens) == query(tokens);
let hist = same_tok.value(1);

// Reverse the input
let opp = (length - indices) - 1;
let flipped = (key(indices) == query(opp)).value(tokens);

hist + where(flipped == tokens, 100, 0);
"#;

fn main() {
    let input = std::env::args().nth(1).unwrap_or_else(|| "abcba".to_string());

    let program = match parse(PROGRAM) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut bindings = Bindings::new();
    let terms = match compile_program(&program, &mut bindings) {
        Ok(terms) => terms,
        Err(e) => {
            eprintln!("Compile error: {}", e);
            std::process::exit(1);
        }
    };

    let Some(Term::Seq(output)) = terms.last() else {
        eprintln!("program does not end in a sequence");
        std::process::exit(1);
    };

    println!("=== PROGRAM ===");
    for (name, term) in &bindings {
        if let Term::Seq(op) = term {
            println!("{} = {}", name, pretty_seq(op));
        }
    }
    println!("output = {}", pretty_seq(output));

    println!("\n=== TRACE on {:?} ===", input);
    match trace_evaluate(output, input.as_str()) {
        Ok((_, trace)) => print!("{}", format_trace(&trace)),
        Err(e) => {
            eprintln!("Evaluation error: {}", e);
            std::process::exit(1);
        }
    }
}
