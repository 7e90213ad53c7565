//! Run each library program on a worked input and print its output.

use rasp::library::{add, atoi, cumsum, first, flip, index, minimum, ralign, shift, slide, split};
use rasp::value::format_sequence;
use rasp::{evaluate, tokens, IntoInput, SeqOp, Value};

fn show(title: &str, op: &SeqOp, input: impl IntoInput + Clone) {
    let shown = format_sequence(&input.clone().into_input());
    match evaluate(op, input) {
        Ok(values) => println!("{:<24} {:<28} -> {}", title, shown, format_sequence(&values)),
        Err(e) => {
            eprintln!("{}: {}", title, e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let t = tokens();

    println!("=== ELEMENTWISE ===");
    show("atoi", &atoi(&t), "31415");

    println!("\n=== SELECT-AGGREGATE ===");
    show("flip", &flip(&t), "hello");
    show("cumsum", &cumsum(&t), [1, 2, 3, 4]);
    show("index(2)", &index(2, &t), [2, 1, 3, 2, 4]);
    show("shift(2, 0)", &shift(2, 0, &t), [3, 4, 3, -1, 2]);
    show("minimum", &minimum(&t), [2, 1, 3, 2, 4]);
    show("first(3)", &first(3, &t), [2, 1, 3, 2, 4]);

    println!("\n=== TEXT ===");
    show("ralign('0')", &ralign('0', &t), "xyz___");
    show("split('+', true)", &split('+', true, &t), "683+345");
    show("split('+', false)", &split('+', false, &t), "683+345");
    show("slide('<')", &slide('<', &t), "3<<<1<<3");

    println!("\n=== ADDITION ===");
    for problem in ["1+2", "22+38", "3+10", "683+345"] {
        show("add", &add(&t), problem);
    }

    let digits: Vec<Value> = "9+9".chars().map(Value::Char).collect();
    show("add (carry)", &add(&t), digits);
}
