//! RASP REPL - Interactive environment for Transformer programs
//!
//! Usage: rasp [-i <input>] [source_files...]
//!
//! Commands:
//!   :help        - Show help
//!   :quit        - Exit REPL
//!   :input X     - Set the input sequence
//!   :list        - List bindings
//!   :show X      - Show the definition of X
//!   :trace E     - Show every layer of E on the current input
//!   :clear       - Clear screen
//!   :reset       - Reset all state

use std::fs;
use std::path::{Path, PathBuf};

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use rasp::config::Config;
use rasp::repl::{format_result, ExecuteResult, InputResult, MetaCommand, ReplState};
use rasp::value::format_sequence;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const PROMPT: &str = "rasp> ";
const CONTINUATION: &str = "....  ";

/// Parse command line arguments.
///
/// Usage: rasp [-i <input>] [source_files...]
///
/// Options:
///   -i, --input <text>  Initial input sequence (`[1, 2, 3]` for numbers)
///   -h, --help          Show help and exit
///   -v, --version       Show version and exit
///
/// Returns (input, source_files)
fn parse_args(args: &[String]) -> (Option<String>, Vec<PathBuf>) {
    let mut input = None;
    let mut source_files = Vec::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-i" | "--input" => {
                if i + 1 < args.len() {
                    input = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("Error: -i requires an input argument");
                    std::process::exit(1);
                }
            }
            "-h" | "--help" => {
                println!("rasp v{} - Transformer programs REPL", VERSION);
                println!();
                println!("Usage: rasp [OPTIONS] [source_files...]");
                println!();
                println!("Options:");
                println!("  -i, --input <text>  Initial input sequence ([1, 2, 3] for numbers)");
                println!("  -h, --help          Show this help message");
                println!("  -v, --version       Show version");
                println!();
                println!("Environment:");
                println!("  RASP_PREVIEW_INPUT  Default input (default: hello)");
                println!("  RASP_HISTORY        History file, or 'off'");
                println!();
                println!("Examples:");
                println!("  rasp                      Start REPL on the default input");
                println!("  rasp -i 683+345 add.rasp  Load add.rasp, then evaluate on 683+345");
                std::process::exit(0);
            }
            "-v" | "--version" => {
                println!("rasp v{}", VERSION);
                std::process::exit(0);
            }
            _ if arg.starts_with('-') => {
                eprintln!("Error: Unknown option '{}'", arg);
                eprintln!("Try 'rasp --help' for usage information");
                std::process::exit(1);
            }
            _ => {
                source_files.push(PathBuf::from(arg));
                i += 1;
            }
        }
    }

    (input, source_files)
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (input, source_files) = parse_args(&args);

    println!("rasp v{} - Transformer programs REPL", VERSION);
    println!("Type :help for help, :quit to exit\n");

    let config = Config::from_env();
    let history_path = config.history_path.clone();
    let mut state = ReplState::with_config(config);

    if let Some(text) = input {
        if let Err(e) = state.set_input(&text) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
    println!("Input: {}", format_sequence(&state.input));

    for source_file in &source_files {
        handle_source(&mut state, source_file);
    }

    let editor_config = rustyline::Config::builder()
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = match Editor::with_config(editor_config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Error: failed to create line editor: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = if state.input_buffer.is_empty() {
            PROMPT
        } else {
            CONTINUATION
        };

        match rl.readline(prompt) {
            Ok(line) => match state.process_line(&line) {
                InputResult::MetaCommand(cmd) => {
                    if !handle_command(&mut state, cmd) {
                        break; // :quit
                    }
                }
                InputResult::RaspInput(source) => {
                    handle_rasp(&mut state, &source);
                }
                InputResult::Incomplete | InputResult::Empty => {}
            },
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C - clear current buffer
                if !state.input_buffer.is_empty() {
                    state.input_buffer.clear();
                    state.bracket_depth = 0;
                    println!("^C");
                } else {
                    println!("Use :quit or Ctrl-D to exit");
                }
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D - submit buffer or quit
                if let Some(source) = state.force_submit() {
                    handle_rasp(&mut state, &source);
                } else {
                    println!("\nGoodbye!");
                    break;
                }
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let _ = rl.save_history(path);
    }
}

/// Handle a meta-command. Returns false if we should exit.
fn handle_command(state: &mut ReplState, cmd: MetaCommand) -> bool {
    match cmd {
        MetaCommand::Help(topic) => {
            print_help(topic.as_deref());
        }
        MetaCommand::Quit => {
            println!("Goodbye!");
            return false;
        }
        MetaCommand::Input(None) => {
            println!("Input: {}", format_sequence(&state.input));
        }
        MetaCommand::Input(Some(text)) => match state.set_input(&text) {
            Ok(()) => println!("Input: {}", format_sequence(&state.input)),
            Err(e) => eprintln!("Error: {}", e),
        },
        MetaCommand::List => handle_list(state),
        MetaCommand::Show(name) => match state.show(&name) {
            Some(definition) => println!("{} = {}", name, definition),
            None => {
                eprintln!("Not found: {}", name);
                eprintln!("Use :list to see bindings");
            }
        },
        MetaCommand::Trace(expr) => match state.trace(&expr) {
            Ok(table) => print!("{}", table),
            Err(e) => eprintln!("Error: {}", e),
        },
        MetaCommand::Clear => {
            // ANSI escape to clear screen
            print!("\x1B[2J\x1B[H");
        }
        MetaCommand::Reset => {
            state.reset();
            println!("State reset.");
        }
        MetaCommand::Source(path) => {
            handle_source(state, &path);
        }
        MetaCommand::Unknown(msg) => {
            eprintln!("Error: {}", msg);
            eprintln!("Type :help for available commands");
        }
    }
    true
}

/// Handle RASP source input
fn handle_rasp(state: &mut ReplState, source: &str) {
    match state.execute(source) {
        Ok(results) => print_results(&results),
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn print_results(results: &[ExecuteResult]) {
    for result in results {
        println!("{}", format_result(result));
    }
}

/// Print help message
fn print_help(topic: Option<&str>) {
    match topic {
        None => {
            println!("RASP REPL Commands:");
            println!();
            println!("  :help [topic]    Show help (topics: syntax, library)");
            println!("  :quit            Exit the REPL");
            println!("  :input [text]    Show or set the input ([1, 2, 3] for numbers)");
            println!("  :list            List bindings");
            println!("  :show <name>     Show the definition of a binding");
            println!("  :trace <expr>    Show every layer of an expression");
            println!("  :source <file>   Load and execute a RASP file");
            println!("  :clear           Clear the screen");
            println!("  :reset           Reset all state");
            println!();
            println!("Enter statements ending in ';'. Expressions are evaluated on the");
            println!("current input; 'let' statements only bind.");
            println!("Multi-line input is supported - parentheses are matched automatically.");
        }
        Some("syntax") => {
            println!("RASP Syntax:");
            println!();
            println!("  let doubled = tokens * 2;");
            println!("  let before = key(indices) < query(indices);");
            println!("  let sums = before.value(tokens);");
            println!("  where(tokens == 'a', 1, 0);");
            println!("  (key(tokens) == query(tokens)).value(1).name(\"hist\");");
            println!();
            println!("  Operators: + - * / %  == != < <= > >=  & | ~");
            println!("  key(..) op query(..) builds a selector; & | ~ combine selectors.");
        }
        Some("library") => {
            println!("Library functions (seq defaults to tokens):");
            println!();
            println!("  length  flip(seq)  cumsum(seq)  atoi(seq)");
            println!("  index(i, seq)  shift(i, default, seq)  ralign(default, seq)");
            println!("  split(v, first_part, seq)  minimum(seq)  first(token, seq)");
            println!("  slide(match, seq)  add(seq)");
        }
        Some(other) => {
            println!("Unknown help topic: {}", other);
            println!("Available topics: syntax, library");
        }
    }
}

/// Handle :list command
fn handle_list(state: &ReplState) {
    let bindings = state.list_bindings();
    if bindings.is_empty() {
        println!("No bindings.");
        return;
    }
    for b in bindings {
        println!("  {} : {} = {}", b.name, b.kind, b.definition);
    }
}

/// Handle :source command
fn handle_source(state: &mut ReplState, path: &Path) {
    println!("Loading {}...", path.display());
    match state.source_file(path) {
        Ok(results) => print_results(&results),
        Err(e) => eprintln!("Error: {}", e),
    }
}
