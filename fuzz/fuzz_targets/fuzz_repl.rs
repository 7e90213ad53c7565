//! Fuzz the REPL pipeline
//!
//! Parsing, compilation and evaluation against the default preview input
//! should report errors as strings for any submission.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rasp::repl::ReplState;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut state = ReplState::new();
        let _ = state.execute(input);
    }
});
