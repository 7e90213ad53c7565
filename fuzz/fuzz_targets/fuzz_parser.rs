//! Fuzz the RASP lexer and parser
//!
//! Malformed input must come back as a rendered error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(program) = rasp::parse(input) {
            // Printing a parsed program must itself parse
            let printed = rasp::pretty_print(&program);
            assert!(rasp::parse(&printed).is_ok(), "unparseable print: {}", printed);
        }
    }
});
