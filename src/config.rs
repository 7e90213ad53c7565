//! Run-time configuration for previews and the REPL.
//!
//! [`Config`] captures the knobs a user can tune without touching code.
//! Defaults can be overridden from the environment:
//!
//! - `RASP_PREVIEW_INPUT`: input used by [`crate::SeqOp::preview`]
//! - `RASP_HISTORY`: REPL history file, or `off` to disable history

use std::path::PathBuf;

/// Default input shown when previewing an expression.
pub const DEFAULT_PREVIEW_INPUT: &str = "hello";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Input for explicit previews
    pub preview_input: String,
    /// Where the REPL keeps its line history. `None` disables history.
    pub history_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preview_input: DEFAULT_PREVIEW_INPUT.to_string(),
            history_path: std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".rasp_history")),
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(input) = lookup("RASP_PREVIEW_INPUT") {
            log::debug!("preview input overridden to {:?}", input);
            self.preview_input = input;
        }
        match lookup("RASP_HISTORY").as_deref() {
            None => {}
            Some("" | "off" | "none") => self.history_path = None,
            Some(path) => self.history_path = Some(PathBuf::from(path)),
        }
    }
}
