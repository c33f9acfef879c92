//! Tunables of the shell: prompt, helper programs and input bounds.

use crate::lexer::{MAX_ARGS, MAX_LINE_LENGTH};

const DEFAULT_PROMPT: &str = "minish> ";

#[cfg(target_os = "macos")]
const DEFAULT_VIEWER: &str = "open";
#[cfg(not(target_os = "macos"))]
const DEFAULT_VIEWER: &str = "xdg-open";

/// Settings shared by the read loop and the built-ins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Text shown before every input line.
    pub prompt: String,
    /// Program `open` launches on a file, without waiting for it.
    pub viewer: String,
    /// Program `calendar` runs as `<program> <month> <year>`.
    pub calendar_program: String,
    /// Program `display` runs as `<program> <file>`.
    pub concat_program: String,
    /// Upper bound of the argument vector, the program name included.
    /// Only `max_args - 1` tokens of a line are kept.
    pub max_args: usize,
    /// Size of the line buffer. Lines are cut to `max_line_length - 1` bytes.
    pub max_line_length: usize,
    /// Print "Exiting shell." when the loop ends.
    pub farewell: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            viewer: DEFAULT_VIEWER.to_string(),
            calendar_program: "cal".to_string(),
            concat_program: "cat".to_string(),
            max_args: MAX_ARGS,
            max_line_length: MAX_LINE_LENGTH,
            farewell: true,
        }
    }
}

impl Config {
    /// Build a configuration from `MINISH_*` variables found through `lookup`.
    ///
    /// Unset or empty variables keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();
        if let Some(prompt) = get("MINISH_PROMPT") {
            config.prompt = prompt;
        }
        if let Some(viewer) = get("MINISH_VIEWER") {
            config.viewer = viewer;
        }
        if let Some(cal) = get("MINISH_CALENDAR") {
            config.calendar_program = cal;
        }
        if let Some(cat) = get("MINISH_CONCAT") {
            config.concat_program = cat;
        }
        config
    }

    pub fn from_process_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.prompt, "minish> ");
        assert_eq!(config.calendar_program, "cal");
        assert_eq!(config.concat_program, "cat");
        assert_eq!(config.max_args, 64);
    }

    #[test]
    fn test_variables_override_defaults() {
        let vars: HashMap<&str, &str> = [
            ("MINISH_PROMPT", "$ "),
            ("MINISH_VIEWER", "less"),
            ("MINISH_CALENDAR", "ncal"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.prompt, "$ ");
        assert_eq!(config.viewer, "less");
        assert_eq!(config.calendar_program, "ncal");
        assert_eq!(config.concat_program, "cat");
    }

    #[test]
    fn test_empty_variable_keeps_default() {
        let config = Config::from_lookup(|k| (k == "MINISH_VIEWER").then(String::new));
        assert_eq!(config.viewer, DEFAULT_VIEWER);
    }
}
