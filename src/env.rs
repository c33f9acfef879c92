use crate::config::Config;
use crate::external::ChildHandle;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: a map of environment variables that will be visible to executed commands.
/// - `current_dir`: the working directory for command execution.
/// - `should_exit`: a flag that a REPL loop can check to know when to terminate.
/// - `config`: prompt and helper programs used by the built-ins.
/// - `detached`: viewer processes started by `open` that nobody waits for.
///
/// `current_dir` is the only working directory the shell consults: relative
/// paths, redirection targets and spawned children all resolve against it, and
/// `cd` changes it without touching the OS-level directory of this process.
#[derive(Debug)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, indicates that an interactive loop should exit.
    pub should_exit: bool,
    pub config: Config,
    pub detached: Vec<ChildHandle>,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// This copies variables from `std::env::vars()` and initializes `current_dir`
    /// from `std::env::current_dir()`. The `should_exit` flag is initialized to `false`.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
            config,
            detached: Vec::new(),
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Collect detached children that have terminated since the last call.
    pub fn reap_detached(&mut self) {
        self.detached.retain_mut(|child| !child.try_reap());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::collections::HashMap;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment::new();
        env.vars = HashMap::new();

        // initially absent
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert!(!env.should_exit);
        assert!(env.detached.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn test_reap_detached_drops_finished_children() {
        let mut env = Environment::new();
        let mut sink = crate::io_adapters::MemWriter::default();
        let child = crate::external::spawn_detached("true", &[], &mut sink, &env).unwrap();
        env.detached.push(child);

        // `true` exits immediately; give it a moment before polling
        for _ in 0..50 {
            env.reap_detached();
            if env.detached.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        assert!(env.detached.is_empty());
    }
}
