//! Extraction and opening of `<` / `>` redirections.
//!
//! Redirections may appear anywhere in a line. The operator and the word
//! after it are removed and the remaining words close ranks, so
//! `sort < in.txt -r` runs `sort -r` with `in.txt` on its standard input.

use crate::command::{Stdin, Stdout, Streams};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const INPUT_OPERATOR: &str = "<";
const OUTPUT_OPERATOR: &str = ">";

/// Destination named after a redirection operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Path(String),
    /// The operator ended the line or was followed by another operator.
    Missing,
}

/// Input and output redirection of one command line.
///
/// When an operator occurs more than once the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirection {
    pub input: Option<Target>,
    pub output: Option<Target>,
}

#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("{operator}: missing file name")]
    MissingPath { operator: &'static str },
    #[error("{}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Files opened for a command's redirections, ready to become its streams.
#[derive(Debug, Default)]
pub struct OpenedRedirection {
    pub stdin: Option<File>,
    pub stdout: Option<File>,
}

/// A cleaned argument list together with its redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest<'a> {
    pub argv: Vec<&'a str>,
    pub redirection: Redirection,
}

impl<'a> ExecutionRequest<'a> {
    pub fn from_tokens(tokens: Vec<&'a str>) -> Self {
        let (argv, redirection) = extract_redirections(tokens);
        Self { argv, redirection }
    }

    /// Program name, if anything is left after removing the redirections.
    pub fn name(&self) -> Option<&'a str> {
        self.argv.first().copied()
    }

    pub fn args(&self) -> &[&'a str] {
        self.argv.get(1..).unwrap_or_default()
    }
}

fn is_operator(token: &str) -> bool {
    token == INPUT_OPERATOR || token == OUTPUT_OPERATOR
}

/// Scans `tokens` once, left to right, and splits them into the cleaned
/// argument list and the redirection directive.
pub fn extract_redirections(tokens: Vec<&str>) -> (Vec<&str>, Redirection) {
    let mut argv = Vec::with_capacity(tokens.len());
    let mut redirection = Redirection::default();
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if !is_operator(token) {
            argv.push(token);
            continue;
        }
        let target = match iter.next_if(|next| !is_operator(next)) {
            Some(path) => Target::Path(path.to_string()),
            None => Target::Missing,
        };
        if token == INPUT_OPERATOR {
            redirection.input = Some(target);
        } else {
            redirection.output = Some(target);
        }
    }

    (argv, redirection)
}

impl Redirection {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }

    /// Opens the redirection targets, resolving relative paths against `cwd`.
    ///
    /// The input is opened read-only; the output is created or truncated with
    /// mode `0o666` before the umask. The input is opened first, so a bad input
    /// leaves the output file untouched.
    pub fn open(&self, cwd: &Path) -> Result<OpenedRedirection, RedirectError> {
        let stdin = match &self.input {
            Some(target) => {
                let path = resolve(cwd, target, INPUT_OPERATOR)?;
                Some(open_with(OpenOptions::new().read(true), path)?)
            }
            None => None,
        };

        let stdout = match &self.output {
            Some(target) => {
                let path = resolve(cwd, target, OUTPUT_OPERATOR)?;
                let mut options = OpenOptions::new();
                options.write(true).create(true).truncate(true);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::OpenOptionsExt;
                    options.mode(0o666);
                }
                Some(open_with(&options, path)?)
            }
            None => None,
        };

        Ok(OpenedRedirection { stdin, stdout })
    }
}

fn resolve(cwd: &Path, target: &Target, operator: &'static str) -> Result<PathBuf, RedirectError> {
    match target {
        Target::Path(path) => Ok(cwd.join(path)),
        Target::Missing => Err(RedirectError::MissingPath { operator }),
    }
}

fn open_with(options: &OpenOptions, path: PathBuf) -> Result<File, RedirectError> {
    options
        .open(&path)
        .map_err(|source| RedirectError::Open { path, source })
}

impl OpenedRedirection {
    /// Streams for the command: the opened files where present, the given
    /// defaults otherwise.
    pub fn into_streams(self, stdin: Box<dyn Stdin>, stdout: Box<dyn Stdout>) -> Streams {
        Streams::new(
            self.stdin.map_or(stdin, |f| Box::new(f) as Box<dyn Stdin>),
            self.stdout.map_or(stdout, |f| Box::new(f) as Box<dyn Stdout>),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{Read, Write};

    fn path(p: &str) -> Option<Target> {
        Some(Target::Path(p.to_string()))
    }

    #[test]
    fn test_trailing_redirections_are_removed() {
        let (argv, redirection) = extract_redirections(vec!["wc", "-l", "<", "in.txt"]);
        assert_eq!(argv, vec!["wc", "-l"]);
        assert_eq!(redirection.input, path("in.txt"));
        assert_eq!(redirection.output, None);
    }

    #[test]
    fn test_both_operators_are_honored() {
        let (argv, redirection) =
            extract_redirections(vec!["sort", "<", "in.txt", ">", "out.txt"]);
        assert_eq!(argv, vec!["sort"]);
        assert_eq!(redirection.input, path("in.txt"));
        assert_eq!(redirection.output, path("out.txt"));
    }

    #[test]
    fn test_mid_line_redirection_compacts_arguments() {
        let (argv, redirection) = extract_redirections(vec!["sort", ">", "out.txt", "-r", "-n"]);
        assert_eq!(argv, vec!["sort", "-r", "-n"]);
        assert_eq!(redirection.output, path("out.txt"));
    }

    #[test]
    fn test_last_occurrence_wins() {
        let (argv, redirection) = extract_redirections(vec!["ls", ">", "a", ">", "b"]);
        assert_eq!(argv, vec!["ls"]);
        assert_eq!(redirection.output, path("b"));
    }

    #[test]
    fn test_operator_without_path() {
        let (argv, redirection) = extract_redirections(vec!["cat", "<"]);
        assert_eq!(argv, vec!["cat"]);
        assert_eq!(redirection.input, Some(Target::Missing));

        let (argv, redirection) = extract_redirections(vec!["cat", ">", "<", "in.txt"]);
        assert_eq!(argv, vec!["cat"]);
        assert_eq!(redirection.output, Some(Target::Missing));
        assert_eq!(redirection.input, path("in.txt"));
    }

    #[test]
    fn test_request_without_redirections() {
        let request = ExecutionRequest::from_tokens(vec!["say", "hi"]);
        assert_eq!(request.name(), Some("say"));
        assert_eq!(request.args(), &["hi"]);
        assert!(request.redirection.is_empty());

        let request = ExecutionRequest::from_tokens(vec![">", "out.txt"]);
        assert_eq!(request.name(), None);
        assert!(request.args().is_empty());
    }

    #[test]
    fn test_open_creates_and_truncates_output() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("out.txt"), "old content").unwrap();

        let redirection = Redirection {
            input: None,
            output: path("out.txt"),
        };
        let opened = redirection.open(dir.path()).unwrap();
        assert!(opened.stdin.is_none());
        opened.stdout.unwrap().write_all(b"new").unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "new");
    }

    #[test]
    fn test_open_reads_input_relative_to_cwd() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in.txt"), "hello").unwrap();

        let redirection = Redirection {
            input: path("in.txt"),
            output: None,
        };
        let mut buf = String::new();
        redirection
            .open(dir.path())
            .unwrap()
            .stdin
            .unwrap()
            .read_to_string(&mut buf)
            .unwrap();

        assert_eq!(buf, "hello");
    }

    #[test]
    fn test_missing_input_aborts_before_output_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let redirection = Redirection {
            input: path("absent.txt"),
            output: path("out.txt"),
        };

        let err = redirection.open(dir.path()).unwrap_err();
        assert!(matches!(err, RedirectError::Open { .. }));
        assert!(err.to_string().ends_with("absent.txt"));
        assert!(!dir.path().join("out.txt").exists());
    }

    #[test]
    fn test_missing_path_is_reported_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let redirection = Redirection {
            input: None,
            output: Some(Target::Missing),
        };

        let err = redirection.open(dir.path()).unwrap_err();
        assert!(matches!(err, RedirectError::MissingPath { operator: ">" }));
    }
}
