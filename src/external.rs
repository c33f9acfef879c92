use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdout, Streams};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::Result;
use std::ffi::OsStr;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};
use thiserror::Error;

/// Process creation failed for lack of system resources.
///
/// The shell cannot be trusted to keep working after this and terminates.
#[derive(Debug, Error)]
#[error("cannot create process")]
pub struct SpawnError(#[source] pub io::Error);

/// A command that could not be run. The shell reports it and carries on.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{0}: command not found")]
    NotFound(String),
    #[error("{program}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program}: cannot set up standard streams")]
    Stdio {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program}: wait failed")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    /// Exit status the shell reports for the failed command.
    pub fn status(&self) -> ExitCode {
        match self {
            ExecError::NotFound(_) => 127,
            ExecError::Launch { .. } => 126,
            ExecError::Stdio { .. } | ExecError::Wait { .. } => 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Command that is not a builtin.
pub struct ExternalCommand {
    name: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(name: String, args: Vec<String>) -> Self {
        Self { name, args }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        // Resolution happens at execution time so a miss is reported as
        // `ExecError::NotFound` with its own status.
        Some(Box::new(ExternalCommand::new(
            name.to_string(),
            args.iter().map(|x| x.to_string()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, io: &mut Streams, env: &mut Environment) -> Result<ExitCode> {
        Ok(run(&self.name, &self.args, io, env)?)
    }
}

/// Handle to a spawned child. Dropping it neither kills nor waits for the child.
#[derive(Debug)]
pub struct ChildHandle {
    program: String,
    child: Child,
}

impl ChildHandle {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Copies the child's piped standard output into `out` until it closes.
    ///
    /// Does nothing when the child's output was not piped.
    pub fn relay_stdout<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<(), ExecError> {
        if let Some(mut pipe) = self.child.stdout.take() {
            io::copy(&mut pipe, out)
                .and_then(|_| out.flush())
                .map_err(|source| ExecError::Stdio {
                    program: self.program.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Blocks until the child terminates and returns its exit code.
    pub fn wait(mut self) -> Result<ExitCode, RunError> {
        let status = self.child.wait().map_err(|source| ExecError::Wait {
            program: self.program.clone(),
            source,
        })?;
        let code = exit_code(status);
        log::debug!("{} (pid {}) exited with {}", self.program, self.child.id(), code);
        Ok(code)
    }

    /// Polls the child without blocking. Returns true once it is gone.
    pub fn try_reap(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                log::debug!("detached {} (pid {}) finished: {}", self.program, self.id(), status);
                true
            }
            Ok(None) => false,
            Err(e) => {
                log::warn!("cannot poll detached {} (pid {}): {}", self.program, self.id(), e);
                true
            }
        }
    }
}

/// Creates a child running `program` with `args`.
///
/// The child gets `stdin`/`stdout` as its standard streams, inherits standard
/// error, and runs in `env.current_dir` with `env.vars` added to its
/// environment. Nothing about this process's own descriptors changes.
pub fn spawn(
    program: &str,
    args: &[String],
    stdin: Stdio,
    stdout: Stdio,
    env: &Environment,
) -> Result<ChildHandle, RunError> {
    let search_paths = env.get_var("PATH").unwrap_or_default();
    let executable = find_command_path(OsStr::new(&search_paths), &env.current_dir, Path::new(program))
        .ok_or_else(|| ExecError::NotFound(program.to_string()))?;

    let mut cmd = std::process::Command::new(&executable);
    cmd.args(args)
        .stdin(stdin)
        .stdout(stdout)
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.arg0(program);
    }

    let child = cmd.spawn().map_err(|e| classify_spawn_error(program, e))?;
    log::debug!("spawned {} as pid {}", executable.display(), child.id());
    Ok(ChildHandle {
        program: program.to_string(),
        child,
    })
}

/// Runs `program` to completion with the given streams.
///
/// Streams backed by a descriptor are handed to the child directly. Any other
/// stdout is fed through a pipe, so in-memory writers see the child's output.
pub fn run(
    program: &str,
    args: &[String],
    io: &mut Streams,
    env: &Environment,
) -> Result<ExitCode, RunError> {
    let stdio_error = |source| ExecError::Stdio {
        program: program.to_string(),
        source,
    };
    let stdin = io.stdin.child_stdio().map_err(stdio_error)?;
    let stdout = io.stdout.child_stdio().map_err(stdio_error)?;

    let mut child = spawn(program, args, stdin, stdout.unwrap_or_else(Stdio::piped), env)?;
    child.relay_stdout(&mut *io.stdout)?;
    child.wait()
}

/// Starts `program` without waiting for it; the caller keeps the handle.
///
/// The child reads nothing. Its output goes to `stdout`, or nowhere when the
/// stream has no descriptor, since nobody is left to relay it.
pub fn spawn_detached(
    program: &str,
    args: &[String],
    stdout: &mut dyn Stdout,
    env: &Environment,
) -> Result<ChildHandle, RunError> {
    let stdout = stdout.child_stdio().map_err(|source| ExecError::Stdio {
        program: program.to_string(),
        source,
    })?;
    spawn(program, args, Stdio::null(), stdout.unwrap_or_else(Stdio::null), env)
}

/// Separates resource exhaustion (fatal) from a program the OS would not start.
fn classify_spawn_error(program: &str, err: io::Error) -> RunError {
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::OutOfMemory | ErrorKind::Unsupported => {
            SpawnError(err).into()
        }
        _ => ExecError::Launch {
            program: program.to_string(),
            source: err,
        }
        .into(),
    }
}

fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh` or `./foo`): returns
///   `cwd` joined with it if that exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first regular file with that name.
/// - Empty path: returns `None`.
pub fn find_command_path(search_paths: &OsStr, cwd: &Path, path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return find_by_path(path);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => {
            // Empty path -> not found
            None
        }
        (Some(x), None) if x.as_os_str() != "." && x.as_os_str() != ".." => {
            // Single component -> search in PATH
            find_in_path(search_paths, x.as_os_str())
        }
        _ => {
            // Multiple components -> search in current dir
            find_by_path(&cwd.join(path))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| path.is_file())
}

fn find_by_path(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        Some(path.to_path_buf())
    } else {
        None
    }
}
