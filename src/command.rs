use crate::env::Environment;
use anyhow::Result;
use std::fs::File;
use std::io::{self, Read, Write};
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Abstraction over a readable input stream that can also be handed to a
/// spawned child as its standard input.
pub trait Stdin: Read {
    /// Produce a [`Stdio`] handle for `std::process::Command`.
    ///
    /// Called once per spawned child, so implementations must not give away
    /// their only descriptor.
    fn child_stdio(&mut self) -> io::Result<Stdio>;
}

impl Stdin for io::Stdin {
    fn child_stdio(&mut self) -> io::Result<Stdio> {
        Ok(Stdio::inherit())
    }
}

impl Stdin for File {
    fn child_stdio(&mut self) -> io::Result<Stdio> {
        Ok(self.try_clone()?.into())
    }
}

/// Abstraction over a writable output stream that can also back a spawned
/// child's standard output.
pub trait Stdout: Write {
    /// Produce a [`Stdio`] handle the child can write to directly.
    ///
    /// `None` means the stream has no descriptor of its own; the executor then
    /// pipes the child's output and relays it into this writer.
    fn child_stdio(&mut self) -> io::Result<Option<Stdio>>;
}

impl Stdout for io::Stdout {
    fn child_stdio(&mut self) -> io::Result<Option<Stdio>> {
        // anything a built-in printed must land before the child's output
        self.flush()?;
        Ok(Some(Stdio::inherit()))
    }
}

impl Stdout for File {
    fn child_stdio(&mut self) -> io::Result<Option<Stdio>> {
        Ok(Some(self.try_clone()?.into()))
    }
}

/// The standard streams a single command runs with.
///
/// Built per command line: either the shell's own streams or the files named
/// by the line's redirections. Dropped when the command finishes.
pub struct Streams {
    pub stdin: Box<dyn Stdin>,
    pub stdout: Box<dyn Stdout>,
}

impl Streams {
    pub fn new(stdin: Box<dyn Stdin>, stdout: Box<dyn Stdout>) -> Self {
        Self { stdin, stdout }
    }

    /// The shell's own standard input and output.
    pub fn inherited() -> Self {
        Self::new(Box::new(io::stdin()), Box::new(io::stdout()))
    }
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command.
    fn execute(self: Box<Self>, io: &mut Streams, env: &mut Environment) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
