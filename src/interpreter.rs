use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdin, Stdout, Streams};
use crate::config::Config;
use crate::env::Environment;
use crate::external::{ExecError, RunError};
use crate::lexer;
use crate::redirect::ExecutionRequest;
use anyhow::anyhow;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};

const FAREWELL: &str = "Exiting shell.";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only support commands defined in this crate: BuiltinCommand and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// The interpreter maintains an [`Environment`] and a list of [`CommandFactory`] objects
/// that are queried, in order, to create commands by name. See [`Default`] for the
/// built-in factories included out of the box.
///
/// Example
/// ```
/// use minish::{Interpreter, MemReader, MemWriter};
/// let mut sh = Interpreter::default();
/// let (out, captured) = MemWriter::with_handle();
/// let code = sh
///     .execute_line_with("say hello", Box::new(MemReader::new(Vec::new())), Box::new(out))
///     .unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(captured.borrow().as_slice(), b"hello\n");
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    stderr: Box<dyn Write>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self::with_environment(Environment::new(), commands)
    }

    pub fn with_environment(env: Environment, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env,
            commands,
            stderr: Box::new(io::stderr()),
        }
    }

    /// Interpreter with the default commands and the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self::with_environment(Environment::with_config(config), default_commands())
    }

    /// Send command diagnostics to `stderr` instead of the process's standard error.
    pub fn with_error_output(mut self, stderr: Box<dyn Write>) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    fn create(&self, name: &str, args: &[&str]) -> anyhow::Result<Box<dyn ExecutableCommand>> {
        self.commands
            .iter()
            .find_map(|factory| factory.try_create(&self.env, name, args))
            .ok_or_else(|| anyhow!("command not found: {}", name))
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// No tokenizing or redirection happens here. Returns the command's exit code
    /// or an error if the command cannot be created or fails to execute.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        let cmd = self.create(name, args)?;
        cmd.execute(&mut Streams::inherited(), &mut self.env)
    }

    /// Run one command line on the shell's own standard streams.
    ///
    /// Command failures are reported on the error output and turned into a
    /// non-zero status. Only a failure to create processes at all is returned
    /// as `Err`; the shell cannot go on after that.
    pub fn execute_line(&mut self, line: &str) -> anyhow::Result<ExitCode> {
        self.execute_line_with(line, Box::new(io::stdin()), Box::new(io::stdout()))
    }

    /// Same as [`Interpreter::execute_line`], with caller-provided default streams.
    ///
    /// Redirections in the line take precedence over `stdin` and `stdout`.
    pub fn execute_line_with(
        &mut self,
        line: &str,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
    ) -> anyhow::Result<ExitCode> {
        self.env.reap_detached();

        let line = lexer::clamp_line(line, self.env.config.max_line_length);
        let tokens = lexer::split_into_tokens(line, self.env.config.max_args);
        if tokens.is_empty() {
            return Ok(0);
        }
        log::debug!("tokens = {:?}", tokens);

        let request = ExecutionRequest::from_tokens(tokens);
        match self.dispatch(request, stdin, stdout) {
            Ok(code) => Ok(code),
            Err(err) if is_fatal(&err) => Err(err),
            Err(err) => {
                let _ = writeln!(self.stderr, "{:#}", err);
                let _ = self.stderr.flush();
                Ok(status_of(&err))
            }
        }
    }

    fn dispatch(
        &mut self,
        request: ExecutionRequest<'_>,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
    ) -> anyhow::Result<ExitCode> {
        let Some(name) = request.name() else {
            return Err(anyhow!("missing command"));
        };

        // The files live as long as this command; the shell's own streams
        // are never replaced.
        let opened = request.redirection.open(&self.env.current_dir)?;
        let mut io = opened.into_streams(stdin, stdout);

        let cmd = self.create(name, request.args())?;
        log::debug!("dispatching {} {:?}", name, request.args());
        let code = cmd.execute(&mut io, &mut self.env)?;
        io.stdout.flush()?;
        Ok(code)
    }

    /// Read-Eval-Print Loop on the terminal.
    ///
    /// Ends on end-of-input or after `exit`. Returns an error only when the
    /// line editor breaks or a process could not be created.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            let prompt = self.env.config.prompt.clone();
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    self.execute_line(&line)?;
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl-C drops the line being edited
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        if self.env.config.farewell {
            println!("{}", FAREWELL);
        }
        Ok(())
    }
}

fn is_fatal(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<RunError>(), Some(RunError::Spawn(_)))
}

fn status_of(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<RunError>() {
        Some(RunError::Exec(e)) => e.status(),
        _ => err.downcast_ref::<ExecError>().map_or(1, ExecError::status),
    }
}

fn default_commands() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    use crate::external::ExternalCommand;
    vec![
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Say>::default()),
        Box::new(Factory::<Open>::default()),
        Box::new(Factory::<Display>::default()),
        Box::new(Factory::<ShowOut>::default()),
        Box::new(Factory::<Calendar>::default()),
        Box::new(Factory::<ExternalCommand>::default()),
    ]
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `exit`, `cd`, `say`, `open`, `display`, `./show.out`, `calendar`
    /// - external command launcher for everything else
    fn default() -> Self {
        Self::new(default_commands())
    }
}
