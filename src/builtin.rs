use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::env::Environment;
use crate::external::{self, ExternalCommand};
use crate::interpreter::Factory;
use anyhow::{Context, Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use std::fs::{self, OpenOptions};
use std::io::Write;

/// Name under which the user's compiled program is always run directly.
pub(crate) const SHOW_PROGRAM: &str = "./show.out";

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process. Some of them delegate the actual work to a helper program.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "say" or "cd".
    fn name() -> &'static str;

    /// Executes the command using provided IO streams and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    /// Errors are reported by the interpreter and never end the shell.
    fn execute(self, io: &mut Streams, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, io: &mut Streams, env: &mut Environment) -> Result<ExitCode> {
        log::debug!("running builtin {}", T::name());
        <T as BuiltinCommand>::execute(*self, io, env)
    }
}

/// Arguments the builtin could not accept, e.g. a second path for `cd`.
struct InvalidArgs {
    name: &'static str,
    output: String,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, _io: &mut Streams, _env: &mut Environment) -> Result<ExitCode> {
        bail!("{}: {}", self.name, self.output.trim_end());
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            // Words are operands only: `help` and `-n` must not read as options.
            let operands = [&["--"][..], args].concat();
            Some(match T::from_args(&[name], &operands) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, .. }) => Box::new(InvalidArgs {
                    name: T::name(),
                    output,
                }),
            })
        } else {
            None
        }
    }
}

/// `./show.out`: the arguments go to the program untouched.
pub struct ShowOut;

impl CommandFactory for Factory<ShowOut> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        (name == SHOW_PROGRAM).then(|| {
            Box::new(ExternalCommand::new(
                name.to_string(),
                args.iter().map(|x| x.to_string()).collect(),
            )) as Box<dyn ExecutableCommand>
        })
    }
}

#[derive(FromArgs)]
/// leave the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _io: &mut Streams, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _io: &mut Streams, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.target {
            Some(t) if !t.is_empty() => t,
            _ => bail!("cd: missing argument"),
        };

        // `join` keeps absolute targets as they are
        let new_dir = env.current_dir.join(&target);
        let canonical =
            fs::canonicalize(&new_dir).with_context(|| format!("cd: {}", target))?;
        if !canonical.is_dir() {
            bail!("cd: {}: not a directory", target);
        }

        log::debug!("cd {} -> {}", target, canonical.display());
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print a message followed by a newline.
pub struct Say {
    #[argh(positional, greedy)]
    /// message to print; only the first word is used.
    pub words: Vec<String>,
}

impl BuiltinCommand for Say {
    fn name() -> &'static str {
        "say"
    }

    fn execute(self, io: &mut Streams, _env: &mut Environment) -> Result<ExitCode> {
        let message = self
            .words
            .first()
            .ok_or_else(|| anyhow!("say: missing message"))?;
        writeln!(io.stdout, "{}", message)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// create a file if needed and open it in the viewer, without waiting.
pub struct Open {
    #[argh(positional)]
    /// file to open; created empty when absent.
    pub filename: Option<String>,
}

impl BuiltinCommand for Open {
    fn name() -> &'static str {
        "open"
    }

    fn execute(self, io: &mut Streams, env: &mut Environment) -> Result<ExitCode> {
        let Some(filename) = self.filename else {
            bail!("open: missing filename");
        };

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(env.current_dir.join(&filename))
            .with_context(|| format!("open: {}", filename))?;

        let child =
            external::spawn_detached(&env.config.viewer, &[filename], &mut *io.stdout, env)?;
        env.detached.push(child);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print the contents of a file.
pub struct Display {
    #[argh(positional)]
    /// file to print.
    pub filename: Option<String>,
}

impl BuiltinCommand for Display {
    fn name() -> &'static str {
        "display"
    }

    fn execute(self, io: &mut Streams, env: &mut Environment) -> Result<ExitCode> {
        let Some(filename) = self.filename else {
            bail!("display: missing filename");
        };
        Ok(external::run(&env.config.concat_program, &[filename], io, env)?)
    }
}

#[derive(FromArgs)]
/// print a calendar: `calendar <year>` for a whole year, `calendar <month> <year>` for one month.
pub struct Calendar {
    #[argh(positional, greedy)]
    /// a year, or a month followed by a year.
    pub args: Vec<String>,
}

fn parse_number(s: &str) -> Option<i64> {
    s.parse().ok()
}

impl Calendar {
    fn print_month(month: i64, year: i64, io: &mut Streams, env: &Environment) -> Result<ExitCode> {
        let args = [month.to_string(), year.to_string()];
        Ok(external::run(&env.config.calendar_program, &args, io, env)?)
    }
}

impl BuiltinCommand for Calendar {
    fn name() -> &'static str {
        "calendar"
    }

    fn execute(self, io: &mut Streams, env: &mut Environment) -> Result<ExitCode> {
        match self.args.as_slice() {
            [] => bail!("calendar: missing arguments"),
            [year] => {
                let year = parse_number(year)
                    .filter(|y| *y >= 1)
                    .ok_or_else(|| anyhow!("calendar: invalid year"))?;
                let mut status = 0;
                for month in 1..=12 {
                    let code = Self::print_month(month, year, io, env)?;
                    if code != 0 {
                        status = code;
                    }
                }
                Ok(status)
            }
            [month, year, ..] => {
                let month = parse_number(month).filter(|m| (1..=12).contains(m));
                let year = parse_number(year).filter(|y| *y >= 1);
                match (month, year) {
                    (Some(month), Some(year)) => Self::print_month(month, year, io, env),
                    _ => bail!("calendar: invalid month or year"),
                }
            }
        }
    }
}
