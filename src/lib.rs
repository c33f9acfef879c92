//! A small interactive shell with a fixed set of built-ins.
//!
//! A line is split on whitespace, stripped of `<`/`>` redirections and then
//! routed either to a built-in implemented in Rust (`exit`, `cd`, `say`, `open`,
//! `display`, `./show.out`, `calendar`) or to an external program found through
//! `PATH`. Redirections are applied to the command's own streams only, so they
//! never leak into the next line.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`] and
//! [`env`] expose the traits and the process context needed to plug in more
//! commands, and [`io_adapters`] provides in-memory streams for embedding.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod external;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod redirect;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
pub use io_adapters::{MemReader, MemWriter};
