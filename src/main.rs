use argh::FromArgs;
use minish::Interpreter;
use minish::config::Config;
use std::process::exit;

#[derive(FromArgs)]
/// A small interactive shell.
struct Cli {
    #[argh(option)]
    /// text shown before every input line.
    prompt: Option<String>,

    #[argh(option)]
    /// program used by `open` to show a file.
    viewer: Option<String>,

    #[argh(switch, short = 'q')]
    /// do not print a farewell message on exit.
    quiet: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli: Cli = argh::from_env();
    let mut config = Config::from_process_env();
    if let Some(prompt) = cli.prompt {
        config.prompt = prompt;
    }
    if let Some(viewer) = cli.viewer {
        config.viewer = viewer;
    }
    if cli.quiet {
        config.farewell = false;
    }

    if let Err(e) = Interpreter::with_config(config).repl() {
        log::error!("{:#}", e);
        exit(1);
    }
}
