//! sz_configtool: edit the entity-resolution configuration from a shell,
//! a script file, or `-c` commands.

use clap::Parser;
use colored::Colorize;
use std::fs;
use std::io::{self, BufRead, IsTerminal};
use tracing::{debug, warn};

use cfgtool_core::ConfigManager;
use cfgtool_shell::cli::Cli;
use cfgtool_shell::error::Result;
use cfgtool_shell::interactive::run_repl;
use cfgtool_shell::settings::{ColorChoice, SettingsResolver};
use cfgtool_shell::{Shell, ShellOptions, Theme, logging};
use cfgtool_store::FileStore;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}[{}]: {}", "error".red().bold(), e.code(), e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every command succeeded.
fn run() -> Result<bool> {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("warning: logging disabled: {e}");
    }

    let mut settings = SettingsResolver::new(cli.config.clone()).resolve()?;
    cli.apply(&mut settings);

    let mut theme = cli.theme;
    match settings.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => {
            colored::control::set_override(false);
            theme = Theme::None;
        }
        ColorChoice::Auto => {}
    }

    let store_dir = settings.store_dir();
    debug!(store = %store_dir.display(), "Opening configuration store");
    let store = FileStore::open(&store_dir)?;
    let mut manager = ConfigManager::open(Box::new(store))?;

    let stdin = io::stdin();
    let interactive = !cli.is_batch() && stdin.is_terminal();
    let options = ShellOptions {
        force: settings.force,
        interactive,
        theme,
        default_format: settings.default_format,
        history_limit: settings.history_limit,
    };

    let succeeded = {
        let mut shell = Shell::new(&mut manager, options);
        let mut out = io::stdout().lock();
        let mut err = io::stderr().lock();
        if !cli.commands.is_empty() {
            shell.run_script(&cli.commands, &mut out, &mut err)?
        } else if let Some(file) = &cli.file {
            let script = fs::read_to_string(file)?;
            shell.run_script(script.lines(), &mut out, &mut err)?
        } else if interactive {
            drop((out, err));
            run_repl(&mut shell, &mut stdin.lock(), settings.history_file.as_deref())?;
            true
        } else {
            let lines = stdin.lock().lines().collect::<io::Result<Vec<_>>>()?;
            shell.run_script(lines, &mut out, &mut err)?
        }
    };

    if manager.is_dirty() && !interactive {
        let pending = manager.journal()?.len();
        warn!(pending, "Exiting with unsaved changes; add 'save' to keep them");
    }
    Ok(succeeded)
}
