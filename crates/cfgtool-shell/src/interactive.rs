//! Interactive prompts and the read-eval-print loop
//!
//! Uses dialoguer for confirmations and plain line input for commands.

use colored::Colorize;
use dialoguer::Confirm;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::error::{CliError, Result};
use crate::shell::{LineStatus, Shell};

const PROMPT: &str = "(szcfg) ";

/// Answers yes/no questions before destructive commands.
pub trait Confirmer {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Ask on the terminal.
#[derive(Debug, Default)]
pub struct Prompt;

impl Confirmer for Prompt {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
    }
}

/// Refuse: nobody is there to ask.
#[derive(Debug, Default)]
pub struct Refuse;

impl Confirmer for Refuse {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Err(CliError::user(format!("'{prompt}' needs confirmation; rerun with --force")))
    }
}

/// Always give the same answer.
#[derive(Debug, Clone, Copy)]
pub struct Answer(pub bool);

impl Confirmer for Answer {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(self.0)
    }
}

/// Read commands from `input` until end of input or `quit`.
///
/// History is read from and written back to `history_file` when given.
pub fn run_repl(shell: &mut Shell<'_>, input: &mut dyn BufRead, history_file: Option<&Path>) -> Result<()> {
    if let Some(path) = history_file
        && let Ok(text) = fs::read_to_string(path)
    {
        shell.load_history(text.lines().map(str::to_string));
    }

    let theme = shell.theme();
    println!(
        "{} Type {} for a list of commands.",
        theme.header("sz_configtool"),
        "help".cyan()
    );

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut line = String::new();
    loop {
        print!("{PROMPT}");
        io::stdout().flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let status = shell.run_line(&line, &mut stdout.lock(), &mut stderr.lock())?;
        if status == LineStatus::Quit {
            break;
        }
    }

    if let Some(path) = history_file {
        save_history(path, shell.history())?;
    }
    Ok(())
}

fn save_history(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut text = lines.join("\n");
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Theme;
    use crate::shell::ShellOptions;
    use cfgtool_core::ConfigManager;
    use cfgtool_test_utils::TestConfig;
    use tempfile::TempDir;

    #[test]
    fn refuse_explains_force() {
        let err = Refuse.confirm("deleteDataSource X").unwrap_err();
        assert!(err.to_string().contains("--force"));
    }

    #[test]
    fn repl_runs_until_quit_and_saves_history() {
        let dir = TempDir::new().unwrap();
        let history = dir.path().join("hist").join("history");
        let mut manager = ConfigManager::open(Box::new(TestConfig::template().memory_store())).unwrap();
        let mut shell = Shell::new(
            &mut manager,
            ShellOptions {
                theme: Theme::None,
                ..ShellOptions::default()
            },
        );
        let mut input = io::Cursor::new("addDataSource CUSTOMERS\nquit\naddDataSource NEVER\n");
        run_repl(&mut shell, &mut input, Some(&history)).unwrap();

        let saved = fs::read_to_string(&history).unwrap();
        assert_eq!(saved, "addDataSource CUSTOMERS\nquit\n");
        assert!(shell.execute("getDataSource NEVER").is_err());
    }
}
