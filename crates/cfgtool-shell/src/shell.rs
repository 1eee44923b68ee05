//! The command shell: reads command lines, runs them against a
//! [`ConfigManager`], and renders results and errors.
//!
//! The shell borrows the manager and keeps only its own session state
//! (history, output formats, theme), so dropping a shell and opening another
//! over the same manager loses nothing.

use cfgtool_core::{ConfigManager, Error as CoreError};
use std::io::{self, Write};
use tracing::debug;

use crate::commands::{self, ArgStyle, Args};
use crate::error::{CliError, Result};
use crate::interactive::{Confirmer, Prompt, Refuse};
use crate::render::{self, Output, OutputFormat, Theme};
use crate::suggest::suggest;

/// Options fixed for the life of a shell.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellOptions {
    /// Skip confirmations
    pub force: bool,
    /// A person is typing; prompts are allowed
    pub interactive: bool,
    pub theme: Theme,
    pub default_format: OutputFormat,
    pub history_limit: usize,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            force: false,
            interactive: false,
            theme: Theme::Default,
            default_format: OutputFormat::Json,
            history_limit: 1000,
        }
    }
}

/// How a line ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Ok,
    Failed,
    Quit,
}

pub struct Shell<'m> {
    pub(crate) manager: &'m mut ConfigManager,
    pub(crate) options: ShellOptions,
    pub(crate) record_format: OutputFormat,
    pub(crate) list_format: OutputFormat,
    pub(crate) history: Vec<String>,
    pub(crate) confirmer: Box<dyn Confirmer + 'm>,
}

impl<'m> Shell<'m> {
    /// A shell over `manager`. Interactive shells confirm with a prompt;
    /// others refuse destructive commands unless forced.
    pub fn new(manager: &'m mut ConfigManager, options: ShellOptions) -> Self {
        let confirmer: Box<dyn Confirmer> = if options.interactive {
            Box::new(Prompt)
        } else {
            Box::new(Refuse)
        };
        Self {
            manager,
            record_format: options.default_format,
            list_format: options.default_format,
            options,
            history: Vec::new(),
            confirmer,
        }
    }

    pub fn with_confirmer(mut self, confirmer: impl Confirmer + 'm) -> Self {
        self.confirmer = Box::new(confirmer);
        self
    }

    pub fn manager(&self) -> &ConfigManager {
        self.manager
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Seed history, e.g. from a history file; keeps the newest lines.
    pub fn load_history(&mut self, lines: impl IntoIterator<Item = String>) {
        self.history.extend(lines.into_iter().filter(|l| !l.trim().is_empty()));
        self.trim_history();
    }

    pub fn theme(&self) -> Theme {
        self.options.theme
    }

    fn trim_history(&mut self) {
        let limit = self.options.history_limit;
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }

    /// Run one command line. Blank lines and `#` comments do nothing.
    pub fn execute(&mut self, line: &str) -> Result<Output> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Output::Nothing);
        }
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest),
            None => (line, ""),
        };
        let spec = commands::lookup(name).ok_or_else(|| CliError::UnknownCommand {
            name: name.to_string(),
            suggestions: suggest(name, commands::names()),
        })?;
        if spec.name != "history" {
            self.history.push(line.to_string());
            self.trim_history();
        }

        let args = Args::parse(spec, rest)?;
        if let Some(format) = args.format {
            match spec.args {
                ArgStyle::Listing => self.list_format = format,
                _ => self.record_format = format,
            }
        }
        if spec.action.needs_confirmation() && !self.options.force {
            let prompt = format!("{} {}?", spec.name, args.raw);
            if !self.confirmer.confirm(prompt.trim_end())? {
                return Ok(Output::Info("Cancelled".to_string()));
            }
        }
        debug!(command = spec.name, "Executing command");
        self.dispatch(spec, &args)
    }

    /// Render an output in the current formats.
    pub fn render(&self, output: &Output) -> String {
        let format = match output {
            Output::List(_) => self.list_format,
            _ => self.record_format,
        };
        render::render(output, format, self.options.theme)
    }

    /// Render an error with the command that raised it, its code, and the
    /// rows blocking it.
    pub fn render_error(&self, line: &str, err: &CliError) -> String {
        let theme = self.options.theme;
        let mut text = format!("{}: {}\n  {}", theme.error(&format!("error[{}]", err.code())), line.trim(), err);
        match err {
            CliError::Core(CoreError::ReferentialIntegrity { dependents, .. }) => {
                text.push_str("\n  blocked by:");
                for dependent in dependents {
                    text.push_str(&format!("\n    - {dependent}"));
                }
            }
            CliError::Core(CoreError::Validation { report }) => {
                text.push_str("\n  issues:");
                for issue in report.issues() {
                    text.push_str(&format!("\n    - {issue}"));
                }
            }
            _ => {}
        }
        text
    }

    /// Execute a line and print its result to `out` or its error to `err`.
    pub fn run_line(&mut self, line: &str, out: &mut dyn Write, err: &mut dyn Write) -> io::Result<LineStatus> {
        match self.execute(line) {
            Ok(Output::Quit) => Ok(LineStatus::Quit),
            Ok(output) => {
                let text = self.render(&output);
                if !text.is_empty() {
                    writeln!(out, "{text}")?;
                }
                Ok(LineStatus::Ok)
            }
            Err(e) => {
                writeln!(err, "{}", self.render_error(line, &e))?;
                Ok(LineStatus::Failed)
            }
        }
    }

    /// Run lines in order, stopping at the first failure or `quit`.
    /// Returns whether every line succeeded.
    pub fn run_script<I, S>(&mut self, lines: I, out: &mut dyn Write, err: &mut dyn Write) -> io::Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            match self.run_line(line.as_ref(), out, err)? {
                LineStatus::Ok => {}
                LineStatus::Quit => break,
                LineStatus::Failed => return Ok(false),
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactive::Answer;
    use cfgtool_test_utils::TestConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn manager() -> ConfigManager {
        ConfigManager::open(Box::new(TestConfig::template().memory_store())).unwrap()
    }

    fn options() -> ShellOptions {
        ShellOptions {
            theme: Theme::None,
            ..ShellOptions::default()
        }
    }

    #[test]
    fn unknown_command_suggests_near_matches() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, options());
        let err = shell.execute("listDataSorces").unwrap_err();
        match err {
            CliError::UnknownCommand { suggestions, .. } => {
                assert_eq!(suggestions.first().map(String::as_str), Some("listDataSources"));
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn comments_and_blank_lines_do_nothing() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, options());
        assert_eq!(shell.execute("  # a comment").unwrap(), Output::Nothing);
        assert_eq!(shell.execute("").unwrap(), Output::Nothing);
        assert!(shell.history().is_empty());
    }

    #[test]
    fn list_format_suffix_sticks() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, options());
        shell.execute("listDataSources jsonl").unwrap();
        let output = shell.execute("listDataSources").unwrap();
        let text = shell.render(&output);
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with('{'));
    }

    #[test]
    fn declined_delete_changes_nothing() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, options()).with_confirmer(Answer(false));
        assert_eq!(
            shell.execute("deleteDataSource SEARCH").unwrap(),
            Output::Info("Cancelled".into())
        );
        assert!(!shell.manager().is_dirty());
    }

    #[test]
    fn non_interactive_delete_needs_force() {
        let mut manager = manager();
        {
            let mut shell = Shell::new(&mut manager, options());
            assert!(shell.execute("deleteDataSource SEARCH").is_err());
        }
        let mut shell = Shell::new(
            &mut manager,
            ShellOptions {
                force: true,
                ..options()
            },
        );
        shell.execute("deleteDataSource SEARCH").unwrap();
        assert!(shell.manager().is_dirty());
    }

    #[test]
    fn state_survives_a_new_shell() {
        let mut manager = manager();
        {
            let mut shell = Shell::new(&mut manager, options());
            shell.execute("addDataSource CUSTOMERS").unwrap();
        }
        let mut shell = Shell::new(&mut manager, options());
        let Output::Record(view) = shell.execute("getDataSource CUSTOMERS").unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(view["dataSource"], json!("CUSTOMERS"));
        assert!(shell.manager().is_dirty());
    }

    #[test]
    fn blocked_delete_renders_dependents() {
        let mut manager = manager();
        let mut shell = Shell::new(
            &mut manager,
            ShellOptions {
                force: true,
                ..options()
            },
        );
        let line = "deleteElement FULL_NAME";
        let err = shell.execute(line).unwrap_err();
        let text = shell.render_error(line, &err);
        assert!(text.starts_with("error[CFG004]: deleteElement FULL_NAME"), "{text}");
        assert!(text.contains("blocked by:"), "{text}");
        assert!(text.contains("    - "), "{text}");
    }

    #[test]
    fn script_stops_at_first_failure() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, options());
        let mut out = Vec::new();
        let mut err = Vec::new();
        let ok = shell
            .run_script(["addDataSource A", "addDataSource A", "addDataSource B"], &mut out, &mut err)
            .unwrap();
        assert!(!ok);
        let errors = String::from_utf8(err).unwrap();
        assert!(errors.contains("error[CFG002]"), "{errors}");
        assert!(shell.execute("getDataSource B").is_err());
    }

    #[test]
    fn history_is_capped() {
        let mut manager = manager();
        let mut shell = Shell::new(
            &mut manager,
            ShellOptions {
                history_limit: 2,
                ..options()
            },
        );
        for line in ["validate", "showChanges", "listDataSources", "history"] {
            shell.execute(line).unwrap();
        }
        assert_eq!(shell.history(), ["showChanges", "listDataSources"]);
    }
}
