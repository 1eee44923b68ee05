//! Formatting command results for the terminal.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How records and lists are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    #[default]
    Json,
    /// One compact JSON document per line
    Jsonl,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 3] = ["table", "json", "jsonl"];
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        })
    }
}

/// Colour scheme chosen with `setTheme`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Default,
    Light,
    Dark,
    /// No colour at all
    None,
}

impl Theme {
    pub const NAMES: [&'static str; 4] = ["default", "light", "dark", "none"];

    pub fn success(self, text: &str) -> String {
        match self {
            Theme::Default => text.green().to_string(),
            Theme::Light => text.blue().to_string(),
            Theme::Dark => text.bright_green().to_string(),
            Theme::None => text.to_string(),
        }
    }

    pub fn info(self, text: &str) -> String {
        match self {
            Theme::Default | Theme::Dark => text.cyan().to_string(),
            Theme::Light => text.magenta().to_string(),
            Theme::None => text.to_string(),
        }
    }

    pub fn error(self, text: &str) -> String {
        match self {
            Theme::None => text.to_string(),
            Theme::Dark => text.bright_red().bold().to_string(),
            _ => text.red().bold().to_string(),
        }
    }

    pub fn header(self, text: &str) -> String {
        match self {
            Theme::None => text.to_string(),
            _ => text.bold().to_string(),
        }
    }

    pub fn dimmed(self, text: &str) -> String {
        match self {
            Theme::None => text.to_string(),
            _ => text.dimmed().to_string(),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Theme::Default),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "none" => Ok(Theme::None),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// What a command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Nothing,
    Success(String),
    Info(String),
    /// One record; printed in the record format
    Record(Value),
    /// Rows; printed in the list format
    List(Vec<Value>),
    /// Preformatted text printed as is
    Text(String),
    /// Ends the session
    Quit,
}

/// Render an output for display. Returns an empty string when nothing
/// should be printed.
pub fn render(output: &Output, format: OutputFormat, theme: Theme) -> String {
    match output {
        Output::Nothing | Output::Quit => String::new(),
        Output::Success(message) => theme.success(message),
        Output::Info(message) => theme.info(message),
        Output::Text(text) => text.trim_end().to_string(),
        Output::Record(value) => match format {
            OutputFormat::Table => record_table(value, theme),
            OutputFormat::Json => pretty(value),
            OutputFormat::Jsonl => value.to_string(),
        },
        Output::List(rows) if rows.is_empty() => theme.info("No records found"),
        Output::List(rows) => match format {
            OutputFormat::Table => list_table(rows, theme),
            OutputFormat::Json => pretty(&Value::Array(rows.clone())),
            OutputFormat::Jsonl => rows.iter().map(Value::to_string).collect::<Vec<_>>().join("\n"),
        },
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Cell text for a value: strings bare, containers compact JSON.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn list_table(rows: &[Value], theme: Theme) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
    }
    if columns.is_empty() {
        return rows.iter().map(cell).collect::<Vec<_>>().join("\n");
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| row.get(*c).map(cell).unwrap_or_default()).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    let header: Vec<String> = columns.iter().zip(&widths).map(|(c, w)| pad(c, *w)).collect();
    lines.push(theme.header(header.join("  ").trim_end()));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    lines.push(theme.dimmed(&rule.join("  ")));
    for row in &cells {
        let line: Vec<String> = row.iter().zip(&widths).map(|(c, w)| pad(c, *w)).collect();
        lines.push(line.join("  ").trim_end().to_string());
    }
    lines.join("\n")
}

fn record_table(value: &Value, theme: Theme) -> String {
    let Value::Object(map) = value else {
        return cell(value);
    };
    let width = map.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    map.iter()
        .map(|(key, value)| format!("{}  {}", theme.header(&pad(key, width)), cell(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({"id": 1, "dataSource": "TEST"}),
            json!({"id": 1000, "dataSource": "CUSTOMERS", "description": "Customers"}),
        ]
    }

    #[test]
    fn table_has_header_rule_and_all_columns() {
        let text = render(&Output::List(rows()), OutputFormat::Table, Theme::None);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id    dataSource  description");
        assert!(lines[1].starts_with("----"));
        assert_eq!(lines[3], "1000  CUSTOMERS   Customers");
    }

    #[test]
    fn jsonl_prints_one_row_per_line() {
        let text = render(&Output::List(rows()), OutputFormat::Jsonl, Theme::None);
        assert_eq!(text.lines().count(), 2);
        assert_eq!(text.lines().next(), Some(r#"{"id":1,"dataSource":"TEST"}"#));
    }

    #[test]
    fn empty_list_says_so() {
        let text = render(&Output::List(Vec::new()), OutputFormat::Json, Theme::None);
        assert_eq!(text, "No records found");
    }

    #[test]
    fn formats_and_themes_parse_case_insensitively() {
        assert_eq!("JSONL".parse::<OutputFormat>(), Ok(OutputFormat::Jsonl));
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
