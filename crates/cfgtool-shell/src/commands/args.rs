//! Reading command arguments.
//!
//! Arguments are words, `field=value` pairs, or one JSON object. Quotes
//! group words; brackets and braces keep JSON values in one token.

use cfgtool_core::{ApiRecord, EntityKind, Selector};
use serde_json::Value;

use super::{ArgStyle, CommandSpec};
use crate::error::{CliError, Result};
use crate::render::OutputFormat;

/// One argument word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Byte offset in `text` where the first quoted part began
    pub quoted_at: Option<usize>,
}

/// Split a line into tokens.
///
/// Outside brackets, single or double quotes group text and are removed.
/// Inside `[...]` or `{...}` everything is kept verbatim until the brackets
/// balance.
pub fn tokenize(line: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut quoted_at = None;
    let mut started = false;
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut in_json_string = false;
    let mut escaped = false;

    for c in line.chars() {
        if depth > 0 {
            text.push(c);
            if escaped {
                escaped = false;
            } else if in_json_string {
                match c {
                    '\\' => escaped = true,
                    '"' => in_json_string = false,
                    _ => {}
                }
            } else {
                match c {
                    '"' => in_json_string = true,
                    '[' | '{' => depth += 1,
                    ']' | '}' => depth -= 1,
                    _ => {}
                }
            }
            continue;
        }
        if let Some(q) = quote {
            if escaped {
                text.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            } else {
                text.push(c);
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                quoted_at.get_or_insert(text.len());
                started = true;
            }
            '[' | '{' => {
                depth = 1;
                text.push(c);
                started = true;
            }
            c if c.is_whitespace() => {
                if started {
                    tokens.push(Token {
                        text: std::mem::take(&mut text),
                        quoted_at: quoted_at.take(),
                    });
                    started = false;
                }
            }
            c => {
                text.push(c);
                started = true;
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if depth > 0 {
        return Err("unbalanced brackets".to_string());
    }
    if started {
        tokens.push(Token { text, quoted_at });
    }
    Ok(tokens)
}

/// Value of a `field=value` pair: quoted text stays a string, numbers and
/// JSON containers are parsed, anything else is a string.
pub fn field_value(text: &str, quoted: bool) -> Result<Value> {
    if quoted {
        return Ok(Value::String(text.to_string()));
    }
    if text.starts_with('[') || text.starts_with('{') {
        return serde_json::from_str(text)
            .map_err(|e| CliError::user(format!("Invalid JSON value {text}: {e}")));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::from(n));
    }
    if let Ok(x) = text.parse::<f64>()
        && x.is_finite()
        && !text.starts_with('.')
    {
        return Ok(Value::from(x));
    }
    Ok(Value::String(text.to_string()))
}

fn is_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parsed arguments of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub command: &'static str,
    usage: String,
    /// Argument text after any output format was removed
    pub raw: String,
    pub words: Vec<String>,
    pub fields: ApiRecord,
    pub format: Option<OutputFormat>,
}

impl Args {
    /// Read `text` the way `spec` expects.
    pub fn parse(spec: &CommandSpec, text: &str) -> Result<Self> {
        let mut args = Args {
            command: spec.name,
            usage: spec.synopsis(),
            raw: text.trim().to_string(),
            words: Vec::new(),
            fields: ApiRecord::new(),
            format: None,
        };

        if spec.args.takes_format()
            && let Some((rest, last)) = split_last_word(&args.raw)
            && let Ok(format) = last.parse::<OutputFormat>()
        {
            args.format = Some(format);
            args.raw = rest.to_string();
        }

        match spec.args {
            ArgStyle::None => {
                if !args.raw.is_empty() {
                    return Err(args.usage_error("takes no arguments"));
                }
            }
            ArgStyle::Text | ArgStyle::Path => {
                args.raw = strip_quotes(&args.raw).to_string();
            }
            _ if args.raw.starts_with('{') => {
                let value: Value = serde_json::from_str(&args.raw)
                    .map_err(|e| args.usage_error(format!("invalid JSON: {e}")))?;
                match value {
                    Value::Object(map) => args.fields = map,
                    _ => return Err(args.usage_error("expected a JSON object")),
                }
            }
            _ => {
                let tokens = tokenize(&args.raw).map_err(|e| args.usage_error(e))?;
                for token in tokens {
                    match token.text.split_once('=') {
                        Some((name, value))
                            if is_field_name(name) && token.quoted_at.is_none_or(|q| q > name.len()) =>
                        {
                            let value = field_value(value, token.quoted_at.is_some())?;
                            args.fields.insert(name.to_string(), value);
                        }
                        _ => args.words.push(token.text),
                    }
                }
            }
        }
        Ok(args)
    }

    pub fn usage_error(&self, message: impl Into<String>) -> CliError {
        CliError::usage(format!("{}: {}", self.command, message.into()), self.usage.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.fields.is_empty()
    }

    /// A named argument, given either as `name=value` or as the word at `position`.
    pub fn get(&self, name: &str, position: usize) -> Option<String> {
        match self.fields.get(name) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => self.words.get(position).cloned(),
            Some(other) => Some(other.to_string()),
        }
    }

    pub fn require(&self, name: &str, position: usize) -> Result<String> {
        self.get(name, position)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| self.usage_error(format!("{name} is required")))
    }

    /// A named argument as a JSON value; positional words are parsed like `field=value`.
    pub fn value(&self, name: &str, position: usize) -> Result<Option<Value>> {
        match self.fields.get(name) {
            Some(value) => Ok(Some(value.clone())),
            None => self.words.get(position).map(|w| field_value(w, false)).transpose(),
        }
    }

    /// Fields other than the named ones.
    pub fn fields_without(&self, names: &[&str]) -> ApiRecord {
        let mut fields = self.fields.clone();
        for name in names {
            fields.shift_remove(*name);
        }
        fields
    }

    /// Fields for creating a `kind` row. Leading words fill the code field
    /// and then the description; for kinds without a code they fill the key
    /// fields in order.
    pub fn record_fields(&self, kind: EntityKind) -> Result<ApiRecord> {
        let spec = kind.spec();
        let mut fields = self.fields.clone();
        let mut words = self.words.iter();

        let slots: Vec<&str> = match spec.code_api_name() {
            Some(code) => vec![code],
            None => key_api_names(kind),
        };
        for slot in slots {
            let Some(word) = words.next() else { break };
            fields.entry(slot.to_string()).or_insert_with(|| Value::String(word.clone()));
        }
        let rest: Vec<&str> = words.map(String::as_str).collect();
        if !rest.is_empty() {
            if spec.code_field.is_none() || spec.field_by_api("description").is_none() {
                return Err(self.usage_error(format!("unexpected argument '{}'", rest.join(" "))));
            }
            fields
                .entry("description".to_string())
                .or_insert_with(|| Value::String(rest.join(" ")));
        }
        Ok(fields)
    }

    /// The row a command addresses, and the remaining fields.
    ///
    /// A leading word selects by id when numeric, by code when the kind has
    /// one, and otherwise fills the key fields in order. Without words the
    /// selection comes from an `id`, code, or key fields among the fields.
    pub fn selection(&self, kind: EntityKind) -> Result<(Selector, ApiRecord)> {
        let spec = kind.spec();
        let keys = key_api_names(kind);

        if let Some(first) = self.words.first() {
            if let Ok(id) = first.parse::<i64>()
                && spec.id_field.is_some()
            {
                return Ok((Selector::Id(id), self.fields.clone()));
            }
            if spec.code_field.is_some() {
                if self.words.len() > 1 {
                    return Err(self.usage_error(format!("unexpected argument '{}'", self.words[1..].join(" "))));
                }
                return Ok((Selector::Code(first.clone()), self.fields.clone()));
            }
            if self.words.len() > keys.len() {
                return Err(self.usage_error("too many key values"));
            }
            let mut key = ApiRecord::new();
            for (name, word) in keys.iter().zip(&self.words) {
                key.insert((*name).to_string(), Value::String(word.clone()));
            }
            return Ok((self.complete_key(kind, key), self.fields.clone()));
        }

        let mut rest = self.fields.clone();
        if let Some(id) = rest.shift_remove("id") {
            let id = id
                .as_i64()
                .or_else(|| id.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| self.usage_error("id must be an integer"))?;
            return Ok((Selector::Id(id), rest));
        }
        if let Some(code_name) = spec.code_api_name()
            && let Some(code) = rest.shift_remove(code_name)
        {
            let code = code.as_str().map(str::to_string).unwrap_or_else(|| code.to_string());
            return Ok((Selector::Code(code), rest));
        }
        let mut key = ApiRecord::new();
        for name in keys {
            if let Some(value) = rest.shift_remove(name) {
                key.insert(name.to_string(), value);
            }
        }
        if key.is_empty() {
            return Err(self.usage_error(format!("name the {kind} to use")));
        }
        Ok((self.complete_key(kind, key), rest))
    }

    /// Thresholds keyed by feature default to the `ALL` wildcard.
    fn complete_key(&self, kind: EntityKind, mut key: ApiRecord) -> Selector {
        if matches!(kind, EntityKind::ComparisonThreshold | EntityKind::GenericThreshold) {
            key.entry("feature".to_string())
                .or_insert_with(|| Value::String("ALL".to_string()));
        }
        Selector::Key(key)
    }
}

/// API names of a kind's key fields.
pub(crate) fn key_api_names(kind: EntityKind) -> Vec<&'static str> {
    let spec = kind.spec();
    spec.key_fields
        .iter()
        .filter_map(|f| spec.field(f).and_then(|field| field.api()))
        .collect()
}

fn split_last_word(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_end();
    if text.is_empty() {
        return None;
    }
    match text.rfind(char::is_whitespace) {
        Some(at) => Some((text[..at].trim_end(), &text[at + 1..])),
        None => Some(("", text)),
    }
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    for q in ['"', '\''] {
        if let Some(inner) = text.strip_prefix(q).and_then(|t| t.strip_suffix(q)) {
            return inner;
        }
    }
    text
}
