//! Change journal
//!
//! Every mutation of the document is recorded here, in order, until the next
//! successful save or reload. The journal is the only source of dirty state:
//! the document is dirty exactly when the journal is non-empty.

use chrono::{DateTime, Utc};
use cfgtool_schema::{Domain, EntityKind, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::fmt::{self, Write as _};

use crate::base::describe;
use crate::document::ConfigDocument;

/// A structural mutation of the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Create { kind: EntityKind, record: Record },
    Update { kind: EntityKind, before: Record, after: Record },
    Delete { kind: EntityKind, record: Record },
    AddSection { name: String, value: Value },
    RemoveSection { name: String },
    ReplaceSection { name: String, value: Value },
    SetVersion { version: String },
    ReplaceDocument { document: Box<ConfigDocument> },
}

impl Change {
    /// The domain allowed to make this change.
    pub fn domain(&self) -> Domain {
        match self {
            Change::Create { kind, .. } | Change::Update { kind, .. } | Change::Delete { kind, .. } => {
                kind.domain()
            }
            _ => Domain::System,
        }
    }

    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            Change::Create { kind, .. } | Change::Update { kind, .. } | Change::Delete { kind, .. } => {
                Some(*kind)
            }
            _ => None,
        }
    }

    pub fn op(&self) -> JournalOp {
        match self {
            Change::Create { .. } => JournalOp::Create,
            Change::Update { .. } => JournalOp::Update,
            Change::Delete { .. } => JournalOp::Delete,
            Change::AddSection { .. } => JournalOp::AddSection,
            Change::RemoveSection { .. } => JournalOp::RemoveSection,
            Change::ReplaceSection { .. } => JournalOp::ReplaceSection,
            Change::SetVersion { .. } => JournalOp::SetVersion,
            Change::ReplaceDocument { .. } => JournalOp::ReplaceDocument,
        }
    }

    /// Whether applying this change would leave the document as it is.
    pub fn is_noop(&self) -> bool {
        matches!(self, Change::Update { before, after, .. } if before == after)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalOp {
    Create,
    Update,
    Delete,
    AddSection,
    RemoveSection,
    ReplaceSection,
    SetVersion,
    ReplaceDocument,
}

impl fmt::Display for JournalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JournalOp::Create => "create",
            JournalOp::Update => "update",
            JournalOp::Delete => "delete",
            JournalOp::AddSection => "add section",
            JournalOp::RemoveSection => "remove section",
            JournalOp::ReplaceSection => "replace section",
            JournalOp::SetVersion => "set version",
            JournalOp::ReplaceDocument => "replace document",
        };
        f.write_str(name)
    }
}

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub op: JournalOp,
    /// Table or section touched
    pub table: String,
    pub kind: Option<EntityKind>,
    /// Identification of the touched row or section
    pub key: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl JournalEntry {
    fn from_change(seq: u64, change: &Change, before_doc: &ConfigDocument) -> Self {
        let (table, key, before, after) = match change {
            Change::Create { kind, record } => (
                kind.table().to_string(),
                describe(*kind, record),
                None,
                Some(Value::Object(record.clone())),
            ),
            Change::Update { kind, before, after } => (
                kind.table().to_string(),
                describe(*kind, before),
                Some(Value::Object(before.clone())),
                Some(Value::Object(after.clone())),
            ),
            Change::Delete { kind, record } => (
                kind.table().to_string(),
                describe(*kind, record),
                Some(Value::Object(record.clone())),
                None,
            ),
            Change::AddSection { name, value } => (name.clone(), name.clone(), None, Some(value.clone())),
            Change::RemoveSection { name } => (
                name.clone(),
                name.clone(),
                before_doc.section(name).cloned(),
                None,
            ),
            Change::ReplaceSection { name, value } => (
                name.clone(),
                name.clone(),
                before_doc.section(name).cloned(),
                Some(value.clone()),
            ),
            Change::SetVersion { version } => (
                crate::document::VERSION_SECTION.to_string(),
                "CONFIG_VERSION".to_string(),
                before_doc.schema_version().map(|v| Value::String(v.to_string())),
                Some(Value::String(version.clone())),
            ),
            Change::ReplaceDocument { .. } => (
                crate::document::ROOT_SECTION.to_string(),
                "document".to_string(),
                None,
                None,
            ),
        };
        Self {
            seq,
            timestamp: Utc::now(),
            op: change.op(),
            table,
            kind: change.kind(),
            key,
            before,
            after,
        }
    }

    /// A one-line summary: `#3 update CFG_DSRC CUSTOMERS`.
    pub fn summary(&self) -> String {
        format!("#{} {} {} {}", self.seq, self.op, self.table, self.key)
    }
}

/// Ordered, append-only log of mutations since the last save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    next_seq: u64,
}

impl Journal {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 1,
        }
    }

    /// Build the entry for `change` against the document it is about to be applied to.
    pub(crate) fn entry_for(&self, change: &Change, before_doc: &ConfigDocument) -> JournalEntry {
        JournalEntry::from_change(self.next_seq.max(1), change, before_doc)
    }

    pub(crate) fn push(&mut self, entry: JournalEntry) {
        self.next_seq = entry.seq + 1;
        self.entries.push(entry);
    }

    #[cfg(test)]
    pub(crate) fn record(&mut self, change: &Change, before_doc: &ConfigDocument) {
        let entry = self.entry_for(change, before_doc);
        self.push(entry);
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 1;
    }

    /// Human-readable report of pending changes with line diffs.
    pub fn render_report(&self) -> String {
        if self.entries.is_empty() {
            return "No pending changes\n".to_string();
        }
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{}", entry.summary());
            let before = pretty(entry.before.as_ref());
            let after = pretty(entry.after.as_ref());
            let diff = TextDiff::from_lines(&before, &after);
            for change in diff.iter_all_changes() {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => continue,
                };
                let _ = write!(out, "    {sign} {change}");
                if change.missing_newline() {
                    out.push('\n');
                }
            }
        }
        out
    }
}

fn pretty(value: Option<&Value>) -> String {
    match value {
        Some(value) => {
            let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            text.push('\n');
            text
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_doc() -> ConfigDocument {
        ConfigDocument::from_value(json!({
            "G2_CONFIG": {"CONFIG_BASE_VERSION": {"COMPATIBILITY_VERSION": {"CONFIG_VERSION": "11"}}}
        }))
        .unwrap()
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn sequence_numbers_increase_and_reset_on_clear() {
        let doc = empty_doc();
        let mut journal = Journal::new();
        let change = Change::Create {
            kind: EntityKind::DataSource,
            record: record(json!({"DSRC_ID": 1000, "DSRC_CODE": "A"})),
        };
        journal.record(&change, &doc);
        journal.record(&change, &doc);
        let seqs: Vec<u64> = journal.entries().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2]);

        journal.clear();
        assert!(journal.is_empty());
        journal.record(&change, &doc);
        assert_eq!(journal.entries()[0].seq, 1);
    }

    #[test]
    fn report_shows_changed_lines_only() {
        let doc = empty_doc();
        let mut journal = Journal::new();
        journal.record(
            &Change::Update {
                kind: EntityKind::DataSource,
                before: record(json!({"DSRC_ID": 1000, "DSRC_CODE": "A", "DSRC_DESC": "old"})),
                after: record(json!({"DSRC_ID": 1000, "DSRC_CODE": "A", "DSRC_DESC": "new"})),
            },
            &doc,
        );
        let report = journal.render_report();
        assert!(report.contains("#1 update CFG_DSRC A"), "{report}");
        assert!(report.contains("-   \"DSRC_DESC\": \"old\""), "{report}");
        assert!(report.contains("+   \"DSRC_DESC\": \"new\""), "{report}");
        assert!(!report.contains("DSRC_CODE"), "{report}");
    }

    #[test]
    fn identical_update_is_noop() {
        let r = record(json!({"DSRC_CODE": "A"}));
        let change = Change::Update {
            kind: EntityKind::DataSource,
            before: r.clone(),
            after: r,
        };
        assert!(change.is_noop());
    }
}
