//! The command surface: a static table from command name to [`Action`].
//!
//! Every command is one [`CommandSpec`] row. Looking a command up is a
//! single case-insensitive search of [`COMMANDS`]; parsing its arguments is
//! driven by the row's [`ArgStyle`]; executing it is one `match` on the
//! [`Action`] in `dispatch`.

mod args;
mod dispatch;
mod table;

pub use args::{Args, Token, field_value, tokenize};
pub use table::COMMANDS;

use cfgtool_core::{CallFamily, EntityKind};
use std::fmt;

/// Which hash call a shortcut command edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashCall {
    /// The name hasher expression call
    Name,
    /// The name + SSN last-4 expression call
    SsnLast4,
}

/// What a command does. Entity commands carry the kind they work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Help,
    Quit,
    History,
    SetTheme,
    ShowChanges,
    Validate,
    Save,
    Reload,
    GetDefaultConfigId,
    GetConfigRegistry,
    ExportToFile,
    ImportFromFile,
    Statistics,

    Touch,
    GetCompatibilityVersion,
    UpdateCompatibilityVersion,
    VerifyCompatibilityVersion,
    ListSections,
    GetSection,
    AddSection,
    RemoveSection,
    AddSectionField,
    RemoveSectionField,
    GetParameter,
    SetParameter,
    ListReferenceCodes,

    List(EntityKind),
    Get(EntityKind),
    Add(EntityKind),
    Set(EntityKind),
    Delete(EntityKind),

    TemplateAdd,
    SetFeatureActive(bool),
    UpdateFeatureVersion,
    AddElementToFeature,
    DeleteElementFromFeature,
    /// Update a feature/element binding; with a field name, the third word is its value
    SetFeatureElement(Option<&'static str>),

    AddCallElement(CallFamily),
    DeleteCallElement(CallFamily),
    AddToHash(HashCall),
    DeleteFromHash(HashCall),

    ReorderRules,
    ClonePlan,
}

impl Action {
    /// Destructive actions ask for confirmation unless forced.
    pub fn needs_confirmation(self) -> bool {
        matches!(
            self,
            Action::Delete(_)
                | Action::DeleteElementFromFeature
                | Action::DeleteCallElement(_)
                | Action::DeleteFromHash(_)
                | Action::RemoveSection
                | Action::RemoveSectionField
        )
    }
}

/// How a command's argument text is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgStyle {
    /// No arguments allowed
    None,
    /// Optional filter text or one `field=value`, then an optional output format
    Listing,
    /// `<id|code>`, positional key words, or key fields; optional output format
    Select,
    /// A JSON object, `field=value` pairs, or a leading code word
    Fields,
    /// A selection followed by the fields to change
    Change,
    /// Named positional words, each also accepted as `name=value`
    Words(&'static [&'static str]),
    /// The rest of the line as one string
    Text,
    /// A file path
    Path,
}

impl ArgStyle {
    pub fn takes_format(self) -> bool {
        matches!(self, ArgStyle::Listing | ArgStyle::Select)
    }
}

/// Help groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Group {
    Session,
    System,
    DataSources,
    Features,
    Functions,
    Rules,
}

impl Group {
    pub const ALL: [Group; 6] = [
        Group::Session,
        Group::System,
        Group::DataSources,
        Group::Features,
        Group::Functions,
        Group::Rules,
    ];
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Group::Session => "Session",
            Group::System => "System",
            Group::DataSources => "Data sources",
            Group::Features => "Features, elements and attributes",
            Group::Functions => "Functions and calls",
            Group::Rules => "Rules and generic plans",
        })
    }
}

/// One row of the command table.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub group: Group,
    pub action: Action,
    pub args: ArgStyle,
    /// Argument synopsis shown after the name
    pub usage: &'static str,
    pub help: &'static str,
}

impl CommandSpec {
    pub fn synopsis(&self) -> String {
        if self.usage.is_empty() {
            self.name.to_string()
        } else {
            format!("{} {}", self.name, self.usage)
        }
    }
}

/// Find a command by name, ignoring case.
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Every command name, in table order.
pub fn names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|c| c.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn lookup_ignores_case() {
        let spec = lookup("ADDDATASOURCE").unwrap();
        assert_eq!(spec.name, "addDataSource");
        assert_eq!(spec.action, Action::Add(EntityKind::DataSource));
        assert!(lookup("noSuchCommand").is_none());
    }

    #[test]
    fn names_are_unique_ignoring_case() {
        let mut seen = BTreeSet::new();
        for name in names() {
            assert!(seen.insert(name.to_lowercase()), "duplicate command {name}");
        }
        assert!(seen.len() >= 120, "only {} commands", seen.len());
    }

    #[test]
    fn every_editable_kind_has_list_and_delete() {
        for kind in EntityKind::ALL {
            if kind.spec().read_only {
                continue;
            }
            assert!(
                COMMANDS.iter().any(|c| c.action == Action::List(kind)),
                "no list command for {kind}"
            );
            let deletable = COMMANDS.iter().any(|c| {
                matches!(c.action, Action::Delete(k) if k == kind)
                    || (kind == EntityKind::FeatureElement && c.action == Action::DeleteElementFromFeature)
                    || matches!(c.action, Action::DeleteCallElement(f) if f.element_kind() == Some(kind))
            });
            assert!(deletable, "no delete command for {kind}");
        }
    }

    #[test]
    fn destructive_commands_confirm() {
        assert!(lookup("deleteDataSource").unwrap().action.needs_confirmation());
        assert!(!lookup("addDataSource").unwrap().action.needs_confirmation());
    }
}
