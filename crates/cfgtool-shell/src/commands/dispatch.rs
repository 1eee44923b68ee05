//! Executing a parsed command against the orchestrator.

use cfgtool_core::{ApiRecord, Deleted, EntityKind, Filter, TEMPLATES};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::Path;
use tracing::warn;

use super::args::key_api_names;
use super::{Action, Args, CommandSpec, Group, HashCall, lookup};
use crate::error::{CliError, Result};
use crate::render::{Output, Theme};
use crate::shell::Shell;
use crate::suggest::suggest;

const DEFAULT_SAVE_COMMENT: &str = "Updated by sz_configtool";

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value).map_err(cfgtool_core::Error::from)?)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Short identification of a row for messages: code and id, or key values.
fn label(kind: EntityKind, record: &ApiRecord) -> String {
    let spec = kind.spec();
    let id = record.get("id").filter(|v| !v.is_null()).map(text);
    if let Some(code) = spec.code_api_name().and_then(|c| record.get(c)).map(text) {
        return match id {
            Some(id) => format!("{code} (id {id})"),
            None => code,
        };
    }
    if let Some(id) = id {
        return format!("#{id}");
    }
    key_api_names(kind)
        .iter()
        .filter_map(|k| record.get(*k).map(text))
        .collect::<Vec<_>>()
        .join("/")
}

/// Row filter from list arguments: the first `field=value`, or the words as text.
fn filter(args: &Args) -> Filter {
    match args.fields.iter().next() {
        Some((field, value)) => Filter::field(field.as_str(), text(value)),
        None => Filter::text(args.words.join(" ")),
    }
}

/// Rows for a listing that is not an entity table, filtered like one.
fn listing(rows: Vec<Value>, args: &Args) -> Output {
    let filter = filter(args);
    Output::List(
        rows.into_iter()
            .filter(|row| row.as_object().is_none_or(|map| filter.matches(map)))
            .collect(),
    )
}

fn records(rows: Vec<ApiRecord>) -> Output {
    Output::List(rows.into_iter().map(Value::Object).collect())
}

fn deleted(kind: EntityKind, deleted: &Deleted) -> Output {
    let mut message = format!("Deleted {kind} {}", label(kind, &deleted.record));
    if !deleted.cascaded.is_empty() {
        let owned: Vec<String> = deleted.cascaded.iter().map(|(k, key)| format!("{k} {key}")).collect();
        message.push_str(&format!(" and {} owned row(s): {}", owned.len(), owned.join(", ")));
    }
    Output::Success(message)
}

/// Feature, element and other fields of a call-element command. A leading
/// numeric word is the call id.
fn call_element_fields(args: &Args) -> ApiRecord {
    let mut fields = args.fields.clone();
    let mut words = args.words.iter().peekable();
    if !fields.contains_key("callId")
        && let Some(id) = words.peek().and_then(|w| w.parse::<i64>().ok())
    {
        fields.insert("callId".into(), json!(id));
        words.next();
    }
    for name in ["feature", "element"] {
        if fields.contains_key(name) {
            continue;
        }
        match words.next() {
            Some(word) => {
                fields.insert(name.into(), json!(word));
            }
            None => break,
        }
    }
    fields
}

impl Shell<'_> {
    pub(crate) fn dispatch(&mut self, spec: &CommandSpec, args: &Args) -> Result<Output> {
        match spec.action {
            Action::Help => self.help(args),
            Action::Quit => self.quit(),
            Action::History => Ok(Output::Text(
                self.history
                    .iter()
                    .enumerate()
                    .map(|(i, line)| format!("{:>4}  {line}", i + 1))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )),
            Action::SetTheme => {
                let name = args.require("theme", 0)?;
                let theme: Theme = name.parse().map_err(|e: String| args.usage_error(e))?;
                self.options.theme = theme;
                Ok(Output::Success(format!("Theme set to {}", name.to_lowercase())))
            }
            Action::ShowChanges => Ok(Output::Text(self.manager.pending_changes()?)),
            Action::Validate => {
                let report = self.manager.validate()?;
                if report.is_clean() {
                    Ok(Output::Success("Configuration is valid".into()))
                } else {
                    Ok(Output::Text(report.to_string()))
                }
            }
            Action::Save => {
                let comment = if args.raw.is_empty() {
                    DEFAULT_SAVE_COMMENT
                } else {
                    args.raw.as_str()
                };
                let id = self.manager.save(comment)?;
                Ok(Output::Success(format!("Configuration saved as {id}")))
            }
            Action::Reload => {
                if self.manager.is_dirty()
                    && !self.options.force
                    && !self.confirmer.confirm("Discard pending changes and reload?")?
                {
                    return Ok(Output::Info("Reload cancelled".into()));
                }
                self.manager.reload()?;
                Ok(Output::Success("Configuration reloaded".into()))
            }
            Action::GetDefaultConfigId => Ok(match self.manager.default_config_id()? {
                Some(id) => Output::Text(id.to_string()),
                None => Output::Info("No default configuration".into()),
            }),
            Action::GetConfigRegistry => {
                let rows = self.manager.config_registry()?.iter().map(to_value).collect::<Result<_>>()?;
                Ok(listing(rows, args))
            }
            Action::ExportToFile => {
                let path = self.path(args)?;
                self.manager.export_to_file(path)?;
                Ok(Output::Success(format!("Configuration written to {}", path.display())))
            }
            Action::ImportFromFile => {
                let path = self.path(args)?;
                self.manager.import_from_file(path)?;
                Ok(Output::Success(format!("Configuration imported from {}", path.display())))
            }
            Action::Statistics => Ok(Output::Record(to_value(&self.manager.statistics()?)?)),

            Action::Touch => {
                let stamp = self.manager.touch()?;
                Ok(Output::Success(format!("Configuration marked updated at {stamp}")))
            }
            Action::GetCompatibilityVersion => Ok(match self.manager.compatibility_version()? {
                Some(version) => Output::Text(version),
                None => Output::Info("No compatibility version set".into()),
            }),
            Action::UpdateCompatibilityVersion => {
                let version = args.require("version", 0)?;
                self.manager.update_compatibility_version(&version)?;
                Ok(Output::Success(format!("Compatibility version set to {version}")))
            }
            Action::VerifyCompatibilityVersion => {
                let expected = args.require("version", 0)?;
                if self.manager.verify_compatibility_version(&expected)? {
                    Ok(Output::Success(format!("Compatibility version is {expected}")))
                } else {
                    let actual = self.manager.compatibility_version()?.unwrap_or_else(|| "unset".into());
                    Err(CliError::user(format!(
                        "Compatibility version is {actual}, expected {expected}"
                    )))
                }
            }
            Action::ListSections => {
                let rows = self.manager.list_sections()?.iter().map(to_value).collect::<Result<_>>()?;
                Ok(listing(rows, args))
            }
            Action::GetSection => {
                let name = args.require("section", 0)?;
                Ok(match self.manager.get_section(&name)? {
                    Value::Array(rows) => Output::List(rows),
                    other => Output::Record(other),
                })
            }
            Action::AddSection => {
                let name = args.require("section", 0)?;
                let value = args.value("value", 1)?;
                self.manager.add_section(&name, value)?;
                Ok(Output::Success(format!("Added section {name}")))
            }
            Action::RemoveSection => {
                let name = args.require("section", 0)?;
                self.manager.remove_section(&name)?;
                Ok(Output::Success(format!("Removed section {name}")))
            }
            Action::AddSectionField => {
                let name = args.require("section", 0)?;
                let field = args.require("field", 1)?;
                let value = args
                    .value("value", 2)?
                    .ok_or_else(|| args.usage_error("value is required"))?;
                self.manager.add_section_field(&name, &field, value)?;
                Ok(Output::Success(format!("Added field {field} to {name}")))
            }
            Action::RemoveSectionField => {
                let name = args.require("section", 0)?;
                let field = args.require("field", 1)?;
                self.manager.remove_section_field(&name, &field)?;
                Ok(Output::Success(format!("Removed field {field} from {name}")))
            }
            Action::GetParameter => {
                let code = args.require("parameter", 0)?;
                Ok(Output::Record(Value::Object(self.manager.get_parameter(&code)?)))
            }
            Action::SetParameter => {
                let code = args.require("parameter", 0)?;
                let value = args
                    .value("value", 1)?
                    .ok_or_else(|| args.usage_error("value is required"))?;
                let row = self.manager.set_parameter(&code, value)?;
                Ok(Output::Success(format!(
                    "Set {} to {}",
                    code.to_uppercase(),
                    row.get("value").map(text).unwrap_or_default()
                )))
            }
            Action::ListReferenceCodes => Ok(listing(
                self.manager.reference_codes()?.into_iter().map(Value::Object).collect(),
                args,
            )),

            Action::List(kind) => Ok(records(self.manager.list(kind, &filter(args))?)),
            Action::Get(kind) => {
                let (selector, _) = args.selection(kind)?;
                Ok(Output::Record(Value::Object(self.manager.get(kind, &selector)?)))
            }
            Action::Add(kind) => {
                let fields = args.record_fields(kind)?;
                if fields.is_empty() {
                    return Err(args.usage_error("nothing to add"));
                }
                let view = self.manager.create(kind, &fields)?;
                Ok(Output::Success(format!("Added {kind} {}", label(kind, &view))))
            }
            Action::Set(kind) => {
                let (selector, fields) = args.selection(kind)?;
                if fields.is_empty() {
                    return Err(args.usage_error("give at least one field=value to change"));
                }
                let view = self.manager.update(kind, &selector, &fields)?;
                Ok(Output::Success(format!("Updated {kind} {}", label(kind, &view))))
            }
            Action::Delete(kind) => {
                let (selector, rest) = args.selection(kind)?;
                if let Some(extra) = rest.keys().next() {
                    return Err(args.usage_error(format!("unexpected field '{extra}'")));
                }
                let removed = self.manager.delete(kind, &selector)?;
                Ok(deleted(kind, &removed))
            }

            Action::TemplateAdd => {
                if args.is_empty() {
                    let rows = TEMPLATES
                        .iter()
                        .map(|t| json!({"template": t.name, "class": t.class, "elements": t.elements}))
                        .collect();
                    return Ok(Output::List(rows));
                }
                let template = args.require("template", 0)?;
                let feature = args.require("feature", 1)?;
                let view = self.manager.template_add(&template, &feature)?;
                Ok(Output::Success(format!(
                    "Added feature {} from template {}",
                    label(EntityKind::Feature, &view),
                    template.to_uppercase()
                )))
            }
            Action::SetFeatureActive(active) => {
                let feature = args.require("feature", 0)?;
                self.manager.set_feature_active(&feature, active)?;
                let state = if active { "activated" } else { "deactivated" };
                Ok(Output::Success(format!("Feature {} {state}", feature.to_uppercase())))
            }
            Action::UpdateFeatureVersion => {
                let feature = args.require("feature", 0)?;
                let version = args
                    .require("version", 1)?
                    .parse::<i64>()
                    .map_err(|_| args.usage_error("version must be an integer"))?;
                self.manager.update_feature_version(&feature, version)?;
                Ok(Output::Success(format!(
                    "Feature {} is now version {version}",
                    feature.to_uppercase()
                )))
            }
            Action::AddElementToFeature => {
                let feature = args.require("feature", 0)?;
                let element = args.require("element", 1)?;
                let fields = args.fields_without(&["feature", "element"]);
                self.manager.add_element_to_feature(&feature, &element, &fields)?;
                Ok(Output::Success(format!(
                    "Added element {} to feature {}",
                    element.to_uppercase(),
                    feature.to_uppercase()
                )))
            }
            Action::DeleteElementFromFeature => {
                let feature = args.require("feature", 0)?;
                let element = args.require("element", 1)?;
                let removed = self.manager.delete_element_from_feature(&feature, &element)?;
                Ok(deleted(EntityKind::FeatureElement, &removed))
            }
            Action::SetFeatureElement(preset) => {
                let feature = args.require("feature", 0)?;
                let element = args.require("element", 1)?;
                let fields = match preset {
                    Some(field) => {
                        let value = args
                            .value(field, 2)?
                            .ok_or_else(|| args.usage_error(format!("{field} is required")))?;
                        let mut fields = ApiRecord::new();
                        fields.insert(field.to_string(), value);
                        fields
                    }
                    None => args.fields_without(&["feature", "element"]),
                };
                if fields.is_empty() {
                    return Err(args.usage_error("give at least one field=value to change"));
                }
                self.manager.set_feature_element(&feature, &element, &fields)?;
                Ok(Output::Success(format!(
                    "Updated element {} of feature {}",
                    element.to_uppercase(),
                    feature.to_uppercase()
                )))
            }

            Action::AddCallElement(family) => {
                let row = self.manager.add_call_element(family, &call_element_fields(args))?;
                let kind = family.element_kind().unwrap_or(family.call_kind());
                Ok(Output::Success(format!("Added {kind} {}", label(kind, &row))))
            }
            Action::DeleteCallElement(family) => {
                let removed = self.manager.delete_call_element(family, &call_element_fields(args))?;
                Ok(deleted(family.element_kind().unwrap_or(family.call_kind()), &removed))
            }
            Action::AddToHash(hash) => {
                let feature = args.require("feature", 0)?;
                let element = args.require("element", 1)?;
                match hash {
                    HashCall::Name => self.manager.add_to_namehash(&feature, &element)?,
                    HashCall::SsnLast4 => self.manager.add_to_ssn_last4_hash(&feature, &element)?,
                };
                Ok(Output::Success(format!(
                    "Added {}/{} to the {} hash",
                    feature.to_uppercase(),
                    element.to_uppercase(),
                    hash_name(hash)
                )))
            }
            Action::DeleteFromHash(hash) => {
                let feature = args.require("feature", 0)?;
                let element = args.require("element", 1)?;
                match hash {
                    HashCall::Name => self.manager.delete_from_namehash(&feature, &element)?,
                    HashCall::SsnLast4 => self.manager.delete_from_ssn_last4_hash(&feature, &element)?,
                };
                Ok(Output::Success(format!(
                    "Removed {}/{} from the {} hash",
                    feature.to_uppercase(),
                    element.to_uppercase(),
                    hash_name(hash)
                )))
            }

            Action::ReorderRules => {
                let rule_type = args.require("ruleType", 0)?;
                let codes: Vec<String> = match args.fields.get("rules") {
                    Some(Value::Array(items)) => items.iter().map(text).collect(),
                    Some(other) => return Err(args.usage_error(format!("rules must be a list, not {other}"))),
                    None => args.words.iter().skip(1).cloned().collect(),
                };
                if codes.is_empty() {
                    return Err(args.usage_error("name the rules in their new order"));
                }
                Ok(records(self.manager.reorder_rules(&rule_type, &codes)?))
            }
            Action::ClonePlan => {
                let source = args.require("plan", 0)?;
                let target = args.require("newPlan", 1)?;
                let description = match args.fields.get("description") {
                    Some(value) => Some(text(value)),
                    None if args.words.len() > 2 => Some(args.words[2..].join(" ")),
                    None => None,
                };
                let view = self
                    .manager
                    .clone_generic_plan(&source, &target, description.as_deref())?;
                Ok(Output::Success(format!(
                    "Cloned generic plan {} as {}",
                    source.to_uppercase(),
                    label(EntityKind::GenericPlan, &view)
                )))
            }
        }
    }

    fn path<'a>(&self, args: &'a Args) -> Result<&'a Path> {
        if args.raw.is_empty() {
            return Err(args.usage_error("a file path is required"));
        }
        Ok(Path::new(&args.raw))
    }

    fn help(&self, args: &Args) -> Result<Output> {
        let topic = args.raw.trim();
        if !topic.is_empty() {
            let spec = lookup(topic).ok_or_else(|| CliError::UnknownCommand {
                name: topic.to_string(),
                suggestions: suggest(topic, super::names()),
            })?;
            return Ok(Output::Text(format!("{}\n    {}", spec.synopsis(), spec.help)));
        }

        let theme = self.options.theme;
        let mut text = String::new();
        for group in Group::ALL {
            text.push_str(&theme.header(&group.to_string()));
            text.push('\n');
            let names: Vec<&str> = super::COMMANDS
                .iter()
                .filter(|c| c.group == group)
                .map(|c| c.name)
                .collect();
            for row in names.chunks(3) {
                let line: Vec<String> = row.iter().map(|n| format!("{n:<34}")).collect();
                text.push_str("  ");
                text.push_str(line.join("").trim_end());
                text.push('\n');
            }
            text.push('\n');
        }
        text.push_str("Type help <command> for its syntax.");
        Ok(Output::Text(text))
    }

    fn quit(&mut self) -> Result<Output> {
        if self.manager.is_dirty() {
            let pending = self.manager.journal()?.len();
            if self.options.interactive && !self.options.force {
                let prompt = format!("Discard {pending} unsaved change(s) and quit?");
                if !self.confirmer.confirm(&prompt)? {
                    return Ok(Output::Info("Quit cancelled".into()));
                }
            } else {
                warn!(pending, "Leaving with unsaved changes");
            }
        }
        Ok(Output::Quit)
    }
}

fn hash_name(hash: HashCall) -> &'static str {
    match hash {
        HashCall::Name => "name",
        HashCall::SsnLast4 => "name + SSN last-4",
    }
}

#[cfg(test)]
mod tests {
    use crate::render::{Output, Theme};
    use crate::shell::{Shell, ShellOptions};
    use cfgtool_core::{ConfigManager, EntityKind, Filter, Selector};
    use cfgtool_test_utils::TestConfig;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn manager() -> ConfigManager {
        ConfigManager::open(Box::new(TestConfig::template().memory_store())).unwrap()
    }

    fn forced() -> ShellOptions {
        ShellOptions {
            force: true,
            theme: Theme::None,
            ..ShellOptions::default()
        }
    }

    fn record(output: Output) -> Value {
        match output {
            Output::Record(value) => value,
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn add_set_get_data_source() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, forced());
        assert_eq!(
            shell.execute("addDataSource CUSTOMERS Our customers").unwrap(),
            Output::Success("Added data source CUSTOMERS (id 1000)".into())
        );
        shell.execute(r#"setDataSource CUSTOMERS description="Key accounts""#).unwrap();
        let view = record(shell.execute("getDataSource 1000").unwrap());
        assert_eq!(view["description"], json!("Key accounts"));
    }

    #[test]
    fn list_filters_by_text_or_field() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, forced());
        let Output::List(rows) = shell.execute("listDataSources sear").unwrap() else {
            panic!("expected a list");
        };
        assert_eq!(rows.len(), 1);
        let Output::List(rows) = shell.execute("listAttributes feature=NAME").unwrap() else {
            panic!("expected a list");
        };
        assert!(rows.iter().all(|r| r["feature"] == json!("NAME")));
        assert!(!rows.is_empty());
    }

    #[test]
    fn feature_commands_flow_through() {
        let mut manager = manager();
        {
            let mut shell = Shell::new(&mut manager, forced());
            shell.execute("addElement PASSPORT_NUM").unwrap();
            shell
                .execute(r#"addFeature {"feature": "PASSPORT", "elementList": ["PASSPORT_NUM"]}"#)
                .unwrap();
            shell.execute("deactivateFeature passport").unwrap();
            shell.execute("updateFeatureVersion PASSPORT 2").unwrap();
            shell.execute("setFeatureElementDisplayLevel PASSPORT PASSPORT_NUM 0").unwrap();
        }
        let view = manager.get(EntityKind::Feature, &Selector::Code("PASSPORT".into())).unwrap();
        assert_eq!(view["active"], json!("No"));
        assert_eq!(view["version"], json!(2));
    }

    #[test]
    fn rule_commands_flow_through() {
        let mut manager = manager();
        {
            let mut shell = Shell::new(&mut manager, forced());
            let Output::List(rules) = shell.execute("reorderRules RESOLVED CF1_SNAME_SADDR SF1_SNAME_SSSN").unwrap()
            else {
                panic!("expected a list");
            };
            assert_eq!(rules[0]["rule"], json!("CF1_SNAME_SADDR"));
            shell.execute("cloneGenericPlan SEARCH SEARCH_WIDE Wide search").unwrap();
            shell
                .execute("setGenericThreshold plan=SEARCH_WIDE behavior=NAME scoringCap=50")
                .unwrap_or_else(|e| panic!("{e}"));
        }
        let thresholds = manager
            .list(EntityKind::GenericThreshold, &Filter::field("plan", "SEARCH_WIDE"))
            .unwrap();
        assert_eq!(thresholds.len(), 1);
    }

    #[test]
    fn system_commands_flow_through() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, forced());
        shell.execute("setSystemParameter MAX_RELATED_ENTITIES 500").unwrap();
        let view = record(shell.execute("getSystemParameter MAX_RELATED_ENTITIES").unwrap());
        assert_eq!(view["value"], json!(500));

        shell.execute(r#"addConfigSection CFG_NOTES [{"NOTE": "hello"}]"#).unwrap();
        shell.execute("addConfigSectionField CFG_NOTES AUTHOR ops").unwrap();
        let Output::List(rows) = shell.execute("getConfigSection CFG_NOTES").unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(rows, vec![json!({"NOTE": "hello", "AUTHOR": "ops"})]);

        assert!(shell.execute("verifyCompatibilityVersion 11").is_ok());
        assert!(shell.execute("verifyCompatibilityVersion 10").is_err());
        assert_eq!(
            shell.execute("getCompatibilityVersion").unwrap(),
            Output::Text("11".into())
        );
    }

    #[test]
    fn templates_are_listed_without_arguments() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, forced());
        let Output::List(rows) = shell.execute("templateAdd").unwrap() else {
            panic!("expected a list");
        };
        assert!(rows.iter().any(|r| r["template"] == json!("NAME")));
    }

    #[test]
    fn help_names_a_command_or_suggests() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, forced());
        let Output::Text(text) = shell.execute("help addDataSource").unwrap() else {
            panic!("expected text");
        };
        assert!(text.starts_with("addDataSource <dataSource>"));
        assert!(shell.execute("help addDataSorce").is_err());
        let Output::Text(all) = shell.execute("help").unwrap() else {
            panic!("expected text");
        };
        assert!(all.contains("Rules and generic plans"));
    }

    #[test]
    fn delete_reports_owned_rows() {
        let mut manager = manager();
        let mut shell = Shell::new(&mut manager, forced());
        let Output::Success(message) = shell.execute("deleteGenericPlan SEARCH").unwrap() else {
            panic!("expected success");
        };
        assert!(message.contains("1 owned row(s)"), "{message}");
    }
}
