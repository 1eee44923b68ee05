use cfgtool_core::{CallFamily, EntityKind as K};

use super::{Action as A, ArgStyle as S, CommandSpec, Group as G, HashCall};

const fn cmd(
    name: &'static str,
    group: G,
    action: A,
    args: S,
    usage: &'static str,
    help: &'static str,
) -> CommandSpec {
    CommandSpec {
        name,
        group,
        action,
        args,
        usage,
        help,
    }
}

const LIST: &str = "[filter | field=value] [table|json|jsonl]";
const GET: &str = "<id|code> [table|json|jsonl]";

const COMPARISON: CallFamily = CallFamily::Comparison;
const EXPRESSION: CallFamily = CallFamily::Expression;
const DISTINCT: CallFamily = CallFamily::Distinct;

/// Every command the shell understands.
pub static COMMANDS: &[CommandSpec] = &[
    // ---- session ----------------------------------------------------------
    cmd("help", G::Session, A::Help, S::Text, "[command]", "List commands, or show one command's syntax"),
    cmd("quit", G::Session, A::Quit, S::None, "", "Leave the shell"),
    cmd("exit", G::Session, A::Quit, S::None, "", "Leave the shell"),
    cmd("history", G::Session, A::History, S::None, "", "Show the commands entered this session"),
    cmd("setTheme", G::Session, A::SetTheme, S::Words(&["theme"]), "<default|light|dark|none>", "Change output colours"),
    cmd("showChanges", G::Session, A::ShowChanges, S::None, "", "Show the pending change journal with diffs"),
    cmd("validate", G::Session, A::Validate, S::None, "", "Check every reference without saving"),
    cmd("save", G::Session, A::Save, S::Text, "[comment]", "Validate and persist the configuration"),
    cmd("reload_config", G::Session, A::Reload, S::None, "", "Discard pending changes and reload the default configuration"),
    cmd("getDefaultConfigID", G::Session, A::GetDefaultConfigId, S::None, "", "Show the id of the default configuration"),
    cmd("getConfigRegistry", G::Session, A::GetConfigRegistry, S::Listing, LIST, "List saved configurations"),
    cmd("exportToFile", G::Session, A::ExportToFile, S::Path, "<path>", "Write the current configuration to a file"),
    cmd("importFromFile", G::Session, A::ImportFromFile, S::Path, "<path>", "Replace the current configuration with a file's"),
    cmd("statistics", G::Session, A::Statistics, S::Select, "[table|json|jsonl]", "Show row counts and session state"),
    // ---- system -----------------------------------------------------------
    cmd("touch", G::System, A::Touch, S::None, "", "Stamp the configuration as updated"),
    cmd("getCompatibilityVersion", G::System, A::GetCompatibilityVersion, S::None, "", "Show the declared schema version"),
    cmd("updateCompatibilityVersion", G::System, A::UpdateCompatibilityVersion, S::Words(&["version"]), "<version>", "Set the declared schema version"),
    cmd("verifyCompatibilityVersion", G::System, A::VerifyCompatibilityVersion, S::Words(&["version"]), "<version>", "Fail unless the schema version matches"),
    cmd("listConfigSections", G::System, A::ListSections, S::Listing, LIST, "List top-level sections of the document"),
    cmd("getConfigSection", G::System, A::GetSection, S::Select, "<section> [table|json|jsonl]", "Show a raw document section"),
    cmd("addConfigSection", G::System, A::AddSection, S::Words(&["section", "value"]), "<section> [json]", "Add a raw document section"),
    cmd("removeConfigSection", G::System, A::RemoveSection, S::Words(&["section"]), "<section>", "Remove a raw document section"),
    cmd("addConfigSectionField", G::System, A::AddSectionField, S::Words(&["section", "field", "value"]), "<section> <field> <value>", "Add a field to a section or to each of its rows"),
    cmd("removeConfigSectionField", G::System, A::RemoveSectionField, S::Words(&["section", "field"]), "<section> <field>", "Remove a field from a section or from each of its rows"),
    cmd("listSystemParameters", G::System, A::List(K::SystemParameter), S::Listing, LIST, "List system parameters"),
    cmd("getSystemParameter", G::System, A::GetParameter, S::Words(&["parameter"]), "<parameter>", "Show one system parameter"),
    cmd("setSystemParameter", G::System, A::SetParameter, S::Words(&["parameter", "value"]), "<parameter> <value>", "Set a system parameter"),
    cmd("setSetting", G::System, A::SetParameter, S::Words(&["parameter", "value"]), "<setting> <value>", "Set a system setting"),
    cmd("deleteSystemParameter", G::System, A::Delete(K::SystemParameter), S::Select, "<id|parameter>", "Delete a system parameter"),
    cmd("listReferenceCodes", G::System, A::ListReferenceCodes, S::Listing, LIST, "List engine reference codes"),
    // ---- data sources -----------------------------------------------------
    cmd("listDataSources", G::DataSources, A::List(K::DataSource), S::Listing, LIST, "List data sources"),
    cmd("getDataSource", G::DataSources, A::Get(K::DataSource), S::Select, GET, "Show one data source"),
    cmd("addDataSource", G::DataSources, A::Add(K::DataSource), S::Fields, "<dataSource> [description] | {json}", "Add a data source"),
    cmd("setDataSource", G::DataSources, A::Set(K::DataSource), S::Change, "<id|dataSource> field=value ... | {json}", "Change a data source"),
    cmd("deleteDataSource", G::DataSources, A::Delete(K::DataSource), S::Select, "<id|dataSource>", "Delete an unreferenced data source"),
    // ---- features ---------------------------------------------------------
    cmd("listFeatures", G::Features, A::List(K::Feature), S::Listing, LIST, "List features"),
    cmd("getFeature", G::Features, A::Get(K::Feature), S::Select, GET, "Show a feature with its elements and calls"),
    cmd("addFeature", G::Features, A::Add(K::Feature), S::Fields, "<feature> | {json with elementList, comparison, expression}", "Add a feature, its element bindings and calls"),
    cmd("setFeature", G::Features, A::Set(K::Feature), S::Change, "<id|feature> field=value ... | {json}", "Change a feature"),
    cmd("deleteFeature", G::Features, A::Delete(K::Feature), S::Select, "<id|feature>", "Delete a feature and the rows it owns"),
    cmd("activateFeature", G::Features, A::SetFeatureActive(true), S::Words(&["feature"]), "<feature>", "Mark a feature active"),
    cmd("deactivateFeature", G::Features, A::SetFeatureActive(false), S::Words(&["feature"]), "<feature>", "Mark a feature inactive"),
    cmd("updateFeatureVersion", G::Features, A::UpdateFeatureVersion, S::Words(&["feature", "version"]), "<feature> <version>", "Set a feature's version"),
    cmd("listFeatureClasses", G::Features, A::List(K::FeatureClass), S::Listing, LIST, "List feature classes"),
    cmd("listFeatureElements", G::Features, A::List(K::FeatureElement), S::Listing, LIST, "List feature/element bindings"),
    cmd("addElementToFeature", G::Features, A::AddElementToFeature, S::Words(&["feature", "element"]), "<feature> <element> [field=value ...]", "Bind an element to a feature"),
    cmd("deleteElementFromFeature", G::Features, A::DeleteElementFromFeature, S::Words(&["feature", "element"]), "<feature> <element>", "Unbind an element from a feature"),
    cmd("setFeatureElement", G::Features, A::SetFeatureElement(None), S::Words(&["feature", "element"]), "<feature> <element> field=value ...", "Change a feature/element binding"),
    cmd("setFeatureElementDerived", G::Features, A::SetFeatureElement(Some("derived")), S::Words(&["feature", "element", "derived"]), "<feature> <element> <Yes|No>", "Mark a bound element derived"),
    cmd("setFeatureElementDisplayLevel", G::Features, A::SetFeatureElement(Some("display")), S::Words(&["feature", "element", "display"]), "<feature> <element> <level>", "Set a bound element's display level"),
    cmd("templateAdd", G::Features, A::TemplateAdd, S::Words(&["template", "feature"]), "[<template> <feature>]", "Add a feature with elements and attributes from a template; no arguments lists templates"),
    cmd("listAttributes", G::Features, A::List(K::Attribute), S::Listing, LIST, "List attributes"),
    cmd("getAttribute", G::Features, A::Get(K::Attribute), S::Select, GET, "Show one attribute"),
    cmd("addAttribute", G::Features, A::Add(K::Attribute), S::Fields, "<attribute> feature=<f> element=<e> [class=<c>] | {json}", "Add an attribute"),
    cmd("setAttribute", G::Features, A::Set(K::Attribute), S::Change, "<id|attribute> field=value ... | {json}", "Change an attribute"),
    cmd("deleteAttribute", G::Features, A::Delete(K::Attribute), S::Select, "<id|attribute>", "Delete an attribute"),
    cmd("listElements", G::Features, A::List(K::Element), S::Listing, LIST, "List elements"),
    cmd("getElement", G::Features, A::Get(K::Element), S::Select, GET, "Show one element"),
    cmd("addElement", G::Features, A::Add(K::Element), S::Fields, "<element> [description] | {json}", "Add an element"),
    cmd("setElement", G::Features, A::Set(K::Element), S::Change, "<id|element> field=value ... | {json}", "Change an element"),
    cmd("deleteElement", G::Features, A::Delete(K::Element), S::Select, "<id|element>", "Delete an unreferenced element"),
    cmd("listBehaviorOverrides", G::Features, A::List(K::BehaviorOverride), S::Listing, LIST, "List behavior overrides"),
    cmd("getBehaviorOverride", G::Features, A::Get(K::BehaviorOverride), S::Select, "<feature> <usageType> [table|json|jsonl]", "Show one behavior override"),
    cmd("addBehaviorOverride", G::Features, A::Add(K::BehaviorOverride), S::Fields, "feature=<f> usageType=<u> behavior=<b> | {json}", "Add a behavior override"),
    cmd("deleteBehaviorOverride", G::Features, A::Delete(K::BehaviorOverride), S::Select, "<feature> <usageType>", "Delete a behavior override"),
    // ---- functions --------------------------------------------------------
    cmd("listComparisonFunctions", G::Functions, A::List(K::ComparisonFunction), S::Listing, LIST, "List comparison functions"),
    cmd("getComparisonFunction", G::Functions, A::Get(K::ComparisonFunction), S::Select, GET, "Show one comparison function"),
    cmd("addComparisonFunction", G::Functions, A::Add(K::ComparisonFunction), S::Fields, "<function> [description] | {json}", "Add a comparison function"),
    cmd("addComparisonFunc", G::Functions, A::Add(K::ComparisonFunction), S::Fields, "<function> [description] | {json}", "Add a comparison function"),
    cmd("setComparisonFunction", G::Functions, A::Set(K::ComparisonFunction), S::Change, "<id|function> field=value ... | {json}", "Change a comparison function"),
    cmd("removeComparisonFunction", G::Functions, A::Delete(K::ComparisonFunction), S::Select, "<id|function>", "Delete a comparison function and its thresholds"),
    cmd("deleteComparisonFunction", G::Functions, A::Delete(K::ComparisonFunction), S::Select, "<id|function>", "Delete a comparison function and its thresholds"),
    cmd("listComparisonThresholds", G::Functions, A::List(K::ComparisonThreshold), S::Listing, LIST, "List comparison thresholds"),
    cmd("addComparisonThreshold", G::Functions, A::Add(K::ComparisonThreshold), S::Fields, "function=<f> returnCode=<r> [feature=<f>] sameScore=<n> ... | {json}", "Add a comparison threshold"),
    cmd("addComparisonFuncReturnCode", G::Functions, A::Add(K::ComparisonThreshold), S::Fields, "function=<f> returnCode=<r> [feature=<f>] ... | {json}", "Add a comparison threshold"),
    cmd("setComparisonThreshold", G::Functions, A::Set(K::ComparisonThreshold), S::Change, "<id> field=value ... | {json}", "Change a comparison threshold"),
    cmd("deleteComparisonThreshold", G::Functions, A::Delete(K::ComparisonThreshold), S::Select, "<id> | function=<f> returnCode=<r> [feature=<f>]", "Delete a comparison threshold"),
    cmd("listComparisonCalls", G::Functions, A::List(K::ComparisonCall), S::Listing, LIST, "List comparison calls"),
    cmd("getComparisonCall", G::Functions, A::Get(K::ComparisonCall), S::Select, "<id> [table|json|jsonl]", "Show a comparison call with its elements"),
    cmd("addComparisonCall", G::Functions, A::Add(K::ComparisonCall), S::Fields, "feature=<f> function=<fn> elementList=[...] | {json}", "Add a comparison call"),
    cmd("deleteComparisonCall", G::Functions, A::Delete(K::ComparisonCall), S::Select, "<id> | feature=<f>", "Delete a comparison call and its elements"),
    cmd("addFeatureComparison", G::Functions, A::Add(K::ComparisonCall), S::Fields, "feature=<f> function=<fn> elementList=[...] | {json}", "Add a comparison call"),
    cmd("deleteFeatureComparison", G::Functions, A::Delete(K::ComparisonCall), S::Select, "<id> | feature=<f>", "Delete a comparison call and its elements"),
    cmd("listComparisonCallElements", G::Functions, A::List(K::ComparisonCallElement), S::Listing, LIST, "List comparison call elements"),
    cmd("addComparisonCallElement", G::Functions, A::AddCallElement(COMPARISON), S::Words(&["feature", "element"]), "<feature|callId=n> <element>", "Add an element to a comparison call"),
    cmd("deleteComparisonCallElement", G::Functions, A::DeleteCallElement(COMPARISON), S::Words(&["feature", "element"]), "<feature|callId=n> <element>", "Remove an element from a comparison call"),
    cmd("addFeatureComparisonElement", G::Functions, A::AddCallElement(COMPARISON), S::Words(&["feature", "element"]), "<feature> <element>", "Add an element to a feature's comparison call"),
    cmd("deleteFeatureComparisonElement", G::Functions, A::DeleteCallElement(COMPARISON), S::Words(&["feature", "element"]), "<feature> <element>", "Remove an element from a feature's comparison call"),
    cmd("listExpressionFunctions", G::Functions, A::List(K::ExpressionFunction), S::Listing, LIST, "List expression functions"),
    cmd("getExpressionFunction", G::Functions, A::Get(K::ExpressionFunction), S::Select, GET, "Show one expression function"),
    cmd("addExpressionFunction", G::Functions, A::Add(K::ExpressionFunction), S::Fields, "<function> [description] | {json}", "Add an expression function"),
    cmd("addExpressionFunc", G::Functions, A::Add(K::ExpressionFunction), S::Fields, "<function> [description] | {json}", "Add an expression function"),
    cmd("setExpressionFunction", G::Functions, A::Set(K::ExpressionFunction), S::Change, "<id|function> field=value ... | {json}", "Change an expression function"),
    cmd("removeExpressionFunction", G::Functions, A::Delete(K::ExpressionFunction), S::Select, "<id|function>", "Delete an unused expression function"),
    cmd("listExpressionCalls", G::Functions, A::List(K::ExpressionCall), S::Listing, LIST, "List expression calls"),
    cmd("getExpressionCall", G::Functions, A::Get(K::ExpressionCall), S::Select, "<id> [table|json|jsonl]", "Show an expression call with its elements"),
    cmd("addExpressionCall", G::Functions, A::Add(K::ExpressionCall), S::Fields, "feature=<f> function=<fn> [expressionFeature=<f>] elementList=[...] | {json}", "Add an expression call"),
    cmd("deleteExpressionCall", G::Functions, A::Delete(K::ExpressionCall), S::Select, "<id>", "Delete an expression call and its elements"),
    cmd("listExpressionCallElements", G::Functions, A::List(K::ExpressionCallElement), S::Listing, LIST, "List expression call elements"),
    cmd("addExpressionCallElement", G::Functions, A::AddCallElement(EXPRESSION), S::Words(&["feature", "element"]), "callId=<n> <feature> <element> [required=Yes|No]", "Add an element to an expression call"),
    cmd("deleteExpressionCallElement", G::Functions, A::DeleteCallElement(EXPRESSION), S::Words(&["feature", "element"]), "callId=<n> <feature> <element>", "Remove an element from an expression call"),
    cmd("addToNamehash", G::Functions, A::AddToHash(HashCall::Name), S::Words(&["feature", "element"]), "<feature> <element>", "Add an element to the name hasher call"),
    cmd("deleteFromNamehash", G::Functions, A::DeleteFromHash(HashCall::Name), S::Words(&["feature", "element"]), "<feature> <element>", "Remove an element from the name hasher call"),
    cmd("addToNameSSNLast4hash", G::Functions, A::AddToHash(HashCall::SsnLast4), S::Words(&["feature", "element"]), "<feature> <element>", "Add an element to the name + SSN last-4 hash call"),
    cmd("deleteFromSSNLast4hash", G::Functions, A::DeleteFromHash(HashCall::SsnLast4), S::Words(&["feature", "element"]), "<feature> <element>", "Remove an element from the name + SSN last-4 hash call"),
    cmd("listStandardizeFunctions", G::Functions, A::List(K::StandardizeFunction), S::Listing, LIST, "List standardize functions"),
    cmd("getStandardizeFunction", G::Functions, A::Get(K::StandardizeFunction), S::Select, GET, "Show one standardize function"),
    cmd("addStandardizeFunction", G::Functions, A::Add(K::StandardizeFunction), S::Fields, "<function> [description] | {json}", "Add a standardize function"),
    cmd("addStandardizeFunc", G::Functions, A::Add(K::StandardizeFunction), S::Fields, "<function> [description] | {json}", "Add a standardize function"),
    cmd("setStandardizeFunction", G::Functions, A::Set(K::StandardizeFunction), S::Change, "<id|function> field=value ... | {json}", "Change a standardize function"),
    cmd("removeStandardizeFunction", G::Functions, A::Delete(K::StandardizeFunction), S::Select, "<id|function>", "Delete an unused standardize function"),
    cmd("listStandardizeCalls", G::Functions, A::List(K::StandardizeCall), S::Listing, LIST, "List standardize calls"),
    cmd("getStandardizeCall", G::Functions, A::Get(K::StandardizeCall), S::Select, "<id> [table|json|jsonl]", "Show one standardize call"),
    cmd("addStandardizeCall", G::Functions, A::Add(K::StandardizeCall), S::Fields, "function=<fn> feature=<f> | element=<e> | {json}", "Add a standardize call"),
    cmd("deleteStandardizeCall", G::Functions, A::Delete(K::StandardizeCall), S::Select, "<id>", "Delete a standardize call"),
    cmd("listDistinctFunctions", G::Functions, A::List(K::DistinctFunction), S::Listing, LIST, "List distinct functions"),
    cmd("getDistinctFunction", G::Functions, A::Get(K::DistinctFunction), S::Select, GET, "Show one distinct function"),
    cmd("addDistinctFunction", G::Functions, A::Add(K::DistinctFunction), S::Fields, "<function> [description] | {json}", "Add a distinct function"),
    cmd("setDistinctFunction", G::Functions, A::Set(K::DistinctFunction), S::Change, "<id|function> field=value ... | {json}", "Change a distinct function"),
    cmd("removeDistinctFunction", G::Functions, A::Delete(K::DistinctFunction), S::Select, "<id|function>", "Delete an unused distinct function"),
    cmd("listDistinctCalls", G::Functions, A::List(K::DistinctCall), S::Listing, LIST, "List distinct calls"),
    cmd("getDistinctCall", G::Functions, A::Get(K::DistinctCall), S::Select, "<id> [table|json|jsonl]", "Show a distinct call with its elements"),
    cmd("addDistinctCall", G::Functions, A::Add(K::DistinctCall), S::Fields, "feature=<f> function=<fn> elementList=[...] | {json}", "Add a distinct call"),
    cmd("deleteDistinctCall", G::Functions, A::Delete(K::DistinctCall), S::Select, "<id> | feature=<f>", "Delete a distinct call and its elements"),
    cmd("listDistinctCallElements", G::Functions, A::List(K::DistinctCallElement), S::Listing, LIST, "List distinct call elements"),
    cmd("addDistinctCallElement", G::Functions, A::AddCallElement(DISTINCT), S::Words(&["feature", "element"]), "<feature|callId=n> <element>", "Add an element to a distinct call"),
    cmd("deleteDistinctCallElement", G::Functions, A::DeleteCallElement(DISTINCT), S::Words(&["feature", "element"]), "<feature|callId=n> <element>", "Remove an element from a distinct call"),
    cmd("addFeatureDistinctCallElement", G::Functions, A::AddCallElement(DISTINCT), S::Words(&["feature", "element"]), "<feature> <element>", "Add an element to a feature's distinct call"),
    // ---- rules ------------------------------------------------------------
    cmd("listFragments", G::Rules, A::List(K::Fragment), S::Listing, LIST, "List rule fragments"),
    cmd("getFragment", G::Rules, A::Get(K::Fragment), S::Select, GET, "Show one rule fragment"),
    cmd("addFragment", G::Rules, A::Add(K::Fragment), S::Fields, "fragment=<code> source=<expr> | {json}", "Add a rule fragment"),
    cmd("setFragment", G::Rules, A::Set(K::Fragment), S::Change, "<id|fragment> field=value ... | {json}", "Change a rule fragment"),
    cmd("deleteFragment", G::Rules, A::Delete(K::Fragment), S::Select, "<id|fragment>", "Delete an unreferenced rule fragment"),
    cmd("listRules", G::Rules, A::List(K::Rule), S::Listing, LIST, "List rules"),
    cmd("getRule", G::Rules, A::Get(K::Rule), S::Select, GET, "Show one rule"),
    cmd("addRule", G::Rules, A::Add(K::Rule), S::Fields, "rule=<code> fragment=<f> ruleType=<t> [tier=<n>] | {json}", "Add a rule"),
    cmd("setRule", G::Rules, A::Set(K::Rule), S::Change, "<id|rule> field=value ... | {json}", "Change a rule"),
    cmd("deleteRule", G::Rules, A::Delete(K::Rule), S::Select, "<id|rule>", "Delete a rule"),
    cmd("reorderRules", G::Rules, A::ReorderRules, S::Words(&["ruleType"]), "<ruleType> <rule> <rule> ...", "Renumber the tiers of a rule type in the given order"),
    cmd("listRuleTypes", G::Rules, A::List(K::RuleType), S::Listing, LIST, "List rule types"),
    cmd("listGenericPlans", G::Rules, A::List(K::GenericPlan), S::Listing, LIST, "List generic plans"),
    cmd("getGenericPlan", G::Rules, A::Get(K::GenericPlan), S::Select, GET, "Show one generic plan"),
    cmd("addGenericPlan", G::Rules, A::Add(K::GenericPlan), S::Fields, "<plan> [description] | {json}", "Add a generic plan"),
    cmd("cloneGenericPlan", G::Rules, A::ClonePlan, S::Words(&["plan", "newPlan", "description"]), "<plan> <newPlan> [description]", "Copy a generic plan with its thresholds"),
    cmd("deleteGenericPlan", G::Rules, A::Delete(K::GenericPlan), S::Select, "<id|plan>", "Delete a generic plan and its thresholds"),
    cmd("listGenericThresholds", G::Rules, A::List(K::GenericThreshold), S::Listing, LIST, "List generic thresholds"),
    cmd("addGenericThreshold", G::Rules, A::Add(K::GenericThreshold), S::Fields, "plan=<p> behavior=<b> [feature=<f>] candidateCap=<n> scoringCap=<n> | {json}", "Add a generic threshold"),
    cmd("setGenericThreshold", G::Rules, A::Set(K::GenericThreshold), S::Change, "plan=<p> behavior=<b> [feature=<f>] field=value ... | {json}", "Change a generic threshold"),
    cmd("deleteGenericThreshold", G::Rules, A::Delete(K::GenericThreshold), S::Select, "<plan> <behavior> [feature]", "Delete a generic threshold"),
];
