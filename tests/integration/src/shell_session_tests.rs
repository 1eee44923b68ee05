//! Shell sessions driven through the library against a file-backed store.

use cfgtool_core::{ConfigManager, EntityKind, Filter, Selector};
use cfgtool_shell::{Output, Shell, ShellOptions, Theme};
use cfgtool_test_utils::{TestConfig, TestStore};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn forced() -> ShellOptions {
    ShellOptions {
        force: true,
        theme: Theme::None,
        ..ShellOptions::default()
    }
}

fn run(manager: &mut ConfigManager, script: &str) -> (bool, String, String) {
    let mut shell = Shell::new(manager, forced());
    let mut out = Vec::new();
    let mut err = Vec::new();
    let ok = shell.run_script(script.lines(), &mut out, &mut err).unwrap();
    (ok, String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
}

#[test]
fn scripted_session_is_saved_and_reloaded() {
    let store = TestStore::new();
    let mut manager = ConfigManager::open(Box::new(store.open())).unwrap();
    let (ok, _, err) = run(
        &mut manager,
        r#"
# loyalty programme
addDataSource LOYALTY Loyalty programme members
addElement LOYALTY_NUM
addFeature {"feature": "LOYALTY_ID", "elementList": ["LOYALTY_NUM"]}
addAttribute {"attribute": "LOYALTY_NUMBER", "feature": "LOYALTY_ID", "element": "LOYALTY_NUM", "dataSource": "LOYALTY"}
setSystemParameter MAX_RELATED_ENTITIES 300
save Loyalty programme
"#,
    );
    assert!(ok, "{err}");
    assert!(!manager.is_dirty());

    let reopened = ConfigManager::open(Box::new(store.open())).unwrap();
    let attribute = reopened
        .get(EntityKind::Attribute, &Selector::Code("LOYALTY_NUMBER".into()))
        .unwrap();
    assert_eq!(attribute["dataSource"], json!("LOYALTY"));
    assert_eq!(reopened.get_parameter("MAX_RELATED_ENTITIES").unwrap()["value"], json!(300));
}

#[test]
fn blocked_delete_is_reported_and_leaves_rows() {
    let store = TestStore::new();
    let mut manager = ConfigManager::open(Box::new(store.open())).unwrap();
    let (ok, _, err) = run(
        &mut manager,
        "addDataSource CUSTOMERS\n\
         addAttribute attribute=CUSTOMER_NAME feature=NAME element=FULL_NAME dataSource=CUSTOMERS\n\
         deleteDataSource CUSTOMERS",
    );
    assert!(!ok);
    assert!(err.contains("error[CFG004]: deleteDataSource CUSTOMERS"), "{err}");
    assert!(err.contains("blocked by:"), "{err}");
    assert!(err.contains("CUSTOMER_NAME"), "{err}");
    assert_eq!(
        manager
            .list(EntityKind::DataSource, &Filter::field("dataSource", "CUSTOMERS"))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn failed_save_keeps_pending_changes() {
    let store = TestStore::seeded(&TestConfig::template().with_broken_rule("BROKEN").to_json());
    let saved = store.saved_ids();
    let mut manager = ConfigManager::open(Box::new(store.open())).unwrap();
    let (ok, _, err) = run(&mut manager, "addDataSource A\naddDataSource B\nsave");
    assert!(!ok);
    assert!(err.contains("error[CFG006]: save"), "{err}");
    assert!(err.contains("issues:"), "{err}");
    assert_eq!(manager.journal().unwrap().len(), 2);
    assert_eq!(store.saved_ids(), saved);
}

#[rstest]
#[case::json("listDataSources json", '[')]
#[case::jsonl("listDataSources jsonl", '{')]
#[case::table("listDataSources table", 'i')]
fn list_formats(#[case] line: &str, #[case] first: char) {
    let store = TestStore::new();
    let mut manager = ConfigManager::open(Box::new(store.open())).unwrap();
    let mut shell = Shell::new(&mut manager, forced());
    let output = shell.execute(line).unwrap();
    assert!(matches!(output, Output::List(_)));
    assert!(shell.render(&output).starts_with(first));
}
