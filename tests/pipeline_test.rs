//! 複数の検索ルートにまたがる翻訳ワークフローのテスト

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(missing_docs)]

use std::cell::Cell;
use std::fs;
use std::path::{
    Path,
    PathBuf,
};

use auto_translate::config::AutoTranslateSettings;
use auto_translate::dispatcher::{
    NoProgress,
    ProgressEvent,
    ProgressSink,
};
use auto_translate::pipeline::{
    RootOutcome,
    RootPlan,
    Workflow,
    run,
};
use auto_translate::translator::{
    Translator,
    TranslatorError,
};
use googletest::prelude::*;
use serde_json::{
    Value,
    json,
};
use tempfile::TempDir;

/// Backend that renames placeholders, the way real services sometimes do.
#[derive(Debug, Default)]
struct FakeTranslator {
    calls: Cell<usize>,
}

impl Translator for FakeTranslator {
    fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String, TranslatorError> {
        self.calls.set(self.calls.get() + 1);
        if text.contains("explode") {
            return Err(TranslatorError::InvalidResponse("backend down".to_string()));
        }
        let renamed = text
            .split(' ')
            .map(|word| if word.starts_with(':') { ":X" } else { word })
            .collect::<Vec<_>>()
            .join(" ");
        Ok(format!("[{target}] {renamed}"))
    }
}

#[derive(Debug, Default)]
struct CountingProgress {
    begun: usize,
    events: usize,
    finished: usize,
}

impl ProgressSink for CountingProgress {
    fn begin(&mut self, total: usize) {
        self.begun += total;
    }

    fn on_progress(&mut self, _event: &ProgressEvent<'_>) {
        self.events += 1;
    }

    fn finish(&mut self) {
        self.finished += 1;
    }
}

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn settings(path: PathBuf, parent_path: Option<PathBuf>) -> AutoTranslateSettings {
    AutoTranslateSettings {
        target_languages: vec!["fr".to_string()],
        path,
        parent_path,
        ..AutoTranslateSettings::default()
    }
}

fn always_yes(_plan: &RootPlan) -> bool {
    true
}

#[googletest::test]
fn test_missing_workflow_fills_target_and_keeps_placeholders() {
    let temp_dir = TempDir::new().unwrap();
    let lang = temp_dir.path().join("lang");
    write_json(
        &lang.join("en/messages.json"),
        &json!({ "greeting": { "hello": "Hello :name" }, "blank": "", "limit": 10 }),
    );
    write_json(&lang.join("fr/messages.json"), &json!({ "existing": "Déjà là" }));
    let translator = FakeTranslator::default();
    let mut progress = CountingProgress::default();

    let report = run(&settings(lang.clone(), None), Workflow::Missing, &translator, &mut always_yes, &mut progress);

    expect_that!(report.has_failures(), eq(false));
    expect_that!(report.translated_keys(), eq(3));
    assert_eq!(
        read_json(&lang.join("fr/messages.json")),
        json!({
            "existing": "Déjà là",
            "greeting": { "hello": "[fr] Hello :name" },
            "blank": "",
            "limit": 10
        })
    );
    // 空文字と数値はバックエンドを呼ばない
    expect_that!(translator.calls.get(), eq(1));
    expect_that!(progress.begun, eq(3));
    expect_that!(progress.events, eq(3));
    expect_that!(progress.finished, eq(1));
}

#[googletest::test]
fn test_missing_workflow_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let lang = temp_dir.path().join("lang");
    write_json(&lang.join("en.json"), &json!({ "title": "Title", "nested": { "body": "Body" } }));
    let settings = settings(lang.clone(), None);
    let translator = FakeTranslator::default();

    let first = run(&settings, Workflow::Missing, &translator, &mut always_yes, &mut NoProgress);
    let after_first = read_json(&lang.join("fr.json"));
    let second = run(&settings, Workflow::Missing, &translator, &mut always_yes, &mut NoProgress);

    expect_that!(first.translated_keys(), eq(2));
    expect_that!(second.translated_keys(), eq(0));
    assert!(matches!(
        second.roots.first().map(|root| &root.outcome),
        Some(RootOutcome::NothingMissing)
    ));
    assert_eq!(read_json(&lang.join("fr.json")), after_first);
    expect_that!(translator.calls.get(), eq(2));
}

#[googletest::test]
fn test_updated_workflow_translates_keys_of_newer_source() {
    let temp_dir = TempDir::new().unwrap();
    let lang = temp_dir.path().join("lang");
    write_json(&lang.join("en/auth.json"), &json!({ "failed": "Failed", "added": "Added" }));
    write_json(&lang.join("fr/auth.json"), &json!({ "failed": "Échec" }));
    let old = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000);
    fs::File::options().write(true).open(lang.join("fr/auth.json")).unwrap().set_modified(old).unwrap();
    let translator = FakeTranslator::default();

    let report = run(&settings(lang.clone(), None), Workflow::Updated, &translator, &mut always_yes, &mut NoProgress);

    expect_that!(report.translated_keys(), eq(1));
    assert_eq!(
        read_json(&lang.join("fr/auth.json")),
        json!({ "failed": "Échec", "added": "[fr] Added" })
    );
}

#[googletest::test]
fn test_declined_root_is_left_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let lang = temp_dir.path().join("lang");
    write_json(&lang.join("en.json"), &json!({ "title": "Title" }));
    let translator = FakeTranslator::default();
    let mut asked = 0;
    let mut decline = |plan: &RootPlan| {
        asked += 1;
        assert_eq!(plan.total_keys(), 1);
        false
    };

    let report = run(&settings(lang.clone(), None), Workflow::Missing, &translator, &mut decline, &mut NoProgress);

    expect_that!(asked, eq(1));
    assert!(matches!(report.roots.first().map(|root| &root.outcome), Some(RootOutcome::Declined)));
    expect_that!(lang.join("fr.json").exists(), eq(false));
    expect_that!(translator.calls.get(), eq(0));
}

#[googletest::test]
fn test_failing_root_does_not_stop_other_roots() {
    let temp_dir = TempDir::new().unwrap();
    let lang = temp_dir.path().join("lang");
    let modules = temp_dir.path().join("modules");
    write_json(&lang.join("en.json"), &json!({ "title": "Title" }));
    // broken: 壊れた JSON
    fs::create_dir_all(modules.join("broken")).unwrap();
    fs::write(modules.join("broken/en.json"), "{ not json").unwrap();
    // crash: バックエンドエラー
    write_json(&modules.join("crash/en.json"), &json!({ "a": "fine", "b": "explode" }));
    write_json(&modules.join("shop/en.json"), &json!({ "cart": "Cart" }));
    let translator = FakeTranslator::default();

    let report = run(
        &settings(lang.clone(), Some(modules.clone())),
        Workflow::Missing,
        &translator,
        &mut always_yes,
        &mut NoProgress,
    );

    let roots: Vec<PathBuf> = report.roots.iter().map(|root| root.root.clone()).collect();
    assert_eq!(
        roots,
        vec![lang.clone(), modules.join("broken"), modules.join("crash"), modules.join("shop")]
    );
    expect_that!(report.has_failures(), eq(true));
    expect_that!(report.translated_keys(), eq(2));

    let outcome = |index: usize| &report.roots.get(index).unwrap().outcome;
    assert!(matches!(outcome(0), RootOutcome::Translated { keys: 1 }));
    assert!(matches!(outcome(1), RootOutcome::Failed(_)));
    assert!(matches!(outcome(2), RootOutcome::Failed(_)));
    assert!(matches!(outcome(3), RootOutcome::Translated { keys: 1 }));

    // バックエンドエラーのルートには何も書かれない
    expect_that!(modules.join("crash/fr.json").exists(), eq(false));
    assert_eq!(read_json(&modules.join("shop/fr.json")), json!({ "cart": "[fr] Cart" }));
}

#[googletest::test]
fn test_missing_primary_path_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let translator = FakeTranslator::default();

    let report = run(
        &settings(temp_dir.path().join("absent"), None),
        Workflow::Missing,
        &translator,
        &mut always_yes,
        &mut NoProgress,
    );

    expect_that!(report.has_failures(), eq(true));
}

#[googletest::test]
fn test_malformed_domain_does_not_stop_its_root() {
    let temp_dir = TempDir::new().unwrap();
    let lang = temp_dir.path().join("lang");
    write_json(&lang.join("en/auth.json"), &json!({ "": "oops" }));
    write_json(&lang.join("en/legacy.json"), &json!({ "Hello.": "Hi" }));
    write_json(&lang.join("en/pages.json"), &json!({ "title": "Title" }));
    let translator = FakeTranslator::default();

    let report = run(&settings(lang.clone(), None), Workflow::Missing, &translator, &mut always_yes, &mut NoProgress);

    expect_that!(report.has_failures(), eq(false));
    expect_that!(report.translated_keys(), eq(1));
    assert_eq!(read_json(&lang.join("fr/pages.json")), json!({ "title": "[fr] Title" }));
    expect_that!(lang.join("fr/auth.json").exists(), eq(false));
    expect_that!(lang.join("fr/legacy.json").exists(), eq(false));
    expect_that!(translator.calls.get(), eq(1));
}

#[googletest::test]
fn test_backend_failure_still_finishes_progress() {
    let temp_dir = TempDir::new().unwrap();
    let lang = temp_dir.path().join("lang");
    write_json(&lang.join("en.json"), &json!({ "boom": "explode" }));
    let translator = FakeTranslator::default();
    let mut progress = CountingProgress::default();

    let report = run(&settings(lang, None), Workflow::Missing, &translator, &mut always_yes, &mut progress);

    expect_that!(report.has_failures(), eq(true));
    expect_that!(progress.begun, eq(1));
    expect_that!(progress.finished, eq(1));
}

#[googletest::test]
fn test_unreadable_parent_path_still_processes_primary_path() {
    let temp_dir = TempDir::new().unwrap();
    let lang = temp_dir.path().join("lang");
    let modules = temp_dir.path().join("modules");
    write_json(&lang.join("en.json"), &json!({ "title": "Title" }));

    let translator = FakeTranslator::default();
    let report = run(
        &settings(lang.clone(), Some(modules.clone())),
        Workflow::Missing,
        &translator,
        &mut always_yes,
        &mut NoProgress,
    );

    let roots: Vec<PathBuf> = report.roots.iter().map(|root| root.root.clone()).collect();
    assert_eq!(roots, vec![lang.clone(), modules]);
    expect_that!(report.has_failures(), eq(true));
    expect_that!(report.translated_keys(), eq(1));
    assert!(matches!(report.roots.get(1).map(|root| &root.outcome), Some(RootOutcome::Failed(_))));
    assert_eq!(read_json(&lang.join("fr.json")), json!({ "title": "[fr] Title" }));
}
