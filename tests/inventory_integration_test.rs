//! Integration tests for loading the fixture inventory and testing its texts
//!
//! The fixture catalog declares documents under the repository prefix used by
//! the reference collection; a rewriting rule maps them onto `tests/fixtures`.

mod common;

use common::test_helpers::{REPOSITORY_PREFIX, TestFixtures};
use cts_validate::{CtsError, Inventory, InventoryOptions, TextKind, ValidationStatus, Warning};

fn load_inventory() -> Inventory {
    let fixtures = TestFixtures::new();
    Inventory::from_path(fixtures.inventory(), &fixtures.options()).unwrap()
}

#[test]
fn test_catalog_structure() {
    let inventory = load_inventory();

    assert_eq!(inventory.text_groups().len(), 1);
    assert_eq!(inventory.skipped_entries(), 0);

    let group = inventory.text_group("greekLit:tlg0003").unwrap();
    assert_eq!(group.name(), "Thucydides");
    assert_eq!(group.works.len(), 1);

    let work = &group.works[0];
    assert_eq!(work.id, "greekLit:tlg001");
    assert_eq!(work.lang.as_deref(), Some("grc"));
    assert_eq!(work.editions.len(), 1);
    assert_eq!(work.translations.len(), 1);
    assert_eq!(work.translations[0].lang.as_deref(), Some("eng"));
}

#[test]
fn test_work_titles_by_language() {
    let inventory = load_inventory();
    let work = &inventory.text_group("greekLit:tlg0003").unwrap().works[0];

    assert_eq!(work.get_title(Some("fr")).unwrap(), "La guerre du Peloponnese");
    assert_eq!(work.get_title(None).unwrap(), "The Peloponnesian War");
    // Unknown languages fall back to English
    assert_eq!(work.get_title(Some("de")).unwrap(), "The Peloponnesian War");
}

#[test]
fn test_texts_in_catalog_order() {
    let inventory = load_inventory();
    let texts = inventory.get_texts();

    let ids: Vec<&str> = texts.iter().map(|text| text.id()).collect();
    assert_eq!(ids, vec!["greekLit:perseus-grc2", "greekLit:perseus-eng1"]);
    assert_eq!(texts[0].kind(), TextKind::Edition);
    assert_eq!(texts[1].kind(), TextKind::Translation);
    assert_eq!(
        texts[1].get_title(Some("en")).unwrap(),
        "History of the Peloponnesian War (English translation by Thomas Hobbes)"
    );
}

#[test]
fn test_declared_paths_are_rewritten() {
    let fixtures = TestFixtures::new();
    let inventory = load_inventory();
    let texts = inventory.get_texts();
    let translation = texts[1].document();

    assert_eq!(
        translation.declared_path(),
        format!("{}tlg0003.tlg001.perseus-eng1.xml", REPOSITORY_PREFIX)
    );
    assert_eq!(
        translation.path(),
        format!(
            "{}/tlg0003.tlg001.perseus-eng1.xml",
            fixtures.fixtures_dir.display()
        )
    );
}

#[test]
fn test_edition_citation_levels() {
    let inventory = load_inventory();
    let texts = inventory.get_texts();
    let edition = texts[0].document();

    let labels: Vec<&str> = edition
        .citation()
        .levels()
        .into_iter()
        .map(|level| level.label())
        .collect();
    assert_eq!(labels, vec!["book", "chapter", "section"]);

    let report = edition.test_citation().unwrap();
    assert_eq!(report.results, vec![true, true, false]);
    assert_eq!(report.failed_levels(), vec![3]);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_translation_citation_levels_and_ref_states() {
    let inventory = load_inventory();
    let texts = inventory.get_texts();
    let translation = texts[1].document();

    let report = translation.test_citation().unwrap();
    assert_eq!(report.results, vec![true, true]);
    assert_eq!(
        report.warnings,
        vec![Warning::RefStateMismatch {
            level: 2,
            label: "chapter".to_string(),
            unit: "error_creator".to_string(),
        }]
    );
    assert_eq!(
        report.warnings[0].to_string(),
        "Citation Mapping (2) has label chapter, while refState[2] has unit error_creator"
    );
}

#[test]
fn test_validate_fixture_inventory() {
    let inventory = load_inventory();
    let engine = cts_validate::ValidationEngine::new(Default::default());
    let results = engine.validate_inventory(&inventory).unwrap();

    assert_eq!(results.total_texts, 2);
    assert_eq!(results.passed_texts, 0);
    assert_eq!(results.failed_texts, 2);
    assert_eq!(results.error_texts, 0);

    assert_eq!(results.text_results[0].text_id, "greekLit:perseus-grc2");
    assert_eq!(
        results.text_results[0].status,
        ValidationStatus::Failed {
            failed_levels: vec![3],
            warning_count: 0,
        }
    );
    assert_eq!(
        results.text_results[1].status,
        ValidationStatus::Failed {
            failed_levels: vec![],
            warning_count: 1,
        }
    );
}

#[test]
fn test_unrewritten_paths_report_io_errors() {
    let fixtures = TestFixtures::new();
    let inventory = Inventory::from_path(fixtures.inventory(), &InventoryOptions::default()).unwrap();
    let texts = inventory.get_texts();

    assert_eq!(texts[0].document().path(), texts[0].document().declared_path());
    let err = texts[0].document().test_citation().unwrap_err();
    assert!(matches!(err, CtsError::Io { .. }));

    let engine = cts_validate::ValidationEngine::new(Default::default());
    let results = engine.validate_inventory(&inventory).unwrap();
    assert_eq!(results.error_texts, 2);
    assert!(results.has_failures());
}

#[test]
fn test_missing_inventory_file() {
    let err = Inventory::from_path("/nonexistent/inventory.xml", &InventoryOptions::default())
        .unwrap_err();
    assert!(matches!(err, CtsError::Io { .. }));
}
