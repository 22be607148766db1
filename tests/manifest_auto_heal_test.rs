//! End-to-end auto-heal: a missing or corrupted manifest triggers exactly
//! one rebuild, after which the index reports ready (spec §8 scenario 5).

use codectx::config::Settings;
use codectx::embedding::HashingProvider;
use codectx::vector_store::InMemoryVectorStore;
use codectx::{indexing, storage};
use std::cell::Cell;
use tempfile::TempDir;

fn write_sample_project(dir: &TempDir) {
    std::fs::write(
        dir.path().join("lib.ts"),
        "export function add(a: number, b: number) { return a + b; }\n",
    )
    .unwrap();
}

#[test]
fn missing_index_heals_itself_on_first_call() {
    let dir = TempDir::new().unwrap();
    write_sample_project(&dir);
    let settings = Settings::default();

    let rebuilt = Cell::new(false);
    let signal = storage::ensure_valid_or_auto_heal(dir.path(), || {
        rebuilt.set(true);
        let provider = HashingProvider::new(16);
        let mut store = InMemoryVectorStore::new();
        indexing::run(dir.path(), &settings, Some(&provider), &mut store, |_| {})?;
        Ok(())
    })
    .unwrap();

    assert!(rebuilt.get());
    assert_eq!(signal.status, storage::IndexStatus::Ready);
    assert_eq!(signal.action, storage::Action::RebuiltAndServed);

    // A second call against a now-healthy index should not invoke rebuild.
    let rebuilt_again = Cell::new(false);
    let signal = storage::ensure_valid_or_auto_heal(dir.path(), || {
        rebuilt_again.set(true);
        Ok(())
    })
    .unwrap();
    assert!(!rebuilt_again.get());
    assert_eq!(signal.action, storage::Action::Served);
}

#[test]
fn truncated_artifact_is_detected_and_rebuild_restores_validity() {
    let dir = TempDir::new().unwrap();
    write_sample_project(&dir);
    let settings = Settings::default();
    let provider = HashingProvider::new(16);
    let mut store = InMemoryVectorStore::new();
    indexing::run(dir.path(), &settings, Some(&provider), &mut store, |_| {}).unwrap();

    // Corrupt the index artifact by truncating it; the fingerprint in the
    // manifest no longer matches its contents.
    let index_path = storage::artifact_path(dir.path(), storage::ARTIFACT_INDEX);
    std::fs::write(&index_path, b"{\"truncated\":true").unwrap();

    let report = storage::require_valid_index(dir.path());
    assert_eq!(report.status, storage::IndexStatus::RebuildRequired);

    let signal = storage::ensure_valid_or_auto_heal(dir.path(), || {
        let provider = HashingProvider::new(16);
        let mut store = InMemoryVectorStore::new();
        indexing::run(dir.path(), &settings, Some(&provider), &mut store, |_| {})?;
        Ok(())
    })
    .unwrap();
    assert_eq!(signal.status, storage::IndexStatus::Ready);
    assert_eq!(signal.action, storage::Action::RebuiltAndServed);
}
