//! Hybrid search integration (spec §8 scenarios 1-2): indexing a small
//! project end-to-end and then searching it should find both an
//! exact-identifier hit and a conceptual hit, merged via RRF.

use codectx::config::Settings;
use codectx::embedding::{EmbeddingProvider, HashingProvider};
use codectx::lexical::LexicalIndex;
use codectx::search::{self, SearchOptions};
use codectx::storage::{self, ARTIFACT_INDEX, IndexArtifact};
use codectx::vector_store::InMemoryVectorStore;
use codectx::{embedding, indexing};
use tempfile::TempDir;

fn build_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("auth.ts"),
        "export function authenticateUser(token: string) {\n  return verify(token);\n}\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("widget.ts"),
        "export function renderWidget(name: string) {\n  return `<div>${name}</div>`;\n}\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("auth.test.ts"),
        "describe('auth', () => {\n  it('authenticates', () => { authenticateUser('x'); });\n});\n",
    )
    .unwrap();
    dir
}

#[test]
fn exact_name_query_ranks_the_matching_symbol_first() {
    let dir = build_project();
    let settings = Settings::default();
    let provider = HashingProvider::new(32);
    let mut store = InMemoryVectorStore::new();
    indexing::run(dir.path(), &settings, Some(&provider), &mut store, |_| {}).unwrap();

    let index: IndexArtifact = storage::read_artifact(dir.path(), ARTIFACT_INDEX).unwrap();
    let lex = LexicalIndex::build(&index.chunks).unwrap();
    let mut vectors = InMemoryVectorStore::new();
    for (id, vector) in &index.embeddings {
        vectors.upsert(*id, vector.clone());
    }

    let options = SearchOptions::default();
    let response = search::search(
        "authenticateUser",
        5,
        &options,
        &settings.search,
        &index.chunks,
        Some(&lex),
        Some(&vectors),
        Some(&provider as &dyn EmbeddingProvider),
    );

    assert!(!response.hits.is_empty());
    assert!(response.hits[0].file_path.contains("auth"));
}

#[test]
fn non_testing_query_penalizes_test_files_below_implementation_files() {
    let dir = build_project();
    let settings = Settings::default();
    let provider = HashingProvider::new(32);
    let mut store = InMemoryVectorStore::new();
    indexing::run(dir.path(), &settings, Some(&provider), &mut store, |_| {}).unwrap();

    let index: IndexArtifact = storage::read_artifact(dir.path(), ARTIFACT_INDEX).unwrap();
    let lex = LexicalIndex::build(&index.chunks).unwrap();
    let mut vectors = InMemoryVectorStore::new();
    for (id, vector) in &index.embeddings {
        vectors.upsert(*id, vector.clone());
    }

    let options = SearchOptions::default();
    let response = search::search(
        "authenticateUser",
        5,
        &options,
        &settings.search,
        &index.chunks,
        Some(&lex),
        Some(&vectors),
        Some(&provider as &dyn EmbeddingProvider),
    );

    let impl_rank = response.hits.iter().position(|h| h.file_path == "auth.ts");
    let test_rank = response.hits.iter().position(|h| h.file_path == "auth.test.ts");
    if let (Some(i), Some(t)) = (impl_rank, test_rank) {
        assert!(i < t, "implementation file should outrank its test file for a non-testing query");
    }
}

#[test]
fn hashing_provider_is_deterministic_across_calls() {
    let provider = embedding::HashingProvider::new(16);
    let a = provider.embed_batch(&["same text".to_string()]).unwrap();
    let b = provider.embed_batch(&["same text".to_string()]).unwrap();
    assert_eq!(a, b);
}
