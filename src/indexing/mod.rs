//! Indexer Orchestrator (spec §4.C8).
//!
//! Four phases -- Scanning, Analyzing, Embedding, Storing -- driven from
//! `run`. Stage B (Analyzing) runs in parallel across files with a worker
//! pool sized to the CPU count (spec §5); aggregation into the pattern
//! detector and graphs happens afterwards on a single thread, matching the
//! "single-writer aggregator" concurrency rule rather than sharing mutable
//! state across workers. Grounded in the teacher's staged
//! `indexing/pipeline/mod.rs` (DISCOVER -> READ -> PARSE -> COLLECT -> INDEX).

pub mod progress;

pub use progress::{Phase, ProgressEmitter, ProgressEvent};

use crate::analyzer::AnalyzerRegistry;
use crate::config::Settings;
use crate::embedding::EmbeddingProvider;
use crate::error::CoreError;
use crate::graph::{ExportRecord, ImportGraph};
use crate::ids::normalize_rel_path;
use crate::model::CodeChunk;
use crate::patterns::PatternDetector;
use crate::scanner;
use crate::storage::{self, GraphEdge, IndexArtifact, IntelligenceArtifact, RelationshipsArtifact};
use crate::vector_store::VectorStore;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, serde::Serialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IndexStats {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub chunks_indexed: usize,
    pub errors: Vec<FileError>,
    pub truncated_scan: bool,
    pub embedding_skipped: bool,
    pub embedding_capped: bool,
    pub warnings: Vec<String>,
}

/// Per-file output of Stage B, merged sequentially by the aggregator so the
/// pattern detector and graphs are only ever mutated from one place (spec
/// §5 "single-writer aggregator via per-file deltas").
struct FileDelta {
    rel_path: String,
    chunks: Vec<CodeChunk>,
    patterns: Vec<(String, String, Option<String>)>,
    external_imports: Vec<(String, usize)>,
    internal_edges: Vec<(String, Vec<String>)>,
    exports: Vec<ExportRecord>,
    mtime: Option<DateTime<Utc>>,
    error: Option<String>,
}

fn process_file(root: &Path, path: &Path, registry: &AnalyzerRegistry, settings: &Settings) -> FileDelta {
    let rel_path = normalize_rel_path(root, path);

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c.replace("\r\n", "\n").replace('\r', "\n"),
        Err(e) => {
            return FileDelta {
                rel_path,
                chunks: Vec::new(),
                patterns: Vec::new(),
                external_imports: Vec::new(),
                internal_edges: Vec::new(),
                exports: Vec::new(),
                mtime: None,
                error: Some(e.to_string()),
            };
        }
    };

    let mtime = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    let analyzer = registry.select(path, Some(&content));
    let result = analyzer.analyze(path, &rel_path, &content, &settings.chunker);

    let patterns = result
        .detected_patterns
        .iter()
        .map(|p| {
            let example = analyzer
                .get_snippet_pattern(&p.category, &p.name)
                .map(|s| s.to_string());
            (p.category.clone(), p.name.clone(), example)
        })
        .collect();

    let external_imports: Vec<(String, usize)> = result
        .imports
        .iter()
        .filter(|i| !i.source.starts_with('.'))
        .map(|i| (i.source.clone(), i.line))
        .collect();

    let internal_edges: Vec<(String, Vec<String>)> = result
        .imports
        .iter()
        .filter(|i| i.source.starts_with('.'))
        .filter_map(|i| resolve_relative_import(&rel_path, &i.source).map(|to| (to, i.names.clone())))
        .collect();

    let exports = result
        .exports
        .iter()
        .map(|e| ExportRecord {
            name: e.name.clone(),
            is_default: e.is_default,
        })
        .collect();

    FileDelta {
        rel_path,
        chunks: result.chunks,
        patterns,
        external_imports,
        internal_edges,
        exports,
        mtime,
        error: None,
    }
}

/// Resolves a relative import (`./util`, `../lib/x`) to a project-relative
/// path, assuming the common module-extension conventions. Best effort: the
/// file existing in the index is not verified here, only at graph-merge
/// time against the set of files actually scanned.
fn resolve_relative_import(from_rel: &str, source: &str) -> Option<String> {
    let dir = std::path::Path::new(from_rel).parent().unwrap_or_else(|| Path::new(""));
    let joined = dir.join(source);
    let mut normalized = PathBufNormalize::normalize(&joined);
    if normalized.starts_with("./") {
        normalized = normalized.trim_start_matches("./").to_string();
    }
    Some(normalized)
}

struct PathBufNormalize;
impl PathBufNormalize {
    fn normalize(path: &Path) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for component in path.to_string_lossy().replace('\\', "/").split('/') {
            match component {
                "" | "." => continue,
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
        parts.join("/")
    }
}

/// Picks the best matching scanned file for a resolved-but-extensionless
/// relative import target, trying common source extensions and `/index.*`.
fn match_known_file(candidate: &str, known: &HashSet<String>) -> Option<String> {
    if known.contains(candidate) {
        return Some(candidate.to_string());
    }
    const EXTS: &[&str] = &["ts", "tsx", "js", "jsx", "py", "rs"];
    for ext in EXTS {
        let with_ext = format!("{candidate}.{ext}");
        if known.contains(&with_ext) {
            return Some(with_ext);
        }
        let index = format!("{candidate}/index.{ext}");
        if known.contains(&index) {
            return Some(index);
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
pub fn run<E, V>(
    root: &Path,
    settings: &Settings,
    embedding: Option<&E>,
    vector_store: &mut V,
    mut on_progress: impl FnMut(ProgressEvent),
) -> Result<IndexStats, CoreError>
where
    E: EmbeddingProvider + ?Sized,
    V: VectorStore + ?Sized,
{
    let started_at = Utc::now();
    let mut emitter = ProgressEmitter::new(started_at);
    let mut stats = IndexStats::default();

    // Phase 1: Scanning.
    emitter.emit(Phase::Scanning, 0, 0, None, 0, &mut on_progress);
    let scan = scanner::scan(root, &settings.scanner);
    stats.files_scanned = scan.files.len();
    stats.truncated_scan = scan.truncated;
    if let Some(warning) = &scan.warning {
        stats.warnings.push(warning.clone());
    }
    emitter.emit(Phase::Scanning, 100, scan.files.len(), None, 0, &mut on_progress);

    // Phase 2: Analyzing. Parallel map, sequential fold (single-writer).
    let registry = AnalyzerRegistry::with_defaults();
    let total = scan.files.len();
    let deltas: Vec<FileDelta> = scan
        .files
        .par_iter()
        .map(|path| process_file(root, path, &registry, settings))
        .collect();

    let known_files: HashSet<String> = deltas.iter().map(|d| d.rel_path.clone()).collect();

    let mut pattern_detector = PatternDetector::new();
    let mut import_graph = ImportGraph::new();
    let mut edges: Vec<GraphEdge> = Vec::new();
    let mut exports_by_file: HashMap<String, Vec<ExportRecord>> = HashMap::new();
    let mut all_chunks: Vec<CodeChunk> = Vec::new();

    for (idx, delta) in deltas.into_iter().enumerate() {
        emitter.emit(Phase::Analyzing, idx + 1, total, Some(delta.rel_path.clone()), stats.errors.len(), &mut on_progress);

        if let Some(err) = delta.error {
            stats.errors.push(FileError {
                file: delta.rel_path.clone(),
                message: err,
            });
            continue;
        }

        for (category, name, example) in &delta.patterns {
            let example_ref = example.as_ref().map(|s| (delta.rel_path.as_str(), s.as_str()));
            pattern_detector.track(category, name, example_ref, delta.mtime);
        }
        for (source, line) in &delta.external_imports {
            import_graph.track(source, &delta.rel_path, *line);
        }
        for (target, symbols) in &delta.internal_edges {
            if let Some(resolved) = match_known_file(target, &known_files) {
                edges.push(GraphEdge {
                    from: delta.rel_path.clone(),
                    to: resolved,
                    symbols: symbols.clone(),
                });
            }
        }
        if !delta.exports.is_empty() {
            exports_by_file.insert(delta.rel_path.clone(), delta.exports.clone());
        }

        stats.files_indexed += 1;
        all_chunks.extend(delta.chunks);
    }
    stats.chunks_indexed = all_chunks.len();

    // Phase 3: Embedding (optional).
    let mut embeddings: HashMap<crate::ids::ChunkId, Vec<f32>> = HashMap::new();
    vector_store_clear(vector_store);
    if settings.indexing.skip_embedding {
        stats.embedding_skipped = true;
    } else if let Some(provider) = embedding {
        let cap = settings.indexing.max_chunks;
        let embeddable = if all_chunks.len() > cap {
            stats.embedding_capped = true;
            stats
                .warnings
                .push(format!("embedding capped at MAX_CHUNKS ({cap}); {} chunks left unembedded", all_chunks.len() - cap));
            &all_chunks[..cap]
        } else {
            &all_chunks[..]
        };

        let batch_size = settings.indexing.embed_batch_max.max(1);
        let mut embedded_so_far = 0usize;
        for batch in embeddable.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(searchable_text).collect();
            let vectors = provider.embed_batch(&texts)?;
            for (chunk, vector) in batch.iter().zip(vectors) {
                vector_store.upsert(chunk.id, vector.clone());
                embeddings.insert(chunk.id, vector);
            }
            embedded_so_far += batch.len();
            emitter.emit(Phase::Embedding, embedded_so_far, embeddable.len(), None, stats.errors.len(), &mut on_progress);
        }
    }

    // Phase 4: Storing. Manifest written last, after every other artifact.
    emitter.emit(Phase::Storing, total, total, None, stats.errors.len(), &mut on_progress);

    let generated_at = Utc::now();
    let index_artifact = IndexArtifact {
        generated_at,
        chunks: all_chunks,
        embeddings,
    };
    let intelligence_artifact = IntelligenceArtifact::build(generated_at, &pattern_detector, &import_graph);
    let relationships_artifact = RelationshipsArtifact::new(edges, exports_by_file);

    let index_fp = storage::write_artifact(root, storage::ARTIFACT_INDEX, &index_artifact)?;
    let intelligence_fp = storage::write_artifact(root, storage::ARTIFACT_INTELLIGENCE, &intelligence_artifact)?;
    let relationships_fp = storage::write_artifact(root, storage::ARTIFACT_RELATIONSHIPS, &relationships_artifact)?;

    let mut artifacts = HashMap::new();
    artifacts.insert(storage::ARTIFACT_INDEX.to_string(), index_fp);
    artifacts.insert(storage::ARTIFACT_INTELLIGENCE.to_string(), intelligence_fp);
    artifacts.insert(storage::ARTIFACT_RELATIONSHIPS.to_string(), relationships_fp);

    let config_bytes = toml::to_string(settings).unwrap_or_default();
    let config_fingerprint = storage::sha256_hex(config_bytes.as_bytes());
    let manifest = storage::Manifest::new(artifacts, config_fingerprint, generated_at, uuid::Uuid::new_v4().to_string());
    let manifest_bytes = serde_json::to_vec_pretty(&manifest).map_err(|e| CoreError::Internal(e.to_string()))?;
    storage::write_atomic(&storage::artifact_path(root, "manifest.json"), &manifest_bytes)?;

    emitter.emit(Phase::Storing, total, total, None, stats.errors.len(), &mut on_progress);

    Ok(stats)
}

fn vector_store_clear<V: VectorStore + ?Sized>(_store: &mut V) {
    // InMemoryVectorStore is rebuilt wholesale by upsert during the embedding
    // phase; a persisted ANN engine would truncate its segment files here.
}

fn searchable_text(chunk: &CodeChunk) -> String {
    let mut prefix = String::new();
    if let Some(ct) = &chunk.component_type {
        prefix.push_str(ct);
        prefix.push(' ');
    }
    if let Some(name) = &chunk.symbol_name {
        prefix.push_str(name);
        prefix.push(' ');
    }
    format!("{prefix}{}", chunk.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingProvider;
    use crate::vector_store::InMemoryVectorStore;
    use tempfile::TempDir;

    #[test]
    fn indexes_a_small_project_and_writes_all_artifacts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.ts"),
            "export function inject() { return 1; }\nexport class Foo {\n  bar() { return inject(); }\n}\n",
        )
        .unwrap();

        let settings = Settings::default();
        let provider = HashingProvider::new(16);
        let mut store = InMemoryVectorStore::new();
        let mut events = Vec::new();

        let stats = run(dir.path(), &settings, Some(&provider), &mut store, |e| events.push(e)).unwrap();

        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.files_indexed, 1);
        assert!(stats.chunks_indexed > 0);
        assert!(dir.path().join(".codebase-context/manifest.json").exists());
        assert!(dir.path().join(".codebase-context/index.json").exists());
        assert!(dir.path().join(".codebase-context/intelligence.json").exists());
        assert!(dir.path().join(".codebase-context/relationships.json").exists());
    }

    #[test]
    fn resolves_simple_relative_import() {
        assert_eq!(resolve_relative_import("src/app.ts", "./util"), Some("src/util".to_string()));
        assert_eq!(resolve_relative_import("src/nested/app.ts", "../lib/x"), Some("src/lib/x".to_string()));
    }
}
