//! On-disk shape of the three index artifacts (spec §6 filesystem layout).

use crate::graph::{ExportRecord, ImportGraph, InternalFileGraph};
use crate::ids::ChunkId;
use crate::model::CodeChunk;
use crate::patterns::{Consensus, GoldenFileEntry, PatternDetector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `index.json`: the full chunk list plus the embeddings that back the
/// semantic channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexArtifact {
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    pub chunks: Vec<CodeChunk>,
    /// Per-chunk embedding, aligned by position with `chunks`. Empty when
    /// `indexing.skip_embedding` was set.
    pub embeddings: HashMap<ChunkId, Vec<f32>>,
}

/// `intelligence.json`: library/pattern consensus, golden files, and the
/// external import usage graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelligenceArtifact {
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    pub patterns: HashMap<String, Consensus>,
    #[serde(rename = "goldenFiles")]
    pub golden_files: Vec<GoldenFileEntry>,
    #[serde(rename = "topLibraries")]
    pub top_libraries: Vec<LibraryUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryUsage {
    pub name: String,
    pub count: usize,
}

/// `relationships.json`: the internal file import/export graph, persisted
/// as plain edge/export lists (spec §4.C7 `InternalFileGraph`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipsArtifact {
    pub edges: Vec<GraphEdge>,
    pub exports: HashMap<String, Vec<ExportRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub symbols: Vec<String>,
}

impl IntelligenceArtifact {
    pub fn build(generated_at: DateTime<Utc>, detector: &PatternDetector, import_graph: &ImportGraph) -> Self {
        let mut patterns = HashMap::new();
        for category in detector.categories() {
            if let Some(consensus) = detector.get_consensus(category, generated_at) {
                patterns.insert(category.clone(), consensus);
            }
        }
        let top_libraries = import_graph
            .top_used(50)
            .into_iter()
            .map(|(name, count)| LibraryUsage { name, count })
            .collect();
        Self {
            generated_at,
            patterns,
            golden_files: detector.golden_files(20),
            top_libraries,
        }
    }
}

impl RelationshipsArtifact {
    /// Flattens an [`InternalFileGraph`] into a serializable edge list. The
    /// graph does not expose its adjacency map directly (it only answers
    /// targeted queries), so the indexer accumulates edges as it discovers
    /// them rather than re-deriving them here.
    pub fn new(edges: Vec<GraphEdge>, exports: HashMap<String, Vec<ExportRecord>>) -> Self {
        Self { edges, exports }
    }

    pub fn rebuild_graph(&self) -> InternalFileGraph {
        let mut graph = InternalFileGraph::new();
        for edge in &self.edges {
            graph.track_import(&edge.from, &edge.to, &edge.symbols);
        }
        for (file, exports) in &self.exports {
            graph.track_exports(file, exports.clone());
        }
        graph
    }
}
