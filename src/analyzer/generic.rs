//! Generic fallback analyzer: language-agnostic filler chunking only.

use super::Analyzer;
use crate::config::ChunkerConfig;
use crate::model::AnalysisResult;
use std::path::Path;

pub struct GenericAnalyzer;

impl Analyzer for GenericAnalyzer {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn can_analyze(&self, _path: &Path, _content: Option<&str>) -> bool {
        true
    }

    fn analyze(&self, path: &Path, rel_path: &str, content: &str, chunker_config: &ChunkerConfig) -> AnalysisResult {
        let chunks = super::chunk_with_tree(path, rel_path, content, "plaintext", None, &[], None, chunker_config);
        AnalysisResult {
            language: "plaintext".to_string(),
            chunks,
            ..Default::default()
        }
    }
}
