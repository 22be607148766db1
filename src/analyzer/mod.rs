//! Analyzer Registry & Framework Analyzers (spec §4.C5).

mod generic;
mod rust_lang;
mod typescript;

use crate::chunker;
use crate::config::ChunkerConfig;
use crate::language::{self, Language};
use crate::model::{AnalysisResult, MetaMap};
use std::path::Path;

/// Capability set every analyzer implements (spec §4.C5, §9 "Polymorphic
/// analyzers"). No inheritance: the registry composes implementations by
/// priority, matching the teacher's `LanguageParser` trait-object style.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Higher runs first when more than one analyzer claims a file.
    fn priority(&self) -> i32;

    fn supported_extensions(&self) -> &'static [&'static str];

    fn can_analyze(&self, path: &Path, content: Option<&str>) -> bool;

    fn analyze(&self, path: &Path, rel_path: &str, content: &str, chunker_config: &ChunkerConfig) -> AnalysisResult;

    /// Best-effort, repo-wide metadata (frameworks, package manager, ...).
    fn detect_codebase_metadata(&self, _root: &Path) -> MetaMap {
        MetaMap::new()
    }

    /// One-line human summary of a chunk, used by search result rendering.
    fn summarize(&self, chunk: &crate::model::CodeChunk) -> String {
        chunk
            .symbol_name
            .clone()
            .unwrap_or_else(|| format!("{}:{}-{}", chunk.rel_path, chunk.start_line, chunk.end_line))
    }

    /// Canonical snippet text for a detected pattern name, used when the
    /// pattern detector needs an example to anchor a category.
    fn get_snippet_pattern(&self, _category: &str, _name: &str) -> Option<&'static str> {
        None
    }
}

/// Priority-sorted set of registered analyzers (spec §4.C5).
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    pub fn with_defaults() -> Self {
        let mut analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(typescript::TypeScriptAnalyzer),
            Box::new(rust_lang::RustAnalyzer),
            Box::new(generic::GenericAnalyzer),
        ];
        analyzers.sort_by_key(|a| std::cmp::Reverse(a.priority()));
        Self { analyzers }
    }

    /// Selects the highest-priority analyzer whose `can_analyze` returns
    /// true (spec §4.C5).
    pub fn select(&self, path: &Path, content: Option<&str>) -> &dyn Analyzer {
        self.analyzers
            .iter()
            .find(|a| a.can_analyze(path, content))
            .map(|a| a.as_ref())
            .unwrap_or_else(|| self.analyzers.last().expect("generic analyzer always present").as_ref())
    }

    /// Merges `detect_codebase_metadata` across every registered analyzer;
    /// higher priority wins on key conflicts (spec §4.C5).
    pub fn detect_metadata(&self, root: &Path) -> MetaMap {
        let mut merged = MetaMap::new();
        // Lowest priority first so higher-priority inserts overwrite.
        for analyzer in self.analyzers.iter().rev() {
            merged.extend(analyzer.detect_codebase_metadata(root));
        }
        merged
    }

    pub fn analyzers(&self) -> &[Box<dyn Analyzer>] {
        &self.analyzers
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Shared helper: run the Tree-sitter symbol extraction for `path`/`content`
/// when the language is recognized, otherwise `None`.
pub(crate) fn extract_symbol_tree(path: &Path, content: &str) -> Option<(Language, crate::model::SymbolTree)> {
    let lang = language::detect_language(path)?;
    let tree = language::extract_symbols(content, lang)?;
    Some((lang, tree))
}

pub(crate) fn chunk_with_tree(
    path: &Path,
    rel_path: &str,
    content: &str,
    language: &str,
    framework: Option<&str>,
    components: &[crate::model::Component],
    tree: Option<&crate::model::SymbolTree>,
    cfg: &ChunkerConfig,
) -> Vec<crate::model::CodeChunk> {
    let abs = path.to_string_lossy().to_string();
    chunker::chunk_file(&abs, rel_path, content, language, framework, components, tree, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn registry_picks_typescript_over_generic() {
        let registry = AnalyzerRegistry::with_defaults();
        let chosen = registry.select(&PathBuf::from("a.ts"), Some("export class Foo {}"));
        assert_eq!(chosen.name(), "typescript");
    }

    #[test]
    fn registry_falls_back_to_generic_for_unknown_extension() {
        let registry = AnalyzerRegistry::with_defaults();
        let chosen = registry.select(&PathBuf::from("README.md"), Some("# hi"));
        assert_eq!(chosen.name(), "generic");
    }
}
