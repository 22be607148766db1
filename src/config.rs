//! Layered configuration (spec SPEC_FULL "Configuration").
//!
//! Defaults -> `.codebase-context.toml` -> `CODEBASE_CONTEXT_*` env vars,
//! same layering style as the teacher's `figment`-based `Settings`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub chunker: ChunkerConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default = "default_false")]
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkerConfig {
    #[serde(default = "default_min_lines")]
    pub min_lines: usize,
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    #[serde(default = "default_max_ast_file_lines")]
    pub max_ast_chunk_file_lines: usize,
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexingConfig {
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,
    #[serde(default = "default_batch_min")]
    pub embed_batch_min: usize,
    #[serde(default = "default_batch_max")]
    pub embed_batch_max: usize,
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    #[serde(default = "default_false")]
    pub skip_embedding: bool,
    #[serde(default = "default_parse_timeout_secs")]
    pub parse_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_candidate_floor")]
    pub candidate_floor: usize,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,
    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f32,
    #[serde(default = "default_rescue_margin")]
    pub rescue_margin: f32,
}

fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}
fn default_exclude_globs() -> Vec<String> {
    vec![
        "**/target/**".into(),
        "**/node_modules/**".into(),
        "**/.git/**".into(),
        "**/dist/**".into(),
        "**/build/**".into(),
    ]
}
fn default_max_file_size() -> u64 {
    1_048_576 // 1 MiB, matches the C3 "fails closed" ceiling
}
fn default_max_files() -> usize {
    50_000
}
fn default_min_lines() -> usize {
    10
}
fn default_max_lines() -> usize {
    150
}
fn default_max_ast_file_lines() -> usize {
    10_000
}
fn default_coverage_threshold() -> f64 {
    0.85
}
fn default_parallel_threads() -> usize {
    num_cpus::get().max(1)
}
fn default_batch_min() -> usize {
    32
}
fn default_batch_max() -> usize {
    100
}
fn default_max_chunks() -> usize {
    5_000
}
fn default_parse_timeout_secs() -> u64 {
    30
}
fn default_candidate_floor() -> usize {
    30
}
fn default_rrf_k() -> f64 {
    60.0
}
fn default_low_confidence_threshold() -> f32 {
    0.35
}
fn default_rescue_margin() -> f32 {
    0.05
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            scanner: ScannerConfig::default(),
            chunker: ChunkerConfig::default(),
            indexing: IndexingConfig::default(),
            search: SearchConfig::default(),
            debug: default_false(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: default_exclude_globs(),
            max_file_size_bytes: default_max_file_size(),
            max_files: default_max_files(),
            respect_gitignore: default_true(),
        }
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_lines: default_min_lines(),
            max_lines: default_max_lines(),
            max_ast_chunk_file_lines: default_max_ast_file_lines(),
            coverage_threshold: default_coverage_threshold(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            embed_batch_min: default_batch_min(),
            embed_batch_max: default_batch_max(),
            max_chunks: default_max_chunks(),
            skip_embedding: default_false(),
            parse_timeout_secs: default_parse_timeout_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidate_floor: default_candidate_floor(),
            rrf_k: default_rrf_k(),
            low_confidence_threshold: default_low_confidence_threshold(),
            rescue_margin: default_rescue_margin(),
        }
    }
}

impl Settings {
    /// Load layered configuration: defaults -> TOML file (if present) -> env.
    ///
    /// Env vars use the `CODEBASE_CONTEXT_` prefix with `__` as the nesting
    /// separator, e.g. `CODEBASE_CONTEXT_INDEXING__PARALLEL_THREADS=8`.
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("CODEBASE_CONTEXT_").split("__"));
        figment.extract()
    }
}

/// Name of the context directory under the project root (spec §6).
pub const CONTEXT_DIR_NAME: &str = ".codebase-context";

/// Legacy artifact paths, migrated once and never read from afterwards.
pub const LEGACY_PATHS: &[&str] = &[
    ".codebase-index.json",
    ".codebase-index",
    ".codebase-intelligence.json",
];

/// Resolves the indexed root from a CLI arg, env var, or the current dir.
pub fn resolve_root(cli_arg: Option<PathBuf>, env_var: Option<String>) -> Result<PathBuf, crate::error::CoreError> {
    let candidate = cli_arg
        .or_else(|| env_var.map(PathBuf::from))
        .or_else(|| std::env::var("CODEBASE_ROOT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let abs = candidate
        .canonicalize()
        .map_err(|_| crate::error::CoreError::InvalidRoot { path: candidate.clone() })?;

    if !abs.is_dir() {
        return Err(crate::error::CoreError::InvalidRoot { path: abs });
    }
    Ok(abs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let s = Settings::default();
        assert!(s.chunker.min_lines < s.chunker.max_lines);
        assert!(s.indexing.embed_batch_min <= s.indexing.embed_batch_max);
    }

    #[test]
    fn resolve_root_rejects_files() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let err = resolve_root(Some(tmp.path().to_path_buf()), None);
        assert!(err.is_err());
    }
}
