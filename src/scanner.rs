//! File Scanner (spec §4.C2).
//!
//! Produces a bounded, lazily-collected list of candidate files: include
//! globs -> exclude globs -> gitignore rules -> language/binary filter ->
//! size filter, grounded in the teacher's `ignore`-based walk
//! (teacher: `src/indexing/walker.rs`).

use crate::config::ScannerConfig;
use glob::Pattern;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Extensions the language detector recognizes; used here only to skip
/// obviously-binary files early (the detector makes the authoritative call).
const KNOWN_TEXT_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "pyi", "toml", "json", "md", "txt", "yaml", "yml",
];

pub struct ScanResult {
    pub files: Vec<PathBuf>,
    pub truncated: bool,
    pub warning: Option<String>,
}

pub fn scan(root: &Path, config: &ScannerConfig) -> ScanResult {
    let includes: Vec<Pattern> = config
        .include_globs
        .iter()
        .filter_map(|p| Pattern::new(p).ok())
        .collect();
    let excludes: Vec<Pattern> = config
        .exclude_globs
        .iter()
        .filter_map(|p| Pattern::new(p).ok())
        .collect();

    let mut builder = WalkBuilder::new(root);
    builder
        .git_ignore(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .hidden(false)
        .follow_links(true);

    let mut files = Vec::new();
    let mut truncated = false;

    for entry in builder.build() {
        let Ok(entry) = entry else { continue };
        let path = entry.path();

        // `ignore` resolves symlinks for content but `path()` stays inside
        // `root`'s walk tree, so we never traverse outside root.
        if !path.is_file() {
            continue;
        }
        let Ok(canon) = path.canonicalize() else { continue };
        if !canon.starts_with(root) {
            continue;
        }

        let rel = path.strip_prefix(root).unwrap_or(path);
        let rel_str = rel.to_string_lossy().replace('\\', "/");

        if !includes.is_empty() && !includes.iter().any(|p| p.matches(&rel_str)) {
            continue;
        }
        if excludes.iter().any(|p| p.matches(&rel_str)) {
            continue;
        }

        if !is_plausible_text_file(path) {
            continue;
        }

        if let Ok(meta) = std::fs::metadata(path) {
            if meta.len() > config.max_file_size_bytes {
                continue;
            }
        } else {
            continue;
        }

        files.push(path.to_path_buf());

        if files.len() >= config.max_files {
            truncated = true;
            break;
        }
    }

    let warning = truncated.then(|| {
        format!(
            "scan truncated at MAX_FILES ({}); some files were not indexed",
            config.max_files
        )
    });

    ScanResult {
        files,
        truncated,
        warning,
    }
}

fn is_plausible_text_file(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => KNOWN_TEXT_EXTENSIONS.contains(&ext) || crate::language::detect_language(path).is_some(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn excludes_node_modules_and_respects_size_cap() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/lib.js"), "x").unwrap();
        fs::write(dir.path().join("main.ts"), "export const x = 1;").unwrap();
        fs::write(dir.path().join("huge.ts"), "x".repeat(2_000_000)).unwrap();

        let mut cfg = ScannerConfig::default();
        cfg.max_file_size_bytes = 1_048_576;
        let result = scan(dir.path(), &cfg);

        let names: Vec<String> = result
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"main.ts".to_string()));
        assert!(!names.iter().any(|n| n == "lib.js"));
        assert!(!names.contains(&"huge.ts".to_string()));
    }

    #[test]
    fn truncates_at_max_files() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{i}.rs")), "fn a() {}").unwrap();
        }
        let mut cfg = ScannerConfig::default();
        cfg.max_files = 3;
        let result = scan(dir.path(), &cfg);
        assert_eq!(result.files.len(), 3);
        assert!(result.truncated);
        assert!(result.warning.is_some());
    }
}
