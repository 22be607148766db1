//! Language Detector & Tree-sitter Adapter (spec §4.C3).

mod cache;
mod symbols;

pub use symbols::{extract_symbols, find_identifier_occurrences};

use std::path::Path;

/// A curated, shippable grammar (spec §4.C3: "only curated grammars are shipped").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Language {
    Rust,
    TypeScript,
    Tsx,
    JavaScript,
    Python,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }

    /// The JS/TS family gets the "variable declarator with arrow/function
    /// initializer" symbol rule (spec §4.C3).
    pub fn is_js_family(self) -> bool {
        matches!(self, Language::TypeScript | Language::Tsx | Language::JavaScript)
    }
}

/// Detects language by extension, falling back to a small shebang heuristic
/// for extensionless scripts (spec §4.C3).
pub fn detect_language(path: &Path) -> Option<Language> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        return match ext {
            "rs" => Some(Language::Rust),
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            "tsx" => Some(Language::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "py" | "pyi" => Some(Language::Python),
            _ => None,
        };
    }
    detect_by_shebang(path)
}

fn detect_by_shebang(path: &Path) -> Option<Language> {
    let content = std::fs::read_to_string(path).ok()?;
    let first_line = content.lines().next()?;
    if !first_line.starts_with("#!") {
        return None;
    }
    if first_line.contains("python") {
        Some(Language::Python)
    } else if first_line.contains("node") {
        Some(Language::JavaScript)
    } else {
        None
    }
}

/// Whether a curated WASM-equivalent grammar exists for `lang`. All five
/// shipped grammars are native `tree-sitter-*` crates; this always returns
/// true for a [`Language`] variant by construction, kept as an explicit
/// capability check so callers don't need to match on the enum themselves.
pub fn supports_grammar(_lang: Language) -> bool {
    true
}

/// Content above this size fails closed in `extract_symbols` (spec §4.C3).
pub const MAX_PARSE_CONTENT_BYTES: usize = 1_048_576;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension() {
        assert_eq!(detect_language(Path::new("a.rs")), Some(Language::Rust));
        assert_eq!(detect_language(Path::new("a.tsx")), Some(Language::Tsx));
        assert_eq!(detect_language(Path::new("a.py")), Some(Language::Python));
        assert_eq!(detect_language(Path::new("a.unknownext")), None);
    }
}
