//! Symbol Reference Finder (spec §4.C11).

use crate::language::{self, find_identifier_occurrences};
use crate::model::CodeChunk;
use regex::Regex;
use std::path::Path;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Usage {
    pub file: String,
    pub line: usize,
    pub preview: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SymbolReferences {
    pub symbol: String,
    #[serde(rename = "usageCount")]
    pub usage_count: usize,
    pub usages: Vec<Usage>,
}

fn line_number_at(content: &str, byte_offset: usize) -> usize {
    content.as_bytes()[..byte_offset.min(content.len())].iter().filter(|&&b| b == b'\n').count() + 1
}

fn line_text(content: &str, line_number: usize) -> &str {
    content.lines().nth(line_number - 1).unwrap_or("")
}

fn build_preview(line: &str) -> String {
    let trimmed = line.trim();
    const MAX: usize = 120;
    if trimmed.len() > MAX {
        format!("{}...", &trimmed[..MAX])
    } else {
        trimmed.to_string()
    }
}

/// Exact-identifier-boundary fallback used when the Tree-sitter scan
/// returns `None` (unsupported language or a fails-closed oversize file).
fn regex_occurrences(content: &str, symbol: &str) -> Vec<usize> {
    let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(symbol))) else {
        return Vec::new();
    };
    pattern.find_iter(content).map(|m| m.start()).collect()
}

/// Finds references to `symbol` across the indexed chunk set (spec §4.C11).
///
/// Chunks are deduped by `(rel_path)` content scan since multiple chunks
/// can share a file; each candidate file's occurrences are found once
/// against its first encountered chunk content per contiguous region.
pub fn find_references(chunks: &[CodeChunk], symbol: &str, limit: usize) -> SymbolReferences {
    let mut usages: Vec<Usage> = Vec::new();

    for chunk in chunks {
        if !chunk.content.contains(symbol) {
            continue;
        }

        let lang = language::detect_language(Path::new(&chunk.rel_path));
        let byte_offsets: Vec<usize> = match lang.and_then(|l| find_identifier_occurrences(&chunk.content, l, symbol)) {
            Some(occurrences) => occurrences.into_iter().map(|(start, _)| start).collect(),
            None => regex_occurrences(&chunk.content, symbol),
        };

        for offset in byte_offsets {
            let line_in_chunk = line_number_at(&chunk.content, offset);
            let absolute_line = chunk.start_line + line_in_chunk - 1;
            let preview = build_preview(line_text(&chunk.content, line_in_chunk));
            usages.push(Usage {
                file: chunk.rel_path.clone(),
                line: absolute_line,
                preview,
            });
        }
    }

    usages.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
    usages.dedup_by(|a, b| a.file == b.file && a.line == b.line);
    usages.truncate(limit);

    SymbolReferences {
        symbol: symbol.to_string(),
        usage_count: usages.len(),
        usages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ChunkId;
    use crate::model::ChunkStrategy;

    fn chunk(rel_path: &str, content: &str, start_line: usize) -> CodeChunk {
        CodeChunk {
            id: ChunkId::new(),
            abs_path: format!("/a/{rel_path}"),
            rel_path: rel_path.to_string(),
            start_line,
            end_line: start_line + content.lines().count(),
            language: "typescript".into(),
            framework: None,
            component_type: None,
            content: content.into(),
            tags: Vec::new(),
            dependencies: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            metadata: Default::default(),
            symbol_aware: false,
            symbol_name: None,
            symbol_kind: None,
            symbol_path: Vec::new(),
            parent_symbol: None,
            chunk_strategy: ChunkStrategy::LineOrComponent,
        }
    }

    #[test]
    fn finds_identifier_via_tree_sitter_scan() {
        let c = chunk("src/a.ts", "function foo() {\n  return bar();\n}\n", 10);
        let refs = find_references(&[c], "bar", 10);
        assert_eq!(refs.usage_count, 1);
        assert_eq!(refs.usages[0].line, 11);
    }

    #[test]
    fn ignores_substring_matches_inside_longer_identifiers() {
        let c = chunk("src/a.ts", "function barBaz() {\n  return 1;\n}\n", 1);
        let refs = find_references(&[c], "bar", 10);
        assert_eq!(refs.usage_count, 0);
    }

    #[test]
    fn falls_back_to_regex_for_unsupported_language() {
        let c = chunk("src/a.unknownlang", "bar\nsome other bar line\n", 1);
        let refs = find_references(&[c], "bar", 10);
        assert_eq!(refs.usage_count, 2);
    }

    #[test]
    fn orders_by_file_then_line_and_respects_limit() {
        let a = chunk("b.ts", "foo\nfoo\n", 1);
        let b = chunk("a.ts", "foo\n", 1);
        let refs = find_references(&[a, b], "foo", 2);
        assert_eq!(refs.usages.len(), 2);
        assert_eq!(refs.usages[0].file, "a.ts");
    }
}
