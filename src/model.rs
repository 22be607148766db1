//! Core data model (spec §3).

use crate::ids::ChunkId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tagged value for the open-ended metadata maps carried on chunks and
/// components (SPEC_FULL "Dynamic metadata maps").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<MetaValue>),
    Map(HashMap<String, MetaValue>),
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}
impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}
impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}
impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

pub type MetaMap = HashMap<String, MetaValue>;

/// Chunking strategy tag carried on every chunk (spec §3, §4.C4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkStrategy {
    AstAligned,
    LineOrComponent,
}

impl ChunkStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkStrategy::AstAligned => "ast-aligned",
            ChunkStrategy::LineOrComponent => "line-or-component",
        }
    }
}

/// A contiguous, non-overlapping slice of one source file (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChunk {
    pub id: ChunkId,
    pub abs_path: String,
    pub rel_path: String,
    /// 1-based inclusive.
    pub start_line: usize,
    /// 1-based inclusive.
    pub end_line: usize,
    pub language: String,
    pub framework: Option<String>,
    pub component_type: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub dependencies: Vec<String>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub metadata: MetaMap,

    // Symbol-aware fields (spec §3), present only when symbolAware = true.
    pub symbol_aware: bool,
    pub symbol_name: Option<String>,
    pub symbol_kind: Option<String>,
    pub symbol_path: Vec<String>,
    pub parent_symbol: Option<String>,
    pub chunk_strategy: ChunkStrategy,
}

impl CodeChunk {
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// A node in the per-file symbol containment tree (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Class,
    Interface,
    Enum,
    Struct,
    Trait,
    Method,
    Function,
    Type,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::Struct => "struct",
            SymbolKind::Trait => "trait",
            SymbolKind::Method => "method",
            SymbolKind::Function => "function",
            SymbolKind::Type => "type",
        }
    }

    /// Leaf kinds never contain other symbols as children (§4.C4 step 4).
    pub fn is_leaf_kind(&self) -> bool {
        matches!(self, SymbolKind::Method | SymbolKind::Function | SymbolKind::Type)
    }
}

/// A node in the symbol containment tree, arena-indexed (spec §9: "arena
/// allocated nodes referenced by integer indices").
#[derive(Debug, Clone)]
pub struct SymbolNode {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
    pub node_type: String,
    pub content: String,
    pub exported: bool,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
}

/// Arena of [`SymbolNode`]s forming one file's containment tree.
#[derive(Debug, Clone, Default)]
pub struct SymbolTree {
    pub nodes: Vec<SymbolNode>,
    pub roots: Vec<usize>,
}

impl SymbolTree {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn symbol_path(&self, idx: usize) -> Vec<String> {
        let mut path = Vec::new();
        let mut cur = Some(idx);
        while let Some(i) = cur {
            path.push(self.nodes[i].name.clone());
            cur = self.nodes[i].parent;
        }
        path.reverse();
        path
    }
}

/// An analyzer-emitted logical unit (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub component_type: String,
    pub start_line: usize,
    pub end_line: usize,
    pub layer: Option<String>,
    pub metadata: MetaMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    pub source: String,
    pub names: Vec<String>,
    pub is_default: bool,
    pub is_dynamic: bool,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    pub is_default: bool,
    pub kind: String,
}

/// A language-agnostic pattern instance an analyzer emits (§4.C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedPattern {
    pub category: String,
    pub name: String,
}

/// A dependency declaration with category/layer, emitted by analyzers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub category: String,
    pub layer: Option<String>,
}

/// Full output of analyzing one file (§4.C5 `analyze`).
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub language: String,
    pub framework: Option<String>,
    pub components: Vec<Component>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub dependencies: Vec<Dependency>,
    pub chunks: Vec<CodeChunk>,
    pub detected_patterns: Vec<DetectedPattern>,
    pub metadata: MetaMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_kinds_cannot_contain_children_semantically() {
        assert!(SymbolKind::Function.is_leaf_kind());
        assert!(!SymbolKind::Class.is_leaf_kind());
    }

    #[test]
    fn symbol_path_orders_root_to_leaf() {
        let mut tree = SymbolTree::default();
        tree.nodes.push(SymbolNode {
            name: "Outer".into(),
            kind: SymbolKind::Class,
            start_line: 1,
            end_line: 10,
            start_byte: 0,
            end_byte: 100,
            node_type: "class_declaration".into(),
            content: String::new(),
            exported: false,
            children: vec![1],
            parent: None,
        });
        tree.nodes.push(SymbolNode {
            name: "inner".into(),
            kind: SymbolKind::Method,
            start_line: 2,
            end_line: 4,
            start_byte: 10,
            end_byte: 40,
            node_type: "method_definition".into(),
            content: String::new(),
            exported: false,
            children: vec![],
            parent: Some(0),
        });
        assert_eq!(tree.symbol_path(1), vec!["Outer".to_string(), "inner".to_string()]);
    }
}
