//! Rust analyzer: symbols, `use` imports, `pub` exports, and a handful of
//! ecosystem pattern detectors.

use super::Analyzer;
use crate::config::ChunkerConfig;
use crate::model::{AnalysisResult, Component, Dependency, DetectedPattern, Export, Import, MetaMap};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub struct RustAnalyzer;

fn use_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*use\s+([\w:]+)(?:::\{([^}]*)\})?\s*;").unwrap())
}

fn pub_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*pub\s+(fn|struct|enum|trait|type|const)\s+([A-Za-z_]\w*)").unwrap())
}

impl RustAnalyzer {
    fn parse_imports(&self, content: &str) -> Vec<Import> {
        let mut out = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if let Some(caps) = use_re().captures(line) {
                let source = caps[1].to_string();
                let names = caps
                    .get(2)
                    .map(|m| m.as_str().split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                    .unwrap_or_default();
                out.push(Import {
                    source,
                    names,
                    is_default: false,
                    is_dynamic: false,
                    line: line_no + 1,
                });
            }
        }
        out
    }

    fn parse_exports(&self, content: &str) -> Vec<Export> {
        pub_item_re()
            .captures_iter(content)
            .map(|c| Export {
                name: c[2].to_string(),
                is_default: false,
                kind: c[1].to_string(),
            })
            .collect()
    }

    fn detect_patterns(&self, content: &str) -> Vec<DetectedPattern> {
        let mut out = Vec::new();
        if content.contains("thiserror::Error") || content.contains("#[derive(Error") {
            out.push(DetectedPattern {
                category: "errorHandling".into(),
                name: "thiserror".into(),
            });
        }
        if content.contains("anyhow::") {
            out.push(DetectedPattern {
                category: "errorHandling".into(),
                name: "anyhow".into(),
            });
        }
        if content.contains("#[tokio::main]") || content.contains("tokio::spawn") {
            out.push(DetectedPattern {
                category: "asyncRuntime".into(),
                name: "tokio".into(),
            });
        }
        if content.contains("#[derive(Serialize") || content.contains("#[derive(Deserialize") {
            out.push(DetectedPattern {
                category: "serialization".into(),
                name: "serde".into(),
            });
        }
        out
    }
}

impl Analyzer for RustAnalyzer {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn can_analyze(&self, path: &Path, _content: Option<&str>) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("rs")
    }

    fn analyze(&self, path: &Path, rel_path: &str, content: &str, chunker_config: &ChunkerConfig) -> AnalysisResult {
        let (lang, tree) = super::extract_symbol_tree(path, content)
            .map(|(l, t)| (l.as_str(), Some(t)))
            .unwrap_or(("rust", None));

        let components: Vec<Component> = tree
            .as_ref()
            .map(|t| {
                t.roots
                    .iter()
                    .map(|&idx| {
                        let node = &t.nodes[idx];
                        Component {
                            name: node.name.clone(),
                            component_type: node.kind.as_str().to_string(),
                            start_line: node.start_line,
                            end_line: node.end_line,
                            layer: None,
                            metadata: MetaMap::new(),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let imports = self.parse_imports(content);
        let exports = self.parse_exports(content);
        let dependencies: Vec<Dependency> = imports
            .iter()
            .filter(|i| !i.source.starts_with("crate") && !i.source.starts_with("self") && !i.source.starts_with("super"))
            .map(|i| Dependency {
                name: i.source.split("::").next().unwrap_or(&i.source).to_string(),
                category: "use".into(),
                layer: None,
            })
            .collect();
        let detected_patterns = self.detect_patterns(content);
        let chunks = super::chunk_with_tree(path, rel_path, content, lang, None, &components, tree.as_ref(), chunker_config);

        AnalysisResult {
            language: lang.to_string(),
            framework: None,
            components,
            imports,
            exports,
            dependencies,
            chunks,
            detected_patterns,
            metadata: MetaMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_thiserror_pattern() {
        let analyzer = RustAnalyzer;
        let content = "use thiserror::Error;\n#[derive(Error, Debug)]\npub enum E { #[error(\"x\")] X }\n";
        let result = analyzer.analyze(&PathBuf::from("e.rs"), "e.rs", content, &ChunkerConfig::default());
        assert!(result.detected_patterns.iter().any(|p| p.name == "thiserror"));
    }
}
