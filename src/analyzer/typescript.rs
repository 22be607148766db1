//! JavaScript/TypeScript analyzer: symbols, imports/exports, and a handful
//! of framework pattern detectors (dependency injection, reactivity,
//! testing).

use super::Analyzer;
use crate::config::ChunkerConfig;
use crate::model::{AnalysisResult, Component, Dependency, DetectedPattern, Export, Import, MetaMap};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub struct TypeScriptAnalyzer;

const EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*import\s+(?:(\*\s+as\s+\w+)|(\{[^}]*\})|(\w+))?\s*(?:,\s*(\{[^}]*\}))?\s*from\s*['"]([^'"]+)['"]"#).unwrap()
    })
}

fn dynamic_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"import\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap())
}

fn export_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^export\s+(default\s+)?(const|function|class|interface|type|enum)\s+([A-Za-z_$][\w$]*)").unwrap()
    })
}

impl TypeScriptAnalyzer {
    fn parse_imports(&self, content: &str) -> Vec<Import> {
        let mut out = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if let Some(caps) = import_re().captures(line) {
                let source = caps.get(5).map(|m| m.as_str().to_string()).unwrap_or_default();
                let is_default = caps.get(3).is_some();
                let mut names = Vec::new();
                if let Some(star) = caps.get(1) {
                    let _ = star;
                    names.push("*".to_string());
                }
                if let Some(named) = caps.get(2).or_else(|| caps.get(4)) {
                    for n in named.as_str().trim_matches(|c| c == '{' || c == '}').split(',') {
                        let n = n.trim();
                        if !n.is_empty() {
                            names.push(n.to_string());
                        }
                    }
                }
                if let Some(def) = caps.get(3) {
                    names.push(def.as_str().to_string());
                }
                out.push(Import {
                    source,
                    names,
                    is_default,
                    is_dynamic: false,
                    line: line_no + 1,
                });
            }
            for caps in dynamic_import_re().captures_iter(line) {
                out.push(Import {
                    source: caps[1].to_string(),
                    names: vec!["*".to_string()],
                    is_default: false,
                    is_dynamic: true,
                    line: line_no + 1,
                });
            }
        }
        out
    }

    fn parse_exports(&self, content: &str) -> Vec<Export> {
        export_re()
            .captures_iter(content)
            .map(|c| Export {
                name: c[3].to_string(),
                is_default: c.get(1).is_some(),
                kind: c[2].to_string(),
            })
            .collect()
    }

    fn detect_patterns(&self, content: &str) -> Vec<DetectedPattern> {
        let mut out = Vec::new();

        let has_inject_fn = Regex::new(r"\binject\s*\(").unwrap().is_match(content);
        let has_ctor_injection = Regex::new(r"constructor\s*\(\s*(?:private|public|protected|readonly)\b").unwrap().is_match(content);
        if has_inject_fn {
            out.push(DetectedPattern {
                category: "dependencyInjection".into(),
                name: "inject() function".into(),
            });
        }
        if has_ctor_injection {
            out.push(DetectedPattern {
                category: "dependencyInjection".into(),
                name: "Constructor injection".into(),
            });
        }

        if content.contains("computed(") {
            out.push(DetectedPattern {
                category: "reactivity".into(),
                name: "Computed".into(),
            });
        }
        if Regex::new(r"\beffect\s*\(").unwrap().is_match(content) {
            out.push(DetectedPattern {
                category: "reactivity".into(),
                name: "Effect".into(),
            });
        }

        if content.contains("useState(") {
            out.push(DetectedPattern {
                category: "stateManagement".into(),
                name: "useState hook".into(),
            });
        }
        if content.contains("createSlice(") || content.contains("combineReducers(") {
            out.push(DetectedPattern {
                category: "stateManagement".into(),
                name: "Redux".into(),
            });
        }

        if content.contains("describe(") && (content.contains("vi.mock(") || content.contains("vitest")) {
            out.push(DetectedPattern {
                category: "unitTestFramework".into(),
                name: "Vitest".into(),
            });
        } else if content.contains("describe(") && content.contains("jest") {
            out.push(DetectedPattern {
                category: "unitTestFramework".into(),
                name: "Jest".into(),
            });
        }
        if content.contains("test.describe(") || content.contains("@playwright/test") {
            out.push(DetectedPattern {
                category: "e2eFramework".into(),
                name: "Playwright".into(),
            });
        }
        if content.contains("cy.visit(") {
            out.push(DetectedPattern {
                category: "e2eFramework".into(),
                name: "Cypress".into(),
            });
        }
        if content.contains("jest.mock(") {
            out.push(DetectedPattern {
                category: "testMocking".into(),
                name: "jest.mock".into(),
            });
        }

        out
    }

    fn dependencies(&self, imports: &[Import]) -> Vec<Dependency> {
        imports
            .iter()
            .filter(|i| !i.source.starts_with('.') && !i.source.starts_with('/'))
            .map(|i| Dependency {
                name: i.source.clone(),
                category: "import".into(),
                layer: None,
            })
            .collect()
    }
}

impl Analyzer for TypeScriptAnalyzer {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn can_analyze(&self, path: &Path, _content: Option<&str>) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| EXTENSIONS.contains(&e))
            .unwrap_or(false)
    }

    fn analyze(&self, path: &Path, rel_path: &str, content: &str, chunker_config: &ChunkerConfig) -> AnalysisResult {
        let (lang, tree) = super::extract_symbol_tree(path, content)
            .map(|(l, t)| (l.as_str(), Some(t)))
            .unwrap_or(("typescript", None));

        let exports = self.parse_exports(content);
        let exported_names: std::collections::HashSet<_> = exports.iter().map(|e| e.name.clone()).collect();

        let components: Vec<Component> = tree
            .as_ref()
            .map(|t| {
                t.roots
                    .iter()
                    .map(|&idx| {
                        let node = &t.nodes[idx];
                        let mut meta = MetaMap::new();
                        meta.insert("exported".into(), exported_names.contains(&node.name).into());
                        Component {
                            name: node.name.clone(),
                            component_type: node.kind.as_str().to_string(),
                            start_line: node.start_line,
                            end_line: node.end_line,
                            layer: None,
                            metadata: meta,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let imports = self.parse_imports(content);
        let dependencies = self.dependencies(&imports);
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

    fn get_snippet_pattern(&self, category: &str, name: &str) -> Option<&'static str> {
        match (category, name) {
            ("dependencyInjection", "inject() function") => Some("const service = inject(SomeService);"),
            ("dependencyInjection", "Constructor injection") => Some("constructor(private readonly service: SomeService) {}"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkerConfig;
    use std::path::PathBuf;

    #[test]
    fn detects_inject_function_pattern() {
        let analyzer = TypeScriptAnalyzer;
        let content = "export class Foo {\n  svc = inject(SomeService);\n}\n";
        let result = analyzer.analyze(&PathBuf::from("foo.ts"), "foo.ts", content, &ChunkerConfig::default());
        assert!(result.detected_patterns.iter().any(|p| p.category == "dependencyInjection" && p.name == "inject() function"));
    }

    #[test]
    fn parses_named_imports() {
        let analyzer = TypeScriptAnalyzer;
        let content = "import { Foo, Bar } from \"./module\";\n";
        let imports = analyzer.parse_imports(content);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].source, "./module");
        assert!(imports[0].names.contains(&"Foo".to_string()));
    }
}
