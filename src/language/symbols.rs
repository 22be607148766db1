//! Symbol extraction and identifier scanning (spec §4.C3).

use super::cache::with_parser;
use super::{Language, MAX_PARSE_CONTENT_BYTES};
use crate::model::{SymbolKind, SymbolNode, SymbolTree};
use std::collections::HashSet;
use tree_sitter::Node;

/// Classifies a tree-sitter node kind into a [`SymbolKind`], given whether it
/// sits inside a type body (class/impl/trait) — used to distinguish
/// `method` from free `function`.
fn classify(lang: Language, kind: &str, in_type_body: bool) -> Option<SymbolKind> {
    use SymbolKind::*;
    match lang {
        Language::Rust => match kind {
            "struct_item" => Some(Struct),
            "enum_item" => Some(Enum),
            "trait_item" => Some(Trait),
            "type_item" => Some(Type),
            "function_item" => Some(if in_type_body { Method } else { Function }),
            _ => None,
        },
        Language::Python => match kind {
            "class_definition" => Some(Class),
            "function_definition" => Some(if in_type_body { Method } else { Function }),
            _ => None,
        },
        Language::TypeScript | Language::Tsx | Language::JavaScript => match kind {
            "class_declaration" | "class" => Some(Class),
            "interface_declaration" => Some(Interface),
            "enum_declaration" => Some(Enum),
            "type_alias_declaration" => Some(Type),
            "function_declaration" | "function" | "generator_function_declaration" => Some(Function),
            "method_definition" => Some(Method),
            _ => None,
        },
    }
}

/// True when `kind` opens a new "type body" scope for method/function
/// disambiguation (class bodies, impl/trait blocks).
fn opens_type_body(lang: Language, kind: &str) -> bool {
    match lang {
        Language::Rust => matches!(kind, "impl_item" | "trait_item"),
        Language::Python => matches!(kind, "class_definition"),
        Language::TypeScript | Language::Tsx | Language::JavaScript => {
            matches!(kind, "class_declaration" | "class")
        }
    }
}

/// JS/TS-only rule: `const name = (args) => {...}` or `const name =
/// function() {}` counts as a function symbol (spec §4.C3).
fn js_variable_declarator_symbol(lang: Language, node: &Node, src: &[u8]) -> Option<(String, usize, usize)> {
    if !lang.is_js_family() || node.kind() != "variable_declarator" {
        return None;
    }
    let name_node = node.child_by_field_name("name")?;
    let value_node = node.child_by_field_name("value")?;
    if !matches!(value_node.kind(), "arrow_function" | "function" | "function_expression") {
        return None;
    }
    let name = name_node.utf8_text(src).ok()?.to_string();
    Some((name, node.start_byte(), node.end_byte()))
}

/// Node kinds whose own export wrapper (if any) should expand the symbol's
/// range upward (spec §4.C3: "expands the range upward to include the
/// export wrapper node when present").
fn export_wrapper<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    let parent = node.parent()?;
    match parent.kind() {
        "export_statement" | "export_default_declaration" => Some(parent),
        _ => None,
    }
}

struct Builder<'a> {
    src: &'a [u8],
    lang: Language,
    tree: SymbolTree,
    seen: HashSet<(&'static str, String, usize, usize)>,
}

impl<'a> Builder<'a> {
    fn push_node(&mut self, kind: SymbolKind, name: String, start_byte: usize, end_byte: usize, node_type: &str, parent: Option<usize>) -> Option<usize> {
        let start_line = byte_to_line(self.src, start_byte);
        let end_line = byte_to_line(self.src, end_byte.saturating_sub(1).max(start_byte));
        let key = (kind.as_str(), name.clone(), start_line, end_line);
        if !self.seen.insert(key) {
            return None;
        }
        let content = String::from_utf8_lossy(&self.src[start_byte..end_byte.min(self.src.len())]).to_string();
        let idx = self.tree.nodes.len();
        self.tree.nodes.push(SymbolNode {
            name,
            kind,
            start_line,
            end_line,
            start_byte,
            end_byte,
            node_type: node_type.to_string(),
            content,
            exported: false,
            children: Vec::new(),
            parent,
        });
        match parent {
            Some(p) => self.tree.nodes[p].children.push(idx),
            None => self.tree.roots.push(idx),
        }
        Some(idx)
    }

    fn walk(&mut self, node: Node<'a>, parent: Option<usize>, in_type_body: bool) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let kind = child.kind();

            if let Some((name, mut start_b, end_b)) = js_variable_declarator_symbol(self.lang, &child, self.src) {
                let mut exported = false;
                if let Some(wrapper) = export_wrapper(&child.parent().unwrap_or(child)) {
                    start_b = wrapper.start_byte();
                    exported = true;
                }
                if let Some(idx) = self.push_node(SymbolKind::Function, name, start_b, end_b, kind, parent) {
                    self.tree.nodes[idx].exported = exported;
                }
                // Variable declarators have no further nested symbols of interest.
                continue;
            }

            if let Some(symbol_kind) = classify(self.lang, kind, in_type_body) {
                if let Some((name_node_name, start_b, end_b, mut range_start)) = name_and_range(&child, self.src) {
                    let mut exported = false;
                    if let Some(wrapper) = export_wrapper(&child) {
                        range_start = wrapper.start_byte();
                        exported = true;
                    }
                    let opens_body = opens_type_body(self.lang, kind);
                    if let Some(idx) = self.push_node(symbol_kind, name_node_name, range_start, end_b, kind, parent) {
                        self.tree.nodes[idx].exported = exported;
                        self.walk(child, Some(idx), in_type_body || opens_body);
                    } else {
                        self.walk(child, parent, in_type_body || opens_body);
                    }
                    let _ = start_b;
                    continue;
                }
            }

            let opens_body = opens_type_body(self.lang, kind);
            self.walk(child, parent, in_type_body || opens_body);
        }
    }
}

/// Extracts `(name, start_byte, end_byte, own_start_byte)` for a declaration
/// node, or `None` if it has no identifiable name (e.g. an anonymous impl).
fn name_and_range(node: &Node, src: &[u8]) -> Option<(String, usize, usize, usize)> {
    let name_node = node
        .child_by_field_name("name")
        .or_else(|| node.child_by_field_name("type"))?;
    let name = name_node.utf8_text(src).ok()?.to_string();
    Some((name, node.start_byte(), node.end_byte(), node.start_byte()))
}

fn byte_to_line(src: &[u8], byte: usize) -> usize {
    let byte = byte.min(src.len());
    1 + src[..byte].iter().filter(|&&b| b == b'\n').count()
}

/// Extracts the symbol containment tree for `content` (spec §4.C3).
///
/// Fails closed to `None` when: content exceeds 1 MiB, the language is
/// unsupported, the loader/parser throws, or the parse tree reports an
/// error at the root.
pub fn extract_symbols(content: &str, lang: Language) -> Option<SymbolTree> {
    if content.len() > MAX_PARSE_CONTENT_BYTES {
        return None;
    }

    with_parser(lang, 30, |parser| {
        let tree = parser.parse(content, None)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }

        let mut builder = Builder {
            src: content.as_bytes(),
            lang,
            tree: SymbolTree::default(),
            seen: HashSet::new(),
        };
        builder.walk(root, None, false);
        Some(builder.tree)
    })
}

/// Node kinds that must never be scanned for identifier occurrences:
/// comments, string/template literals, regex, and JSX text (spec §4.C3).
fn is_excluded_ancestor(kind: &str) -> bool {
    matches!(
        kind,
        "comment"
            | "line_comment"
            | "block_comment"
            | "string_literal"
            | "string"
            | "raw_string_literal"
            | "template_string"
            | "template_literal"
            | "regex"
            | "jsx_text"
    )
}

/// Finds occurrences of `symbol` that are plain identifier nodes, excluding
/// any that sit inside a comment/string/regex/JSX-text ancestor (spec
/// §4.C3). Returns `None` when the language can't be parsed (unsupported or
/// fails closed), signalling the caller to fall back to regex matching.
pub fn find_identifier_occurrences(content: &str, lang: Language, symbol: &str) -> Option<Vec<(usize, usize)>> {
    if content.len() > MAX_PARSE_CONTENT_BYTES {
        return None;
    }

    with_parser(lang, 30, |parser| {
        let tree = parser.parse(content, None)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }

        let mut occurrences = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let kind = node.kind();
            if is_excluded_ancestor(kind) {
                continue;
            }
            if matches!(kind, "identifier" | "type_identifier" | "property_identifier" | "field_identifier") {
                if let Ok(text) = node.utf8_text(content.as_bytes()) {
                    if text == symbol {
                        occurrences.push((node.start_byte(), node.end_byte()));
                    }
                }
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
        occurrences.sort_by_key(|(s, _)| *s);
        Some(occurrences)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversize_content_fails_closed() {
        let huge = "a".repeat(MAX_PARSE_CONTENT_BYTES + 1);
        assert!(extract_symbols(&huge, Language::Rust).is_none());
    }

    #[test]
    fn extracts_rust_struct_and_method() {
        let src = r#"
pub struct Foo {
    x: i32,
}

impl Foo {
    pub fn bar(&self) -> i32 {
        self.x
    }
}
"#;
        let tree = extract_symbols(src, Language::Rust).expect("parses");
        let names: Vec<_> = tree.nodes.iter().map(|n| (n.name.as_str(), n.kind.as_str())).collect();
        assert!(names.contains(&("Foo", "struct")));
        assert!(names.contains(&("bar", "method")));
    }

    #[test]
    fn extracts_exported_ts_class_with_expanded_range() {
        let src = "export class AuthService {\n  login() {}\n}\n";
        let tree = extract_symbols(src, Language::TypeScript).expect("parses");
        let class = tree.nodes.iter().find(|n| n.name == "AuthService").unwrap();
        assert!(class.exported);
        assert_eq!(class.start_line, 1);
    }

    #[test]
    fn extracts_js_arrow_function_variable() {
        let src = "export const helper = () => {\n  return 1;\n};\n";
        let tree = extract_symbols(src, Language::TypeScript).expect("parses");
        assert!(tree.nodes.iter().any(|n| n.name == "helper"));
    }

    #[test]
    fn identifier_occurrences_skip_strings_and_comments() {
        let src = "let AuthService = 1; // AuthService\nlet s = \"AuthService\";\nAuthService;\n";
        let occ = find_identifier_occurrences(src, Language::JavaScript, "AuthService").unwrap();
        // Only the declaration and the trailing bare reference should count.
        assert_eq!(occ.len(), 2);
    }
}
