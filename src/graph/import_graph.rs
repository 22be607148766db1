//! External import graph: package/module source -> usage sites (spec §4.C7).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportUsage {
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Default)]
pub struct ImportGraph {
    usages: HashMap<String, Vec<ImportUsage>>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a usage of an external (non-relative) import source,
    /// ignoring relative imports and standard-library modules.
    pub fn track(&mut self, source: &str, file: &str, line: usize) {
        if source.starts_with('.') || source.starts_with('/') {
            return;
        }
        if super::STDLIB_IGNORED.contains(&source) {
            return;
        }
        self.usages.entry(source.to_string()).or_default().push(ImportUsage {
            file: file.to_string(),
            line,
        });
    }

    pub fn get_usages(&self, source: &str) -> &[ImportUsage] {
        self.usages.get(source).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn top_used(&self, n: usize) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self.usages.iter().map(|(k, v)| (k.clone(), v.len())).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts.truncate(n);
        counts
    }

    pub fn sources(&self) -> impl Iterator<Item = &String> {
        self.usages.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_relative_and_stdlib_imports() {
        let mut g = ImportGraph::new();
        g.track("./local", "a.ts", 1);
        g.track("std", "a.rs", 2);
        g.track("react", "a.tsx", 3);
        assert!(g.get_usages("./local").is_empty());
        assert!(g.get_usages("std").is_empty());
        assert_eq!(g.get_usages("react").len(), 1);
    }

    #[test]
    fn top_used_is_sorted_descending() {
        let mut g = ImportGraph::new();
        g.track("react", "a.tsx", 1);
        g.track("react", "b.tsx", 1);
        g.track("lodash", "a.tsx", 1);
        let top = g.top_used(2);
        assert_eq!(top[0].0, "react");
        assert_eq!(top[0].1, 2);
    }
}
