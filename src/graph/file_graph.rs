//! Internal, directed multi-graph over project-relative file paths (spec §4.C7).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedExport {
    pub file: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleSeverity {
    High,
    Medium,
    Low,
}

impl CycleSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleSeverity::High => "high",
            CycleSeverity::Medium => "medium",
            CycleSeverity::Low => "low",
        }
    }

    /// Severity = {2: high, 3: medium, else: low} (spec §6).
    pub fn from_length(edge_count: usize) -> Self {
        match edge_count {
            2 => CycleSeverity::High,
            3 => CycleSeverity::Medium,
            _ => CycleSeverity::Low,
        }
    }
}

#[derive(Debug, Default)]
pub struct InternalFileGraph {
    imports: HashMap<String, HashSet<String>>,
    /// Reverse map: file -> symbol names imported from it by anyone.
    imported_symbols: HashMap<String, HashSet<String>>,
    exports: HashMap<String, Vec<ExportRecord>>,
}

fn is_test_file(path: &str) -> bool {
    path.contains(".test.") || path.contains(".spec.") || path.contains("/__tests__/") || path.contains("/tests/")
}

fn is_barrel_file(path: &str) -> bool {
    let stem = path.rsplit('/').next().unwrap_or(path);
    matches!(stem, "index.ts" | "index.js" | "index.tsx" | "mod.rs" | "lib.rs")
}

impl InternalFileGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file -> file import edge (spec §4.C7 `trackImport`). No
    /// self-loops are recorded (spec §3 invariant).
    pub fn track_import(&mut self, from: &str, to: &str, symbols: &[String]) {
        if from == to {
            return;
        }
        self.imports.entry(from.to_string()).or_default().insert(to.to_string());
        let entry = self.imported_symbols.entry(to.to_string()).or_default();
        for s in symbols {
            entry.insert(s.clone());
        }
    }

    pub fn track_exports(&mut self, file: &str, exports: Vec<ExportRecord>) {
        self.exports.insert(file.to_string(), exports);
    }

    fn all_nodes(&self) -> HashSet<String> {
        let mut nodes = HashSet::new();
        for (from, tos) in &self.imports {
            nodes.insert(from.clone());
            for to in tos {
                nodes.insert(to.clone());
            }
        }
        nodes
    }

    /// `findCycles` (spec §4.C7): iterative DFS with a recursion stack; on
    /// re-entering a stacked node, extract and canonicalize the cycle,
    /// dedupe by signature, return sorted by length ascending. Each returned
    /// cycle is closed (`first == last`).
    pub fn find_cycles(&self, scope: Option<&str>) -> Vec<Vec<String>> {
        let mut seen_signatures: HashSet<Vec<String>> = HashSet::new();
        let mut cycles: Vec<Vec<String>> = Vec::new();

        let mut nodes: Vec<String> = self.all_nodes().into_iter().collect();
        nodes.sort();

        for start in &nodes {
            if let Some(scope) = scope {
                if !start.starts_with(scope) {
                    continue;
                }
            }
            let mut stack: Vec<String> = Vec::new();
            let mut on_stack: HashMap<String, usize> = HashMap::new();
            self.dfs(start, &mut stack, &mut on_stack, scope, &mut seen_signatures, &mut cycles);
        }

        cycles.sort_by_key(|c| c.len());
        cycles
    }

    fn dfs(
        &self,
        node: &str,
        stack: &mut Vec<String>,
        on_stack: &mut HashMap<String, usize>,
        scope: Option<&str>,
        seen: &mut HashSet<Vec<String>>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        if let Some(&idx) = on_stack.get(node) {
            let mut cycle_nodes = stack[idx..].to_vec();
            let closed = canonicalize_cycle(&mut cycle_nodes);
            if seen.insert(closed.clone()) {
                cycles.push(closed);
            }
            return;
        }

        stack.push(node.to_string());
        on_stack.insert(node.to_string(), stack.len() - 1);

        if let Some(neighbors) = self.imports.get(node) {
            let mut sorted_neighbors: Vec<&String> = neighbors.iter().collect();
            sorted_neighbors.sort();
            for neighbor in sorted_neighbors {
                if let Some(scope) = scope {
                    if !neighbor.starts_with(scope) {
                        continue;
                    }
                }
                self.dfs(neighbor, stack, on_stack, scope, seen, cycles);
            }
        }

        stack.pop();
        on_stack.remove(node);
    }

    /// `findUnusedExports` (spec §4.C7): skips barrel/index and test files,
    /// excludes default exports.
    pub fn find_unused_exports(&self, scope: Option<&str>) -> Vec<UnusedExport> {
        let mut out = Vec::new();
        for (file, exports) in &self.exports {
            if let Some(scope) = scope {
                if !file.starts_with(scope) {
                    continue;
                }
            }
            if is_test_file(file) || is_barrel_file(file) {
                continue;
            }
            let imported = self.imported_symbols.get(file);
            for export in exports {
                if export.is_default {
                    continue;
                }
                let used = imported.map(|s| s.contains(&export.name)).unwrap_or(false);
                if !used {
                    out.push(UnusedExport {
                        file: file.clone(),
                        name: export.name.clone(),
                    });
                }
            }
        }
        out.sort_by(|a, b| a.file.cmp(&b.file).then(a.name.cmp(&b.name)));
        out
    }

    /// Reverse-of-graph lookup used by preflight impact analysis: files that
    /// directly import `file`.
    pub fn importers_of<'a>(&'a self, file: &str) -> Vec<&'a str> {
        self.imports
            .iter()
            .filter(|(_, tos)| tos.contains(file))
            .map(|(from, _)| from.as_str())
            .collect()
    }

    pub fn exports_of(&self, file: &str) -> &[ExportRecord] {
        self.exports.get(file).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

fn canonicalize_cycle(cycle: &mut Vec<String>) -> Vec<String> {
    let min_idx = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut rotated: Vec<String> = Vec::with_capacity(cycle.len() + 1);
    for i in 0..cycle.len() {
        rotated.push(cycle[(min_idx + i) % cycle.len()].clone());
    }
    rotated.push(rotated[0].clone());
    rotated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_exactly_one_cycle_of_length_three() {
        let mut g = InternalFileGraph::new();
        g.track_import("a.ts", "b.ts", &[]);
        g.track_import("b.ts", "c.ts", &[]);
        g.track_import("c.ts", "a.ts", &[]);

        let cycles = g.find_cycles(None);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].first(), cycles[0].last());
        assert_eq!(cycles[0].len(), 4); // 3 nodes + closing repeat

        let scoped = g.find_cycles(Some("src/features"));
        assert_eq!(scoped.len(), 0);
    }

    #[test]
    fn does_not_record_self_loops() {
        let mut g = InternalFileGraph::new();
        g.track_import("a.ts", "a.ts", &[]);
        assert!(g.find_cycles(None).is_empty());
    }

    #[test]
    fn unused_exports_skip_defaults_tests_and_barrels() {
        let mut g = InternalFileGraph::new();
        g.track_exports(
            "src/util.ts",
            vec![
                ExportRecord { name: "helper".into(), is_default: false },
                ExportRecord { name: "unused".into(), is_default: false },
                ExportRecord { name: "Default".into(), is_default: true },
            ],
        );
        g.track_exports("src/util.test.ts", vec![ExportRecord { name: "x".into(), is_default: false }]);
        g.track_exports("src/index.ts", vec![ExportRecord { name: "y".into(), is_default: false }]);
        g.track_import("src/app.ts", "src/util.ts", &["helper".to_string()]);

        let unused = g.find_unused_exports(None);
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].name, "unused");
    }
}
