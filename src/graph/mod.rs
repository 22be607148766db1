//! Import/File Graph (spec §4.C7).

mod file_graph;
mod import_graph;

pub use file_graph::{CycleSeverity, ExportRecord, InternalFileGraph, UnusedExport};
pub use import_graph::{ImportGraph, ImportUsage};

/// A small set of standard-library-ish module names the external import
/// graph ignores (spec §4.C7: "ignoring relative imports and a small set of
/// standard-library modules").
pub const STDLIB_IGNORED: &[&str] = &[
    "std", "core", "alloc", "fs", "path", "os", "sys", "node:fs", "node:path", "node:os", "util",
];
