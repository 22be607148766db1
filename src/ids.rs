//! Stable identifiers shared across the indexing pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

/// Stable identifier for a [`crate::model::CodeChunk`].
///
/// Backed by a UUID (spec §3: "stable id (UUID)") rather than a counter,
/// since chunks are regenerated wholesale on every index build and callers
/// (preflight, memory hints) may reference a chunk id across rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub Uuid);

impl ChunkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interned, process-wide identifier for a project-relative file path.
///
/// Keeping a `u32` id (instead of cloning `PathBuf` everywhere) matches the
/// teacher's `FileId`/`SymbolId` newtype style and keeps graph edges cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

static NEXT_FILE_ID: AtomicU32 = AtomicU32::new(1);

impl FileId {
    pub fn next() -> Self {
        Self(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Normalizes a path to a project-relative, forward-slash string.
///
/// Invariant (spec §3, InternalFileGraph): "paths use forward slashes".
pub fn normalize_rel_path(root: &Path, abs: &Path) -> String {
    let rel = abs.strip_prefix(root).unwrap_or(abs);
    let mut s = rel.to_string_lossy().replace('\\', "/");
    if let Some(stripped) = s.strip_prefix("./") {
        s = stripped.to_string();
    }
    s
}

/// Bidirectional path interner: `FileId <-> project-relative path`.
#[derive(Debug, Default)]
pub struct PathInterner {
    by_id: Vec<String>,
    by_path: std::collections::HashMap<String, FileId>,
}

impl PathInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, rel_path: &str) -> FileId {
        if let Some(id) = self.by_path.get(rel_path) {
            return *id;
        }
        let id = FileId::next();
        self.by_id.push(rel_path.to_string());
        self.by_path.insert(rel_path.to_string(), id);
        id
    }

    pub fn path_of(&self, id: FileId) -> Option<&str> {
        // ids are 1-based and monotonic; fall back to a linear scan if the
        // counter was reset between interner instances (tests).
        self.by_path
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
            .or_else(|| self.by_id.get(id.0 as usize))
            .map(|s| s.as_str())
    }

    pub fn id_of(&self, rel_path: &str) -> Option<FileId> {
        self.by_path.get(rel_path).copied()
    }
}

/// Absolute root directory of the indexed project.
pub type ProjectRoot = PathBuf;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_windows_separators() {
        let root = Path::new("/repo");
        let abs = Path::new("/repo/src/lib.rs");
        assert_eq!(normalize_rel_path(root, abs), "src/lib.rs");
    }

    #[test]
    fn interner_roundtrips() {
        let mut interner = PathInterner::new();
        let id = interner.intern("src/main.rs");
        assert_eq!(interner.id_of("src/main.rs"), Some(id));
        assert_eq!(interner.path_of(id), Some("src/main.rs"));
    }
}
