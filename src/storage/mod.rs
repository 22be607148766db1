//! Storage & Artifact Manager (spec §4.C1).

mod artifacts;
mod manifest;

pub use artifacts::{GraphEdge, IndexArtifact, IntelligenceArtifact, LibraryUsage, RelationshipsArtifact};
pub use manifest::{ArtifactFingerprint, Manifest};

use crate::config::{CONTEXT_DIR_NAME, LEGACY_PATHS};
use crate::error::{CoreError, StorageError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

pub const ARTIFACT_INDEX: &str = "index.json";
pub const ARTIFACT_INTELLIGENCE: &str = "intelligence.json";
pub const ARTIFACT_RELATIONSHIPS: &str = "relationships.json";
pub const ARTIFACT_MEMORY: &str = "memory.json";
pub const VECTOR_DIR: &str = "index";

pub fn context_dir(root: &Path) -> PathBuf {
    root.join(CONTEXT_DIR_NAME)
}

pub fn artifact_path(root: &Path, name: &str) -> PathBuf {
    context_dir(root).join(name)
}

/// Index validity status returned to every tool (spec §6 "index signal").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexStatus {
    Ready,
    RebuildRequired,
    Indexing,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Confidence {
    #[serde(rename = "high")]
    High,
    #[serde(rename = "low")]
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Served,
    RebuildStarted,
    RebuiltAndServed,
    RebuildFailed,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexSignal {
    pub status: IndexStatus,
    pub confidence: Confidence,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One-shot, best-effort migration of pre-versioned artifact paths into the
/// context directory (spec §4.C1 `migrateLegacy`). Never fatal.
pub fn migrate_legacy(root: &Path) {
    let ctx = context_dir(root);
    for legacy in LEGACY_PATHS {
        let legacy_path = root.join(legacy);
        if !legacy_path.exists() {
            continue;
        }
        if std::fs::create_dir_all(&ctx).is_err() {
            continue;
        }
        let dest = ctx.join(legacy_path.file_name().unwrap_or_default());
        let _ = std::fs::rename(&legacy_path, &dest);
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// `readManifest` (spec §4.C1).
pub fn read_manifest(root: &Path) -> Result<Manifest, StorageError> {
    let path = artifact_path(root, "manifest.json");
    if !path.exists() {
        return Err(StorageError::ManifestMissing { path });
    }
    let bytes = std::fs::read(&path).map_err(|e| StorageError::Read {
        name: "manifest.json".into(),
        source: e,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| StorageError::ManifestMalformed { reason: e.to_string() })
}

/// `validateArtifacts` (spec §4.C1): checks presence and fingerprint of
/// every artifact the manifest declares required.
pub fn validate_artifacts(root: &Path, manifest: &Manifest) -> Result<(), StorageError> {
    if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(StorageError::VersionMismatch {
            found: manifest.schema_version,
            expected: MANIFEST_SCHEMA_VERSION,
        });
    }
    for (name, fingerprint) in &manifest.artifacts {
        let path = artifact_path(root, name);
        let bytes = std::fs::read(&path).map_err(|_| StorageError::ArtifactMissing { name: name.clone() })?;
        if bytes.len() as u64 != fingerprint.size {
            return Err(StorageError::FingerprintMismatch { name: name.clone() });
        }
        if sha256_hex(&bytes) != fingerprint.sha256 {
            return Err(StorageError::FingerprintMismatch { name: name.clone() });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationReport {
    pub status: IndexStatus,
    pub confidence: Confidence,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `requireValidIndex` (spec §4.C1): confidence is `high` when the
/// intelligence artifact is present, `low` otherwise.
pub fn require_valid_index(root: &Path) -> ValidationReport {
    match read_manifest(root).and_then(|m| validate_artifacts(root, &m).map(|_| m)) {
        Ok(manifest) => {
            let confidence = if manifest.artifacts.contains_key(ARTIFACT_INTELLIGENCE) {
                Confidence::High
            } else {
                Confidence::Low
            };
            ValidationReport {
                status: IndexStatus::Ready,
                confidence,
                action: Action::Served,
                reason: None,
            }
        }
        Err(e) => ValidationReport {
            status: IndexStatus::RebuildRequired,
            confidence: Confidence::Low,
            action: Action::RebuildFailed,
            reason: Some(e.to_string()),
        },
    }
}

/// `ensureValidOrAutoHeal` (spec §4.C1): every tool that reads artifacts
/// must call this first. On failure, invokes `rebuild` once; on success,
/// re-validates.
pub fn ensure_valid_or_auto_heal<F>(root: &Path, rebuild: F) -> Result<IndexSignal, CoreError>
where
    F: FnOnce() -> Result<(), CoreError>,
{
    let report = require_valid_index(root);
    if report.status == IndexStatus::Ready {
        return Ok(IndexSignal {
            status: IndexStatus::Ready,
            confidence: report.confidence,
            action: Action::Served,
            reason: None,
        });
    }

    tracing::warn!(target: "storage", reason = ?report.reason, "index invalid, attempting auto-heal");
    match rebuild() {
        Ok(()) => {
            let post = require_valid_index(root);
            if post.status == IndexStatus::Ready {
                Ok(IndexSignal {
                    status: IndexStatus::Ready,
                    confidence: post.confidence,
                    action: Action::RebuiltAndServed,
                    reason: None,
                })
            } else {
                Ok(IndexSignal {
                    status: IndexStatus::RebuildRequired,
                    confidence: Confidence::Low,
                    action: Action::RebuildFailed,
                    reason: post.reason,
                })
            }
        }
        Err(e) => Ok(IndexSignal {
            status: IndexStatus::RebuildRequired,
            confidence: Confidence::Low,
            action: Action::RebuildFailed,
            reason: Some(e.to_string()),
        }),
    }
}

/// Writes `bytes` atomically: temp file in the same directory, then rename
/// (spec §4.C1/§4.C8 "manifest written last"; grounded on teacher's
/// `storage/persistence.rs` write-then-rename).
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("artifact").to_string();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::Write { name: name.clone(), source: e })?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).map_err(|e| StorageError::Write { name: name.clone(), source: e })?;
    std::fs::rename(&tmp, path).map_err(|e| StorageError::Write { name, source: e })?;
    Ok(())
}

/// Serializes `value` to JSON and writes it atomically, returning the
/// fingerprint to record in the manifest.
pub fn write_artifact<T: serde::Serialize>(root: &Path, name: &str, value: &T) -> Result<ArtifactFingerprint, StorageError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde { name: name.to_string(), source: e })?;
    write_atomic(&artifact_path(root, name), &bytes)?;
    Ok(ArtifactFingerprint {
        size: bytes.len() as u64,
        sha256: sha256_hex(&bytes),
    })
}

pub fn read_artifact<T: for<'de> serde::Deserialize<'de>>(root: &Path, name: &str) -> Result<T, StorageError> {
    let path = artifact_path(root, name);
    let bytes = std::fs::read(&path).map_err(|e| StorageError::Read { name: name.to_string(), source: e })?;
    serde_json::from_slice(&bytes).map_err(|e| StorageError::Serde { name: name.to_string(), source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_manifest_is_rebuild_required() {
        let dir = TempDir::new().unwrap();
        let report = require_valid_index(dir.path());
        assert_eq!(report.status, IndexStatus::RebuildRequired);
    }

    #[test]
    fn auto_heal_rebuilds_once_on_corruption() {
        let dir = TempDir::new().unwrap();
        let rebuilt = std::cell::Cell::new(false);
        let signal = ensure_valid_or_auto_heal(dir.path(), || {
            rebuilt.set(true);
            // A real rebuild would write artifacts; simulate still-missing
            // manifest so the post-check reports rebuild-failed.
            Ok(())
        })
        .unwrap();
        assert!(rebuilt.get());
        assert_eq!(signal.action, Action::RebuildFailed);
    }

    #[test]
    fn write_then_read_artifact_roundtrips() {
        let dir = TempDir::new().unwrap();
        let fp = write_artifact(dir.path(), "memory.json", &vec![1, 2, 3]).unwrap();
        let back: Vec<i32> = read_artifact(dir.path(), "memory.json").unwrap();
        assert_eq!(back, vec![1, 2, 3]);
        assert_eq!(fp.size, std::fs::metadata(artifact_path(dir.path(), "memory.json")).unwrap().len());
    }
}
