//! Versioned artifact manifest (spec §3, §4.C1, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFingerprint {
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    pub artifacts: HashMap<String, ArtifactFingerprint>,
    /// Fingerprint of the scanner/chunker/indexing configuration used to
    /// build this index, so a config change can force a rebuild.
    #[serde(rename = "configFingerprint")]
    pub config_fingerprint: String,
    #[serde(rename = "buildId")]
    pub build_id: String,
}

impl Manifest {
    pub fn new(artifacts: HashMap<String, ArtifactFingerprint>, config_fingerprint: String, generated_at: DateTime<Utc>, build_id: String) -> Self {
        Self {
            schema_version: super::MANIFEST_SCHEMA_VERSION,
            generated_at,
            artifacts,
            config_fingerprint,
            build_id,
        }
    }
}
