//! Progress reporting for the indexer orchestrator (spec §4.C8).

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Scanning,
    Analyzing,
    Embedding,
    Storing,
    Error,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub percentage: u8,
    #[serde(rename = "filesProcessed")]
    pub files_processed: usize,
    #[serde(rename = "totalFiles")]
    pub total_files: usize,
    #[serde(rename = "currentFile", skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    pub errors: usize,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
}

/// Emits progress events only when the phase changes or the rounded
/// percentage crosses a multiple of 10 (spec §4.C8 "Progress emission is
/// rate-limited").
pub struct ProgressEmitter {
    started_at: DateTime<Utc>,
    last_phase: Option<Phase>,
    last_decile: Option<u8>,
}

impl ProgressEmitter {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            last_phase: None,
            last_decile: None,
        }
    }

    pub fn emit(
        &mut self,
        phase: Phase,
        files_processed: usize,
        total_files: usize,
        current_file: Option<String>,
        errors: usize,
        cb: &mut dyn FnMut(ProgressEvent),
    ) {
        let percentage = if total_files == 0 {
            100
        } else {
            ((files_processed as f64 / total_files as f64) * 100.0).min(100.0) as u8
        };
        let decile = percentage / 10;

        let phase_changed = self.last_phase != Some(phase);
        let decile_crossed = self.last_decile != Some(decile);
        if !phase_changed && !decile_crossed {
            return;
        }
        self.last_phase = Some(phase);
        self.last_decile = Some(decile);

        cb(ProgressEvent {
            phase,
            percentage,
            files_processed,
            total_files,
            current_file,
            errors,
            started_at: self.started_at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppresses_repeated_events_within_same_decile() {
        let mut emitter = ProgressEmitter::new(Utc::now());
        let mut events = Vec::new();
        let mut cb = |e: ProgressEvent| events.push(e);
        emitter.emit(Phase::Analyzing, 1, 100, None, 0, &mut cb);
        emitter.emit(Phase::Analyzing, 2, 100, None, 0, &mut cb);
        emitter.emit(Phase::Analyzing, 11, 100, None, 0, &mut cb);
        assert_eq!(events.len(), 2);
    }
}
