//! Intelligence & Preflight (spec §4.C10): composes a preflight card from
//! C6 pattern consensus, C7 file-graph impact, and the current search
//! result set.

use crate::graph::InternalFileGraph;
use crate::patterns::{Consensus, GoldenFileEntry};
use crate::search::{SearchQuality, Status as SearchStatus};
use crate::storage::IntelligenceArtifact;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Explore,
    Edit,
    Refactor,
    Migrate,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexConfidence {
    Fresh,
    Aging,
    Stale,
}

impl IndexConfidence {
    pub fn from_age(generated_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let age = now.signed_duration_since(generated_at);
        if age < chrono::Duration::hours(24) {
            IndexConfidence::Fresh
        } else if age < chrono::Duration::days(7) {
            IndexConfidence::Aging
        } else {
            IndexConfidence::Stale
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStatus {
    Ok,
    Warn,
    Block,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EvidenceLock {
    pub status: EvidenceStatus,
    #[serde(rename = "readyToEdit")]
    pub ready_to_edit: bool,
    #[serde(rename = "nextAction", skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(rename = "epistemicStress", skip_serializing_if = "Option::is_none")]
    pub epistemic_stress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triangulation: Option<u8>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ImpactCandidates {
    #[serde(rename = "hop1")]
    pub hop1: Vec<String>,
    #[serde(rename = "hop2")]
    pub hop2: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PreflightCard {
    pub avoid: Vec<String>,
    pub prefer: Vec<String>,
    pub impact: ImpactCandidates,
    pub risk: RiskLevel,
    #[serde(rename = "goldenFiles")]
    pub golden_files: Vec<GoldenFileEntry>,
    #[serde(rename = "indexConfidence")]
    pub index_confidence: IndexConfidence,
    #[serde(rename = "evidenceLock")]
    pub evidence_lock: EvidenceLock,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LitePreflight {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Minimum number of independent signals that must converge for the
/// evidence lock to clear (spec §4.C10: "fewer than a configured minimum
/// of independent signals converge").
const MIN_CONVERGING_SIGNALS: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct ConvergingSignals {
    pub preferred_pattern_match: bool,
    pub golden_file_match: bool,
    pub related_memory: bool,
    pub top_k_agreement: bool,
}

impl ConvergingSignals {
    fn count(&self) -> usize {
        [self.preferred_pattern_match, self.golden_file_match, self.related_memory, self.top_k_agreement]
            .iter()
            .filter(|&&s| s)
            .count()
    }
}

/// Builds avoid/prefer lists from C6 consensus trends across all tracked
/// categories: Rising/Stable primary patterns are preferred, Declining ones
/// are flagged to avoid (spec §4.C10).
fn avoid_prefer_from_consensus(consensus_by_category: &[(&String, &Consensus)]) -> (Vec<String>, Vec<String>) {
    let mut avoid = Vec::new();
    let mut prefer = Vec::new();
    for (_, consensus) in consensus_by_category {
        let trend = consensus.primary.trend.as_deref().map(|t| t.to_lowercase());
        match trend.as_deref() {
            Some("declining") => avoid.push(consensus.primary.name.clone()),
            Some("rising") | Some("stable") => prefer.push(consensus.primary.name.clone()),
            _ => {}
        }
    }
    avoid.sort();
    avoid.dedup();
    prefer.sort();
    prefer.dedup();
    (avoid, prefer)
}

/// Hop-1/hop-2 impact candidates: reverse-graph importers of the result
/// files, then importers of those (spec §4.C10 "impact candidates").
fn impact_candidates(graph: &InternalFileGraph, result_files: &[String]) -> ImpactCandidates {
    let seed: HashSet<String> = result_files.iter().cloned().collect();

    let mut hop1: HashSet<String> = HashSet::new();
    for file in result_files {
        for importer in graph.importers_of(file) {
            if !seed.contains(importer) {
                hop1.insert(importer.to_string());
            }
        }
    }

    let mut hop2: HashSet<String> = HashSet::new();
    for file in &hop1 {
        for importer in graph.importers_of(file) {
            if !seed.contains(importer) && !hop1.contains(importer) {
                hop2.insert(importer.to_string());
            }
        }
    }

    let mut hop1: Vec<String> = hop1.into_iter().collect();
    let mut hop2: Vec<String> = hop2.into_iter().collect();
    hop1.sort();
    hop2.sort();
    ImpactCandidates { hop1, hop2 }
}

fn risk_level(cycle_count: usize, impact: &ImpactCandidates, has_memory_failure_hint: bool) -> RiskLevel {
    let impact_breadth = impact.hop1.len() + impact.hop2.len();
    if has_memory_failure_hint || cycle_count >= 2 || impact_breadth > 20 {
        RiskLevel::High
    } else if cycle_count == 1 || impact_breadth > 5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn evidence_lock(search_quality: &SearchQuality, signals: ConvergingSignals) -> EvidenceLock {
    let low_confidence = search_quality.status == SearchStatus::LowConfidence;
    let converging = signals.count();
    let blocked = low_confidence || converging < MIN_CONVERGING_SIGNALS;

    if blocked {
        let next_action = if low_confidence {
            "broaden or refine the search query; current results are low-confidence".to_string()
        } else {
            "gather additional corroborating evidence (golden file match, preferred pattern, or related memory) before editing".to_string()
        };
        EvidenceLock {
            status: EvidenceStatus::Block,
            ready_to_edit: false,
            next_action: Some(next_action),
            epistemic_stress: Some("abstain".to_string()),
            triangulation: Some(converging as u8),
        }
    } else if converging < MIN_CONVERGING_SIGNALS + 1 {
        EvidenceLock {
            status: EvidenceStatus::Warn,
            ready_to_edit: true,
            next_action: None,
            epistemic_stress: None,
            triangulation: Some(converging as u8),
        }
    } else {
        EvidenceLock {
            status: EvidenceStatus::Ok,
            ready_to_edit: true,
            next_action: None,
            epistemic_stress: None,
            triangulation: Some(converging as u8),
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn build_preflight(
    intelligence: &IntelligenceArtifact,
    graph: &InternalFileGraph,
    result_files: &[String],
    search_quality: &SearchQuality,
    signals: ConvergingSignals,
    cycle_count: usize,
    has_memory_failure_hint: bool,
    now: DateTime<Utc>,
) -> PreflightCard {
    let consensus_by_category: Vec<(&String, &Consensus)> = intelligence.patterns.iter().collect();
    let (avoid, prefer) = avoid_prefer_from_consensus(&consensus_by_category);
    let impact = impact_candidates(graph, result_files);
    let risk = risk_level(cycle_count, &impact, has_memory_failure_hint);
    let mut golden_files = intelligence.golden_files.clone();
    golden_files.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    golden_files.truncate(3);
    let index_confidence = IndexConfidence::from_age(intelligence.generated_at, now);
    let evidence_lock = evidence_lock(search_quality, signals);

    let risk = if evidence_lock.epistemic_stress.as_deref() == Some("abstain") && risk == RiskLevel::Low {
        RiskLevel::Medium
    } else {
        risk
    };

    PreflightCard {
        avoid,
        prefer,
        impact,
        risk,
        golden_files,
        index_confidence,
        evidence_lock,
    }
}

pub fn build_lite_preflight(search_quality: &SearchQuality, signals: ConvergingSignals) -> LitePreflight {
    let lock = evidence_lock(search_quality, signals);
    LitePreflight {
        ready: lock.ready_to_edit,
        reason: lock.next_action,
    }
}

pub fn classify_intent_for_preflight(profile: Option<&str>) -> Intent {
    match profile {
        Some("edit") => Intent::Edit,
        Some("refactor") => Intent::Refactor,
        Some("migrate") => Intent::Migrate,
        Some("explore") => Intent::Explore,
        _ => Intent::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Status as SQStatus;
    use std::collections::HashMap;

    fn quality(status: SQStatus) -> SearchQuality {
        SearchQuality {
            status,
            confidence: if status == SQStatus::Ok { 0.8 } else { 0.2 },
            signals: Vec::new(),
            next_steps: None,
        }
    }

    #[test]
    fn low_confidence_search_quality_blocks_evidence_lock() {
        let signals = ConvergingSignals {
            preferred_pattern_match: true,
            golden_file_match: true,
            related_memory: true,
            top_k_agreement: true,
        };
        let lock = evidence_lock(&quality(SQStatus::LowConfidence), signals);
        assert_eq!(lock.status, EvidenceStatus::Block);
        assert!(!lock.ready_to_edit);
    }

    #[test]
    fn insufficient_converging_signals_blocks_even_with_ok_quality() {
        let signals = ConvergingSignals {
            preferred_pattern_match: true,
            golden_file_match: false,
            related_memory: false,
            top_k_agreement: false,
        };
        let lock = evidence_lock(&quality(SQStatus::Ok), signals);
        assert_eq!(lock.status, EvidenceStatus::Block);
    }

    #[test]
    fn two_converging_signals_with_ok_quality_clears_the_lock() {
        let signals = ConvergingSignals {
            preferred_pattern_match: true,
            golden_file_match: true,
            related_memory: false,
            top_k_agreement: false,
        };
        let lock = evidence_lock(&quality(SQStatus::Ok), signals);
        assert_ne!(lock.status, EvidenceStatus::Block);
        assert!(lock.ready_to_edit);
    }

    #[test]
    fn impact_candidates_separate_hop1_from_hop2() {
        let mut graph = InternalFileGraph::new();
        graph.track_import("a.ts", "b.ts", &[]);
        graph.track_import("c.ts", "a.ts", &[]);
        let impact = impact_candidates(&graph, &["b.ts".to_string()]);
        assert_eq!(impact.hop1, vec!["a.ts".to_string()]);
        assert_eq!(impact.hop2, vec!["c.ts".to_string()]);
    }

    #[test]
    fn index_confidence_buckets_by_age() {
        let now = DateTime::parse_from_rfc3339("2026-07-28T12:00:00Z").unwrap().with_timezone(&Utc);
        let fresh = now - chrono::Duration::hours(1);
        let aging = now - chrono::Duration::days(2);
        let stale = now - chrono::Duration::days(10);
        assert_eq!(IndexConfidence::from_age(fresh, now), IndexConfidence::Fresh);
        assert_eq!(IndexConfidence::from_age(aging, now), IndexConfidence::Aging);
        assert_eq!(IndexConfidence::from_age(stale, now), IndexConfidence::Stale);
    }

    #[test]
    fn avoid_prefer_split_by_trend() {
        let declining = Consensus {
            primary: crate::patterns::PatternEntry {
                name: "callbacks".into(),
                count: 3,
                frequency_pct: 10,
                trend: Some("declining".into()),
                guidance: String::new(),
                canonical_example: None,
            },
            also_detected: Vec::new(),
        };
        let rising = Consensus {
            primary: crate::patterns::PatternEntry {
                name: "async/await".into(),
                count: 30,
                frequency_pct: 90,
                trend: Some("rising".into()),
                guidance: String::new(),
                canonical_example: None,
            },
            also_detected: Vec::new(),
        };
        let map: HashMap<String, Consensus> = [("errorHandling".to_string(), declining), ("asyncStyle".to_string(), rising)].into_iter().collect();
        let refs: Vec<(&String, &Consensus)> = map.iter().collect();
        let (avoid, prefer) = avoid_prefer_from_consensus(&refs);
        assert_eq!(avoid, vec!["callbacks".to_string()]);
        assert_eq!(prefer, vec!["async/await".to_string()]);
    }
}
