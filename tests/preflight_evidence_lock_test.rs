//! Preflight evidence lock end-to-end (spec §8 scenario 6): a low-confidence
//! search blocks `readyToEdit`, while fresh-indexed, well-corroborated
//! results clear it and carry hop-1/hop-2 impact from the real file graph.

use chrono::Utc;
use codectx::graph::InternalFileGraph;
use codectx::intelligence::{self, ConvergingSignals};
use codectx::patterns::{Consensus, PatternEntry};
use codectx::search::{SearchQuality, Status};
use codectx::storage::IntelligenceArtifact;
use std::collections::HashMap;

fn artifact(patterns: HashMap<String, Consensus>) -> IntelligenceArtifact {
    IntelligenceArtifact {
        generated_at: Utc::now(),
        patterns,
        golden_files: Vec::new(),
        top_libraries: Vec::new(),
    }
}

fn entry(name: &str, trend: &str) -> PatternEntry {
    PatternEntry {
        name: name.to_string(),
        count: 10,
        frequency_pct: 80,
        trend: Some(trend.to_string()),
        guidance: String::new(),
        canonical_example: None,
    }
}

#[test]
fn low_confidence_search_blocks_ready_to_edit_end_to_end() {
    let mut patterns = HashMap::new();
    patterns.insert(
        "asyncStyle".to_string(),
        Consensus {
            primary: entry("async/await", "Rising"),
            also_detected: Vec::new(),
        },
    );
    let intelligence_artifact = artifact(patterns);
    let graph = InternalFileGraph::new();

    let search_quality = SearchQuality {
        status: Status::LowConfidence,
        confidence: 0.2,
        signals: vec!["low top score".to_string()],
        next_steps: Some(vec!["narrow the query".to_string()]),
    };
    let signals = ConvergingSignals {
        preferred_pattern_match: true,
        golden_file_match: true,
        related_memory: false,
        top_k_agreement: false,
    };

    let card = intelligence::build_preflight(&intelligence_artifact, &graph, &["src/auth.ts".to_string()], &search_quality, signals, 0, false, Utc::now());

    assert!(!card.evidence_lock.ready_to_edit);
    assert_eq!(card.evidence_lock.epistemic_stress.as_deref(), Some("abstain"));
    // Abstaining on an otherwise-low-risk edit upgrades risk to at least Medium.
    assert_ne!(card.risk, codectx::intelligence::RiskLevel::Low);
    assert_eq!(card.prefer, vec!["async/await".to_string()]);
}

#[test]
fn fresh_ok_search_with_converging_signals_clears_the_lock_and_reports_impact() {
    let mut patterns = HashMap::new();
    patterns.insert(
        "errorHandling".to_string(),
        Consensus {
            primary: entry("callbacks", "Declining"),
            also_detected: Vec::new(),
        },
    );
    let intelligence_artifact = artifact(patterns);

    let mut graph = InternalFileGraph::new();
    graph.track_import("service.ts", "repo.ts", &[]);
    graph.track_import("controller.ts", "service.ts", &[]);

    let search_quality = SearchQuality {
        status: Status::Ok,
        confidence: 0.9,
        signals: Vec::new(),
        next_steps: None,
    };
    let signals = ConvergingSignals {
        preferred_pattern_match: true,
        golden_file_match: true,
        related_memory: false,
        top_k_agreement: true,
    };

    let card = intelligence::build_preflight(&intelligence_artifact, &graph, &["repo.ts".to_string()], &search_quality, signals, 0, false, Utc::now());

    assert!(card.evidence_lock.ready_to_edit);
    assert_eq!(card.impact.hop1, vec!["service.ts".to_string()]);
    assert_eq!(card.impact.hop2, vec!["controller.ts".to_string()]);
    assert_eq!(card.avoid, vec!["callbacks".to_string()]);
    assert_eq!(card.index_confidence, codectx::intelligence::IndexConfidence::Fresh);
}
