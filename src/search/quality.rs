//! Search quality assessment (spec §4.C9 step 8).

use crate::ids::ChunkId;
use crate::model::CodeChunk;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    LowConfidence,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchQuality {
    pub status: Status,
    pub confidence: f32,
    pub signals: Vec<String>,
    #[serde(rename = "nextSteps", skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<Vec<String>>,
}

fn path_is_test_like(path: &str) -> bool {
    path.contains(".spec.") || path.contains(".test.") || path.contains("/e2e/") || path.contains("/__tests__/")
}

pub fn assess(ranked: &[(ChunkId, f32)], by_id: &HashMap<ChunkId, &CodeChunk>, testing_related: bool) -> SearchQuality {
    let top_score = ranked.first().map(|(_, s)| *s).unwrap_or(0.0);
    let top_k: Vec<f32> = ranked.iter().take(5).map(|(_, s)| *s).collect();

    let mut signals = Vec::new();

    if top_score < 0.30 {
        signals.push("low top score".to_string());
    }

    let top_k_avg = if top_k.is_empty() { 0.0 } else { top_k.iter().sum::<f32>() / top_k.len() as f32 };
    if top_k_avg < 0.32 {
        signals.push("weak top-k average".to_string());
    }

    let top_k_spread = match (top_k.first(), top_k.last()) {
        (Some(first), Some(last)) if top_k.len() > 1 => first - last,
        _ => 0.0,
    };
    if top_k_spread < 0.03 {
        signals.push("tight top spread".to_string());
    }

    if !testing_related && !ranked.is_empty() {
        let test_count = ranked.iter().take(3).filter(|(id, _)| by_id.get(id).map(|c| path_is_test_like(&c.rel_path)).unwrap_or(false)).count();
        let denom = ranked.len().min(3);
        if denom > 0 && test_count * 3 >= denom * 2 {
            signals.push("test artifacts dominate top-k".to_string());
        }
    }

    let mut confidence = top_score;
    for _ in &signals {
        confidence -= 0.1;
    }
    let confidence = confidence.clamp(0.0, 1.0);

    let status = if signals.len() >= 2 || confidence < 0.35 { Status::LowConfidence } else { Status::Ok };

    let next_steps = if status == Status::LowConfidence {
        Some(vec![
            "narrow the query with a more specific identifier or file hint".to_string(),
            "try enabling low-confidence rescue or widening candidateFloor".to_string(),
        ])
    } else {
        None
    };

    SearchQuality { status, confidence, signals, next_steps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChunkStrategy;

    fn chunk(rel_path: &str) -> CodeChunk {
        CodeChunk {
            id: ChunkId::new(),
            abs_path: format!("/a/{rel_path}"),
            rel_path: rel_path.to_string(),
            start_line: 1,
            end_line: 1,
            language: "typescript".into(),
            framework: None,
            component_type: None,
            content: String::new(),
            tags: Vec::new(),
            dependencies: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            metadata: Default::default(),
            symbol_aware: false,
            symbol_name: None,
            symbol_kind: None,
            symbol_path: Vec::new(),
            parent_symbol: None,
            chunk_strategy: ChunkStrategy::LineOrComponent,
        }
    }

    #[test]
    fn strong_single_hit_is_ok() {
        let c = chunk("src/auth.ts");
        let id = c.id;
        let by_id: HashMap<ChunkId, &CodeChunk> = [(id, &c)].into_iter().collect();
        let quality = assess(&[(id, 0.9)], &by_id, false);
        assert_eq!(quality.status, Status::Ok);
        assert!(quality.next_steps.is_none());
    }

    #[test]
    fn weak_scattered_results_are_low_confidence() {
        let c = chunk("src/a.ts");
        let id = c.id;
        let by_id: HashMap<ChunkId, &CodeChunk> = [(id, &c)].into_iter().collect();
        let quality = assess(&[(id, 0.1)], &by_id, false);
        assert_eq!(quality.status, Status::LowConfidence);
        assert!(quality.next_steps.is_some());
    }

    #[test]
    fn test_dominated_top_k_flags_signal_for_non_testing_query() {
        let a = chunk("src/a.spec.ts");
        let b = chunk("src/b.test.ts");
        let c = chunk("src/c.ts");
        let (id_a, id_b, id_c) = (a.id, b.id, c.id);
        let by_id: HashMap<ChunkId, &CodeChunk> = [(id_a, &a), (id_b, &b), (id_c, &c)].into_iter().collect();
        let quality = assess(&[(id_a, 0.5), (id_b, 0.45), (id_c, 0.4)], &by_id, false);
        assert!(quality.signals.contains(&"test artifacts dominate top-k".to_string()));
    }
}
