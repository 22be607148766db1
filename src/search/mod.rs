//! Search Engine (spec §4.C9): hybrid semantic+lexical retrieval with
//! reciprocal rank fusion, query-aware reranking, dedupe, low-confidence
//! rescue, and quality assessment.

mod quality;

pub use quality::{SearchQuality, Status};

use crate::config::SearchConfig;
use crate::embedding::EmbeddingProvider;
use crate::ids::ChunkId;
use crate::lexical::LexicalIndex;
use crate::model::CodeChunk;
use crate::vector_store::VectorStore;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ExactName,
    Concept,
    Mixed,
}

/// `kw, sem` weight pair for a classified intent (spec §4.C9 step 1).
fn weights_for(intent: Intent) -> (f64, f64) {
    match intent {
        Intent::ExactName => (0.6, 0.4),
        Intent::Concept => (0.3, 0.7),
        Intent::Mixed => (0.4, 0.6),
    }
}

/// Classifies a query by shape: PascalCase/camelCase-looking tokens or
/// `::`/`.member` access imply a known identifier; a natural-language
/// question implies a concept search.
pub fn classify_intent(query: &str) -> Intent {
    let looks_like_identifier = query.contains("::")
        || query.contains('.')
        || query.split_whitespace().any(is_identifier_like);
    let looks_like_question = query.trim().ends_with('?')
        || query.split_whitespace().count() > 4 && query.split_whitespace().next().map(|w| matches!(w.to_lowercase().as_str(), "how" | "what" | "why" | "where" | "when")).unwrap_or(false);

    if looks_like_identifier && !looks_like_question {
        Intent::ExactName
    } else if looks_like_question {
        Intent::Concept
    } else {
        Intent::Mixed
    }
}

fn is_identifier_like(token: &str) -> bool {
    let has_upper_after_lower = token.chars().zip(token.chars().skip(1)).any(|(a, b)| a.is_lowercase() && b.is_uppercase());
    let alnum_only = !token.is_empty() && token.chars().all(|c| c.is_alphanumeric() || c == '_');
    has_upper_after_lower && alnum_only
}

#[derive(Debug, Clone)]
pub enum Profile {
    Explore,
    Edit,
    Refactor,
    Migrate,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub use_semantic: bool,
    pub use_keyword: bool,
    pub enable_query_expansion: bool,
    pub enable_low_confidence_rescue: bool,
    pub candidate_floor: usize,
    pub profile: Profile,
    pub semantic_weight: Option<f64>,
    pub keyword_weight: Option<f64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            use_semantic: true,
            use_keyword: true,
            enable_query_expansion: true,
            enable_low_confidence_rescue: true,
            candidate_floor: 30,
            profile: Profile::Explore,
            semantic_weight: None,
            keyword_weight: None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Relationships {
    #[serde(rename = "importedByCount", skip_serializing_if = "Option::is_none")]
    pub imported_by_count: Option<usize>,
    #[serde(rename = "hasTests", skip_serializing_if = "Option::is_none")]
    pub has_tests: Option<bool>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "endLine")]
    pub end_line: usize,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    pub score: f32,
    #[serde(rename = "componentType", skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
    #[serde(rename = "patternWarning", skip_serializing_if = "Option::is_none")]
    pub pattern_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Relationships>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    #[serde(rename = "searchQuality")]
    pub search_quality: SearchQuality,
}

const TESTING_KEYWORDS: &[&str] = &[
    "test", "tests", "testing", "unit", "integration", "spec", "jest", "vitest", "jasmine", "playwright", "cypress", "mock", "spy", "coverage", "e2e", "testbed",
];

fn query_is_testing_related(query: &str) -> bool {
    let lower = query.to_lowercase();
    TESTING_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn path_is_test_like(path: &str) -> bool {
    path.contains(".spec.") || path.contains(".test.") || path.contains("/e2e/") || path.contains("/__tests__/")
}

/// Generates at most one paraphrase variant; EXACT_NAME queries are never
/// expanded (spec §4.C9 step 2).
fn expand_query(query: &str, intent: Intent, enabled: bool) -> Vec<String> {
    let mut variants = vec![query.to_string()];
    if !enabled || intent == Intent::ExactName {
        return variants;
    }
    if intent == Intent::Concept || query.split_whitespace().count() > 2 {
        variants.push(format!("how to implement {query}"));
    }
    variants.truncate(2);
    variants
}

/// Reciprocal Rank Fusion across one or more ranked lists, each carrying a
/// channel weight (spec §4.C9 step 4). Scores are normalized by the *maximum
/// attainable* fused score -- `Σ(all channel weights) / k_rrf`, the score a
/// document would get by landing at rank 0 in every list -- so the ceiling
/// is 1.0 and a hit that only lands in a subset of channels scores strictly
/// below a hit that tops every channel at equal rank.
fn reciprocal_rank_fusion(lists: &[(f64, Vec<ChunkId>)], k_rrf: f64) -> HashMap<ChunkId, f32> {
    let mut raw: HashMap<ChunkId, f64> = HashMap::new();
    let total_weight: f64 = lists.iter().map(|(weight, _)| weight).sum();
    let max_score = (total_weight / k_rrf).max(f64::EPSILON);

    for (weight, ids) in lists {
        for (rank, id) in ids.iter().enumerate() {
            let contribution = weight / (k_rrf + rank as f64);
            *raw.entry(*id).or_insert(0.0) += contribution;
        }
    }

    raw.into_iter().map(|(id, score)| (id, (score / max_score) as f32)).collect()
}

#[allow(clippy::too_many_arguments)]
pub fn search(
    query: &str,
    limit: usize,
    options: &SearchOptions,
    config: &SearchConfig,
    chunks: &[CodeChunk],
    lexical: Option<&LexicalIndex>,
    vector_store: Option<&dyn VectorStore>,
    embedding: Option<&dyn EmbeddingProvider>,
) -> SearchResponse {
    let intent = classify_intent(query);
    let (default_kw, default_sem) = weights_for(intent);
    let kw_weight = options.keyword_weight.unwrap_or(default_kw);
    let sem_weight = options.semantic_weight.unwrap_or(default_sem);

    let variants = expand_query(query, intent, options.enable_query_expansion);
    let candidate_k = options.candidate_floor.max(limit * 6).max(config.candidate_floor);

    let by_id: HashMap<ChunkId, &CodeChunk> = chunks.iter().map(|c| (c.id, c)).collect();

    let mut lists: Vec<(f64, Vec<ChunkId>)> = Vec::new();
    for variant in &variants {
        if options.use_keyword {
            if let Some(index) = lexical {
                let ids: Vec<ChunkId> = index.search(variant, candidate_k).into_iter().map(|(id, _)| id).collect();
                lists.push((kw_weight, ids));
            }
        }
        if options.use_semantic {
            if let (Some(store), Some(provider)) = (vector_store, embedding) {
                if let Ok(vectors) = provider.embed_batch(std::slice::from_ref(variant)) {
                    if let Some(query_vec) = vectors.first() {
                        let ids: Vec<ChunkId> = store.search(query_vec, candidate_k).into_iter().map(|(id, _)| id).collect();
                        lists.push((sem_weight, ids));
                    }
                }
            }
        }
    }

    let mut scored = reciprocal_rank_fusion(&lists, config.rrf_k);

    let testing_related = query_is_testing_related(query);
    if !testing_related {
        for (id, score) in scored.iter_mut() {
            if let Some(chunk) = by_id.get(id) {
                if path_is_test_like(&chunk.rel_path) {
                    *score *= 0.5;
                }
            }
        }
    }

    // Dedupe by file path: keep the best-scoring chunk per file (step 6).
    let mut best_per_file: HashMap<String, (ChunkId, f32)> = HashMap::new();
    for (id, score) in &scored {
        let Some(chunk) = by_id.get(id) else { continue };
        best_per_file
            .entry(chunk.rel_path.clone())
            .and_modify(|(existing_id, existing_score)| {
                if *score > *existing_score {
                    *existing_id = *id;
                    *existing_score = *score;
                }
            })
            .or_insert((*id, *score));
    }

    let mut ranked: Vec<(ChunkId, f32)> = best_per_file.into_values().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    // Low-confidence rescue (step 7): re-run semantic with implementation-
    // oriented rewrites if the top score is weak or the top hit is a
    // mismatched test file, then splice in results that clear the margin.
    if options.enable_low_confidence_rescue {
        let top_is_weak = ranked.first().map(|(_, s)| *s < config.low_confidence_threshold).unwrap_or(true);
        let top_is_bad_test = !testing_related
            && ranked
                .first()
                .and_then(|(id, _)| by_id.get(id))
                .map(|c| path_is_test_like(&c.rel_path))
                .unwrap_or(false);

        if (top_is_weak || top_is_bad_test) && options.use_semantic {
            if let (Some(store), Some(provider)) = (vector_store, embedding) {
                let rewrite = format!("implementation of {query}");
                if let Ok(vectors) = provider.embed_batch(&[rewrite]) {
                    if let Some(query_vec) = vectors.first() {
                        let rescue_ids = store.search(query_vec, candidate_k);
                        let top_score = ranked.first().map(|(_, s)| *s).unwrap_or(0.0);
                        let rescue_max = (sem_weight / config.rrf_k).max(f64::EPSILON);
                        for (rank, (id, _raw)) in rescue_ids.iter().enumerate() {
                            let rescue_score = ((sem_weight / (config.rrf_k + rank as f64)) / rescue_max) as f32;
                            if rescue_score > top_score + config.rescue_margin {
                                if let Some(chunk) = by_id.get(id) {
                                    ranked.retain(|(existing, _)| existing != id);
                                    ranked.insert(0, (*id, rescue_score));
                                    let _ = chunk;
                                }
                            }
                        }
                        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
                    }
                }
            }
        }
    }

    ranked.truncate(limit);

    let quality = quality::assess(&ranked, &by_id, testing_related);

    let hits = ranked
        .into_iter()
        .filter_map(|(id, score)| {
            let chunk = by_id.get(&id)?;
            Some(SearchHit {
                file_path: chunk.rel_path.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                summary: chunk.symbol_name.clone().unwrap_or_else(|| format!("{}:{}-{}", chunk.rel_path, chunk.start_line, chunk.end_line)),
                snippet: Some(chunk.content.lines().take(8).collect::<Vec<_>>().join("\n")),
                score: (score * 1000.0).round() / 1000.0,
                component_type: chunk.component_type.clone(),
                layer: None,
                framework: chunk.framework.clone(),
                trend: None,
                pattern_warning: None,
                relationships: None,
            })
        })
        .collect();

    SearchResponse { hits, search_quality: quality }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_pascal_case_identifier_as_exact_name() {
        assert_eq!(classify_intent("UserRepository"), Intent::ExactName);
        assert_eq!(classify_intent("how do I authenticate a user?"), Intent::Concept);
        assert_eq!(classify_intent("database migrations"), Intent::Mixed);
    }

    #[test]
    fn rrf_gives_dual_channel_hits_a_higher_score_than_single_channel() {
        let a = ChunkId::new();
        let b = ChunkId::new();
        let lists = vec![(0.6, vec![a, b]), (0.4, vec![a])];
        let scores = reciprocal_rank_fusion(&lists, 60.0);
        assert!(scores[&a] > scores[&b]);
        assert!(scores.values().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn rrf_rank_zero_in_every_channel_normalizes_to_one() {
        let a = ChunkId::new();
        let b = ChunkId::new();
        // Equal weights, both docs at rank 0 in their respective channel: `a`
        // tops both channels, `b` only tops the keyword channel.
        let lists = vec![(0.5, vec![a]), (0.5, vec![a, b])];
        let scores = reciprocal_rank_fusion(&lists, 60.0);
        assert!((scores[&a] - 1.0).abs() < 1e-6);
        assert!(scores[&b] < scores[&a]);
    }

    #[test]
    fn expand_query_never_expands_exact_name() {
        assert_eq!(expand_query("UserRepository", Intent::ExactName, true).len(), 1);
        assert!(expand_query("how do sessions expire", Intent::Concept, true).len() <= 2);
    }
}
