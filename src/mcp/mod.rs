//! MCP (Model Context Protocol) tool server (spec §2 "Tool surface", §6).
//!
//! Every tool reads through [`crate::storage::ensure_valid_or_auto_heal`]
//! first, so a corrupted index triggers exactly one auto-heal rebuild
//! before the call proceeds, and every response carries the resulting
//! index signal alongside its payload.

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ErrorCode, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::analyzer::AnalyzerRegistry;
use crate::config::Settings;
use crate::embedding::EmbeddingProvider;
use crate::error::CoreError;
use crate::intelligence::{self, ConvergingSignals};
use crate::lexical::LexicalIndex;
use crate::search::{self, SearchOptions};
use crate::storage::{self, ARTIFACT_INDEX, ARTIFACT_INTELLIGENCE, ARTIFACT_RELATIONSHIPS, IndexArtifact, IndexSignal, IntelligenceArtifact, RelationshipsArtifact};
use crate::symbols;
use crate::vector_store::InMemoryVectorStore;

fn mcp_err(e: CoreError) -> McpError {
    let envelope = e.to_envelope();
    McpError::new(
        ErrorCode::INTERNAL_ERROR,
        envelope.message,
        Some(serde_json::json!({ "errorCode": envelope.error_code, "hint": envelope.hint })),
    )
}

fn envelope_text<T: Serialize>(data: T, index: IndexSignal) -> CallToolResult {
    #[derive(Serialize)]
    struct Envelope<T> {
        #[serde(flatten)]
        data: T,
        index: IndexSignal,
    }
    let body = serde_json::to_string_pretty(&Envelope { data, index }).unwrap_or_else(|e| format!("{{\"error\":\"serialize failed: {e}\"}}"));
    CallToolResult::success(vec![Content::text(body)])
}

/// State shared across tool calls: the indexed root, effective settings,
/// and the embedding provider used both at index time and at query time.
pub struct Engine {
    pub root: PathBuf,
    pub settings: Settings,
    pub embedding: Arc<dyn EmbeddingProvider>,
}

impl Engine {
    fn rebuild(&self) -> Result<(), CoreError> {
        let mut store = InMemoryVectorStore::new();
        crate::indexing::run(&self.root, &self.settings, Some(self.embedding.as_ref()), &mut store, |_event| {})?;
        Ok(())
    }

    fn ensure_index(&self) -> Result<IndexSignal, CoreError> {
        storage::ensure_valid_or_auto_heal(&self.root, || self.rebuild())
    }

    fn load_index(&self) -> Result<IndexArtifact, CoreError> {
        storage::read_artifact(&self.root, ARTIFACT_INDEX).map_err(CoreError::from)
    }

    fn load_intelligence(&self) -> Result<IntelligenceArtifact, CoreError> {
        storage::read_artifact(&self.root, ARTIFACT_INTELLIGENCE).map_err(CoreError::from)
    }

    fn load_relationships(&self) -> Result<RelationshipsArtifact, CoreError> {
        storage::read_artifact(&self.root, ARTIFACT_RELATIONSHIPS).map_err(CoreError::from)
    }
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SearchCodebaseRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(rename = "includeSnippets", default = "default_true")]
    pub include_snippets: bool,
}

fn default_limit() -> usize {
    5
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct RefreshIndexRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "incrementalOnly", default)]
    pub incremental_only: bool,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetTeamPatternsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetSymbolReferencesRequest {
    pub symbol: String,
    #[serde(default = "default_reference_limit")]
    pub limit: usize,
}

fn default_reference_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetComponentUsageRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct DetectCircularDependenciesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Clone)]
pub struct CodebaseIntelligenceServer {
    engine: Arc<RwLock<Engine>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CodebaseIntelligenceServer {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Hybrid semantic+lexical search over the indexed codebase")]
    pub async fn search_codebase(&self, Parameters(req): Parameters<SearchCodebaseRequest>) -> Result<CallToolResult, McpError> {
        let engine = self.engine.read().await;
        let signal = engine.ensure_index().map_err(mcp_err)?;
        if signal.status != storage::IndexStatus::Ready {
            return Ok(envelope_text(serde_json::json!({ "hits": [] }), signal));
        }

        let index = engine.load_index().map_err(mcp_err)?;
        let lexical = LexicalIndex::build(&index.chunks).map_err(|e| mcp_err(CoreError::ProviderFailure { component: "lexical".into(), reason: e.to_string() }))?;
        let mut vectors = InMemoryVectorStore::new();
        for (id, vector) in &index.embeddings {
            vectors.upsert(*id, vector.clone());
        }

        let mut options = SearchOptions::default();
        if let Some(intent) = &req.intent {
            options.profile = match intent.as_str() {
                "edit" => search::Profile::Edit,
                "refactor" => search::Profile::Refactor,
                "migrate" => search::Profile::Migrate,
                _ => search::Profile::Explore,
            };
        }

        let response = search::search(&req.query, req.limit, &options, &engine.settings.search, &index.chunks, Some(&lexical), Some(&vectors), Some(engine.embedding.as_ref()));

        let preflight_intent = intelligence::classify_intent_for_preflight(req.intent.as_deref());
        let body = match preflight_intent {
            intelligence::Intent::Edit | intelligence::Intent::Refactor | intelligence::Intent::Migrate => {
                let relationships = engine.load_relationships().map_err(mcp_err)?;
                let graph = relationships.rebuild_graph();
                let intelligence_artifact = engine.load_intelligence().map_err(mcp_err)?;
                let result_files: Vec<String> = response.hits.iter().map(|h| h.file_path.clone()).collect();
                let converging = converging_signals(&response, &intelligence_artifact, &result_files);
                let cycle_count = graph.find_cycles(None).len();
                let preflight = intelligence::build_preflight(&intelligence_artifact, &graph, &result_files, &response.search_quality, converging, cycle_count, false, chrono::Utc::now());
                serde_json::json!({ "hits": response.hits, "searchQuality": response.search_quality, "preflight": preflight })
            }
            intelligence::Intent::Explore | intelligence::Intent::None => {
                let converging = converging_signals_lite(&response);
                let lite = intelligence::build_lite_preflight(&response.search_quality, converging);
                serde_json::json!({ "hits": response.hits, "searchQuality": response.search_quality, "preflight": lite })
            }
        };

        Ok(envelope_text(body, signal))
    }

    #[tool(description = "Analyzer-merged codebase metadata plus a team-pattern excerpt")]
    pub async fn get_codebase_metadata(&self) -> Result<CallToolResult, McpError> {
        let engine = self.engine.read().await;
        let signal = engine.ensure_index().map_err(mcp_err)?;
        let intelligence = engine.load_intelligence().map_err(mcp_err)?;
        let registry = AnalyzerRegistry::with_defaults();
        let metadata = registry.detect_metadata(&engine.root);

        let mut top_categories: Vec<_> = intelligence.patterns.iter().map(|(category, consensus)| serde_json::json!({ "category": category, "primary": consensus.primary.name, "frequencyPct": consensus.primary.frequency_pct })).collect();
        top_categories.sort_by(|a, b| a["category"].as_str().cmp(&b["category"].as_str()));

        Ok(envelope_text(
            serde_json::json!({ "metadata": metadata, "teamPatterns": top_categories, "topLibraries": intelligence.top_libraries }),
            signal,
        ))
    }

    #[tool(description = "Current indexing status and progress snapshot")]
    pub async fn get_indexing_status(&self) -> Result<CallToolResult, McpError> {
        let engine = self.engine.read().await;
        let report = storage::require_valid_index(&engine.root);
        Ok(CallToolResult::success(vec![Content::text(serde_json::to_string_pretty(&report).unwrap_or_default())]))
    }

    #[tool(description = "Force a full rebuild of the index")]
    pub async fn refresh_index(&self, Parameters(req): Parameters<RefreshIndexRequest>) -> Result<CallToolResult, McpError> {
        let engine = self.engine.read().await;
        engine.rebuild().map_err(mcp_err)?;
        let signal = engine.ensure_index().map_err(mcp_err)?;
        Ok(envelope_text(serde_json::json!({ "reason": req.reason, "incrementalOnly": req.incremental_only }), signal))
    }

    #[tool(description = "Per-category pattern consensus plus detected conflicts")]
    pub async fn get_team_patterns(&self, Parameters(req): Parameters<GetTeamPatternsRequest>) -> Result<CallToolResult, McpError> {
        let engine = self.engine.read().await;
        let signal = engine.ensure_index().map_err(mcp_err)?;
        let intelligence = engine.load_intelligence().map_err(mcp_err)?;

        let entries: Vec<_> = intelligence
            .patterns
            .iter()
            .filter(|(category, _)| req.category.as_deref().is_none_or(|c| c == category.as_str()))
            .map(|(category, consensus)| {
                serde_json::json!({
                    "category": category,
                    "consensus": consensus,
                    "conflicts": consensus.conflicts(),
                })
            })
            .collect();

        Ok(envelope_text(serde_json::json!({ "patterns": entries }), signal))
    }

    #[tool(description = "Find all usages of a symbol by exact identifier match")]
    pub async fn get_symbol_references(&self, Parameters(req): Parameters<GetSymbolReferencesRequest>) -> Result<CallToolResult, McpError> {
        let engine = self.engine.read().await;
        let signal = engine.ensure_index().map_err(mcp_err)?;
        let index = engine.load_index().map_err(mcp_err)?;
        let refs = symbols::find_references(&index.chunks, &req.symbol, req.limit);
        Ok(envelope_text(refs, signal))
    }

    #[tool(description = "External library usage lookup from the import graph")]
    pub async fn get_component_usage(&self, Parameters(req): Parameters<GetComponentUsageRequest>) -> Result<CallToolResult, McpError> {
        let engine = self.engine.read().await;
        let signal = engine.ensure_index().map_err(mcp_err)?;
        let intelligence = engine.load_intelligence().map_err(mcp_err)?;

        let usage_count = intelligence.top_libraries.iter().find(|lib| lib.name == req.name).map(|lib| lib.count).unwrap_or(0);

        Ok(envelope_text(serde_json::json!({ "name": req.name, "usageCount": usage_count }), signal))
    }

    #[tool(description = "Detect circular dependencies within the internal file graph")]
    pub async fn detect_circular_dependencies(&self, Parameters(req): Parameters<DetectCircularDependenciesRequest>) -> Result<CallToolResult, McpError> {
        let engine = self.engine.read().await;
        let signal = engine.ensure_index().map_err(mcp_err)?;
        let relationships = engine.load_relationships().map_err(mcp_err)?;
        let graph = relationships.rebuild_graph();
        let cycles = graph.find_cycles(req.scope.as_deref());

        let annotated: Vec<_> = cycles
            .into_iter()
            .map(|cycle| {
                let severity = crate::graph::CycleSeverity::from_length(cycle.len().saturating_sub(1));
                serde_json::json!({ "cycle": cycle, "severity": severity.as_str() })
            })
            .collect();

        Ok(envelope_text(serde_json::json!({ "cycles": annotated }), signal))
    }
}

#[tool_handler]
impl ServerHandler for CodebaseIntelligenceServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "codectx".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Codebase Intelligence".to_string()),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Start with search_codebase to locate relevant code. Use get_codebase_metadata \
                and get_team_patterns before editing to see which conventions this codebase has \
                converged on. get_symbol_references and detect_circular_dependencies help gauge \
                blast radius before a change. refresh_index forces a rebuild if results look stale."
                    .to_string(),
            ),
        }
    }
}

/// Derives the preflight convergence signals (spec §4.C10) from what a
/// single search call actually has available: no persistent memory store is
/// wired in here, so `related_memory` is always false.
fn converging_signals(response: &search::SearchResponse, intelligence: &IntelligenceArtifact, result_files: &[String]) -> ConvergingSignals {
    let preferred_pattern_match = response.hits.iter().any(|hit| {
        hit.component_type
            .as_ref()
            .map(|ct| intelligence.patterns.values().any(|c| c.primary.name.eq_ignore_ascii_case(ct)))
            .unwrap_or(false)
    });
    let golden_file_match = result_files.iter().any(|f| intelligence.golden_files.iter().any(|g| &g.file == f));
    let top_k_agreement = response.search_quality.status == crate::search::Status::Ok;

    ConvergingSignals {
        preferred_pattern_match,
        golden_file_match,
        related_memory: false,
        top_k_agreement,
    }
}

fn converging_signals_lite(response: &search::SearchResponse) -> ConvergingSignals {
    ConvergingSignals {
        preferred_pattern_match: false,
        golden_file_match: false,
        related_memory: false,
        top_k_agreement: response.search_quality.status == crate::search::Status::Ok,
    }
}
