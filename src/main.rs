//! Binary entry point: thin CLI dispatch plus the MCP stdio server
//! (grounded on the teacher's `main.rs` command-match shape).

use clap::Parser;
use codectx::cli::{Cli, Commands};
use codectx::config::{self, Settings};
use codectx::embedding::{EmbeddingProvider, FastEmbedProvider};
use codectx::error::CoreError;
use codectx::mcp::{CodebaseIntelligenceServer, Engine};
use codectx::vector_store::InMemoryVectorStore;
use codectx::{lexical, search, storage, symbols};
use std::sync::Arc;

fn embedding_provider() -> Arc<dyn EmbeddingProvider> {
    match FastEmbedProvider::try_new() {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            tracing::warn!(error = %e, "fastembed unavailable, falling back to hashing provider");
            Arc::new(codectx::embedding::HashingProvider::new(384))
        }
    }
}

fn run_index(root: &std::path::Path, settings: &Settings, skip_embedding: bool) -> Result<(), CoreError> {
    let mut settings = settings.clone();
    settings.indexing.skip_embedding = skip_embedding || settings.indexing.skip_embedding;
    let provider = embedding_provider();
    let mut store = InMemoryVectorStore::new();
    let stats = codectx::indexing::run(root, &settings, Some(provider.as_ref()), &mut store, |event| {
        eprintln!("[{:?}] {}% ({}/{})", event.phase, event.percentage, event.files_processed, event.total_files);
    })?;
    println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
    Ok(())
}

fn run_search(root: &std::path::Path, settings: &Settings, query: &str, limit: usize, intent: Option<String>) -> Result<(), CoreError> {
    let signal = storage::ensure_valid_or_auto_heal(root, || run_index(root, settings, false))?;
    let index: codectx::storage::IndexArtifact = storage::read_artifact(root, storage::ARTIFACT_INDEX)?;
    let lex = lexical::LexicalIndex::build(&index.chunks).map_err(|e| CoreError::ProviderFailure {
        component: "lexical".into(),
        reason: e.to_string(),
    })?;
    let mut vectors = InMemoryVectorStore::new();
    for (id, vector) in &index.embeddings {
        vectors.upsert(*id, vector.clone());
    }
    let provider = embedding_provider();

    let mut options = search::SearchOptions::default();
    if let Some(intent) = &intent {
        options.profile = match intent.as_str() {
            "edit" => search::Profile::Edit,
            "refactor" => search::Profile::Refactor,
            "migrate" => search::Profile::Migrate,
            _ => search::Profile::Explore,
        };
    }

    let response = search::search(query, limit, &options, &settings.search, &index.chunks, Some(&lex), Some(&vectors), Some(provider.as_ref()));

    println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "hits": response.hits, "searchQuality": response.search_quality, "index": signal })).unwrap_or_default());
    Ok(())
}

fn run_status(root: &std::path::Path) {
    let report = storage::require_valid_index(root);
    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
}

fn run_patterns(root: &std::path::Path, category: Option<String>) -> Result<(), CoreError> {
    let artifact: codectx::storage::IntelligenceArtifact = storage::read_artifact(root, storage::ARTIFACT_INTELLIGENCE)?;
    for (name, consensus) in &artifact.patterns {
        if category.as_deref().is_some_and(|c| c != name) {
            continue;
        }
        println!("{name}: {}", consensus.primary.guidance);
        for conflict in consensus.conflicts() {
            println!("  conflict: {}", conflict.guidance);
        }
    }
    Ok(())
}

fn run_references(root: &std::path::Path, symbol: &str, limit: usize) -> Result<(), CoreError> {
    let index: codectx::storage::IndexArtifact = storage::read_artifact(root, storage::ARTIFACT_INDEX)?;
    let refs = symbols::find_references(&index.chunks, symbol, limit);
    println!("{}", serde_json::to_string_pretty(&refs).unwrap_or_default());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let root = config::resolve_root(cli.root.clone(), std::env::var("CODEBASE_ROOT").ok())?;
    storage::migrate_legacy(&root);

    let settings = Settings::load(cli.config.as_deref())?;
    codectx::logging::init_logging(settings.debug);

    match cli.command {
        Commands::Index { skip_embedding } => run_index(&root, &settings, skip_embedding)?,
        Commands::Search { query, limit, intent } => run_search(&root, &settings, &query, limit, intent)?,
        Commands::Status => run_status(&root),
        Commands::Refresh { reason } => {
            eprintln!("rebuilding index{}", reason.map(|r| format!(": {r}")).unwrap_or_default());
            run_index(&root, &settings, false)?;
        }
        Commands::Patterns { category } => run_patterns(&root, category)?,
        Commands::References { symbol, limit } => run_references(&root, &symbol, limit)?,
        Commands::Serve => {
            use rmcp::ServiceExt;
            use rmcp::transport::stdio;

            let provider = embedding_provider();
            let engine = Engine { root, settings, embedding: provider };
            let server = CodebaseIntelligenceServer::new(engine);

            eprintln!("starting MCP server on stdio transport");
            let service = server.serve(stdio()).await?;
            service.waiting().await?;
        }
    }

    Ok(())
}
