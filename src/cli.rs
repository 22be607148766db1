//! Thin command-line surface over the indexing/search/intelligence core
//! (SPEC_FULL "CLI surface"). Grounded on the teacher's `cli::args` shape,
//! without its colored-help styling (no `console`/`owo-colors` dependency
//! carried forward here).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "codectx",
    version = env!("CARGO_PKG_VERSION"),
    about = "Codebase intelligence core: indexing, hybrid search, and edit-preflight"
)]
pub struct Cli {
    /// Path to a custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root to operate on (defaults to CODEBASE_ROOT or the current directory)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build (or rebuild) the index for the project root
    Index {
        /// Skip the embedding phase and serve keyword-only search
        #[arg(long)]
        skip_embedding: bool,
    },

    /// Run a hybrid search query against the current index
    Search {
        query: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
        #[arg(long)]
        intent: Option<String>,
    },

    /// Report index validity and artifact fingerprints
    Status,

    /// Force a full index rebuild
    Refresh {
        #[arg(long)]
        reason: Option<String>,
    },

    /// Print per-category pattern consensus
    Patterns {
        category: Option<String>,
    },

    /// Find usages of a symbol by exact identifier match
    References {
        symbol: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Start the MCP server on stdio transport
    Serve,
}
