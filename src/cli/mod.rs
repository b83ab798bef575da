//! CLI module for ragchain
//!
//! - `upsert`: chunk a file and store its embeddings
//! - `query`: similarity search, optionally answering once per hit
//! - `chat`: one conversational turn with history

pub mod chat;
pub mod query;
pub mod upsert;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::domain::{RagChain, Scope};
use crate::infrastructure::factory::RagChainFactory;
use crate::infrastructure::observability::{init_metrics, init_tracing};

/// ragchain - retrieval-augmented generation over a vector store
#[derive(Parser)]
#[command(name = "ragchain")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Split a file into chunks and store their embeddings
    Upsert(upsert::UpsertArgs),

    /// Find the chunks closest to a text
    Query(query::QueryArgs),

    /// Ask a question within a conversation
    Chat(chat::ChatArgs),
}

/// Vector-store partition shared by every command
#[derive(Args, Clone, Debug, Default)]
pub struct ScopeArgs {
    /// Namespace inside the table (defaults to "knowledge")
    #[arg(long)]
    pub namespace: Option<String>,

    /// Table (defaults to vector_store.default_table)
    #[arg(long)]
    pub table: Option<String>,
}

impl ScopeArgs {
    pub fn to_scope(&self) -> Scope {
        let mut scope = Scope::default();
        if let Some(namespace) = &self.namespace {
            scope = scope.with_namespace(namespace);
        }
        if let Some(table) = &self.table {
            scope = scope.with_table(table);
        }
        scope
    }
}

/// Load configuration, start observability and build the chain
pub async fn bootstrap() -> anyhow::Result<RagChain> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.logging, &config.observability.tracing);
    init_metrics(&config.observability.metrics);

    RagChainFactory::build(&config)
        .await
        .context("Failed to build RAG chain")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_command() {
        let cli = Cli::try_parse_from([
            "ragchain", "chat", "what is rust?", "--id", "ctx-1", "--stream", "--namespace", "docs",
        ])
        .unwrap();

        match cli.command {
            Command::Chat(args) => {
                assert_eq!(args.query, "what is rust?");
                assert_eq!(args.id, "ctx-1");
                assert!(args.stream);
                assert_eq!(args.scope.to_scope().namespace(), "docs");
            }
            _ => panic!("Expected chat command"),
        }
    }

    #[test]
    fn test_parse_query_defaults() {
        let cli = Cli::try_parse_from(["ragchain", "query", "borrow checker"]).unwrap();

        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.top_k, 4);
                assert_eq!(args.metric, crate::domain::DistanceMetric::L2);
                assert!(!args.answer);
                assert_eq!(args.scope.to_scope(), Scope::default());
            }
            _ => panic!("Expected query command"),
        }
    }

    #[test]
    fn test_chat_requires_context_id() {
        assert!(Cli::try_parse_from(["ragchain", "chat", "hello"]).is_err());
    }
}
