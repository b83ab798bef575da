//! Upsert command - chunk a file and store its embeddings

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use tracing::info;

use super::ScopeArgs;

#[derive(Args, Clone, Debug)]
pub struct UpsertArgs {
    /// Text file to store
    #[arg(long)]
    pub file: PathBuf,

    /// Characters per chunk
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

pub async fn run(args: UpsertArgs) -> anyhow::Result<()> {
    if args.chunk_size == 0 {
        bail!("--chunk-size must be positive");
    }

    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let chain = super::bootstrap().await?;
    let chunks = chunk_text(&text, args.chunk_size);
    let scope = args.scope.to_scope();

    info!(file = %args.file.display(), chunks = chunks.len(), "Upserting document");

    let summary = chain.ingest(&chunks, &scope).await;
    for id in summary.ids() {
        println!("{}", id);
    }

    let failed = summary.failed();
    if failed > 0 {
        for error in summary.errors() {
            eprintln!("error: {}", error);
        }
        bail!("{} of {} chunks failed", failed, chunks.len());
    }

    Ok(())
}

/// Fixed-size chunks on char boundaries; blank chunks are skipped
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();

    chars
        .chunks(chunk_size.max(1))
        .map(|chunk| chunk.iter().collect::<String>())
        .filter(|chunk| !chunk.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_fixed_size() {
        assert_eq!(chunk_text("abcdefg", 3), vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_chunk_text_respects_char_boundaries() {
        assert_eq!(chunk_text("héllo wörld", 4), vec!["héll", "o wö", "rld"]);
    }

    #[test]
    fn test_chunk_text_skips_blank_chunks() {
        assert_eq!(chunk_text("ab    cd", 2), vec!["ab", "cd"]);
        assert!(chunk_text("", 10).is_empty());
    }
}
