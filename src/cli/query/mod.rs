//! Query command - similarity search over stored chunks

use anyhow::Context;
use clap::Args;

use super::ScopeArgs;
use crate::domain::DistanceMetric;

#[derive(Args, Clone, Debug)]
pub struct QueryArgs {
    /// Text to search for
    pub text: String,

    #[arg(long, default_value_t = 4)]
    pub top_k: usize,

    /// l2, ip or cosine
    #[arg(long, default_value = "l2")]
    pub metric: DistanceMetric,

    /// Answer once per retrieved chunk using the query template
    #[arg(long)]
    pub answer: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

pub async fn run(args: QueryArgs) -> anyhow::Result<()> {
    let chain = super::bootstrap().await?;
    let scope = args.scope.to_scope();

    if args.answer {
        let responses = chain
            .answer_each(&args.text, args.top_k, &scope)
            .await
            .context("Query chain failed")?;

        for response in responses {
            println!("{}\n", response.content());
        }
        return Ok(());
    }

    let result = chain
        .retrieval()
        .query_text(&args.text, args.metric, args.top_k, &scope)
        .await
        .context("Similarity search failed")?;

    for hit in result.hits() {
        println!("{:>10.4}  {}  {}", hit.score, hit.id, hit.text().replace('\n', " "));
    }

    Ok(())
}
