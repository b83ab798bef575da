//! Chat command - one turn of a conversation with stored history

use std::io::Write;

use anyhow::Context;
use clap::Args;
use futures::StreamExt;

use super::ScopeArgs;
use crate::domain::{ChatAnswer, ChatRequest};

#[derive(Args, Clone, Debug)]
pub struct ChatArgs {
    /// Question to ask
    pub query: String,

    /// Conversation context id
    #[arg(long)]
    pub id: String,

    /// Print the answer as it is generated
    #[arg(long)]
    pub stream: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

pub async fn run(args: ChatArgs) -> anyhow::Result<()> {
    let chain = super::bootstrap().await?;

    let request = ChatRequest::new(&args.id, &args.query)
        .with_scope(args.scope.to_scope())
        .with_stream(args.stream);

    let answer = chain.chat(request).await.context("Chat failed")?;

    match answer {
        ChatAnswer::Complete(text) => println!("{}", text),
        ChatAnswer::Streaming(mut stream) => {
            let mut stdout = std::io::stdout();

            while let Some(chunk) = stream.next().await {
                let chunk = chunk.context("Stream interrupted")?;
                write!(stdout, "{}", chunk.delta_text())?;
                stdout.flush()?;
            }
            writeln!(stdout)?;
        }
    }

    Ok(())
}
