use clap::Parser;
use ragchain::cli::{self, Cli, Command};
use ragchain::infrastructure::observability::shutdown_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Upsert(args) => cli::upsert::run(args).await,
        Command::Query(args) => cli::query::run(args).await,
        Command::Chat(args) => cli::chat::run(args).await,
    };

    shutdown_tracing();
    result
}
