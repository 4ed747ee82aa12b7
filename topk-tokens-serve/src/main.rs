mod cli;
mod inference_endpoint;
mod responses;
mod routes;
mod workers;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .init();

    let router = routes::topk_tokens::router(&args)?;

    tracing::info!("Listening on {}", args.host());
    let listener = tokio::net::TcpListener::bind(args.host()).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
