use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;

use quarry_core::{Analyzer, Config};
use quarry_gateway::GatewayServer;
use quarry_github::GithubClient;
use quarry_llm::openai::OpenAiProvider;

#[derive(Parser, Debug)]
#[command(name = "quarry", version, about = "Ask questions about any GitHub repository")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "quarry.toml")]
    config: PathBuf,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Override the configured port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let api_key = config
        .llm
        .api_key
        .clone()
        .context("an OpenAI API key is required: set QUARRY_OPENAI_API_KEY or OPENAI_API_KEY")?;

    let provider = Arc::new(OpenAiProvider::new(
        api_key,
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.embedding_model.clone(),
        config.llm.max_tokens,
    ));
    let github = GithubClient::new(config.github.token.clone());
    let analyzer = Arc::new(Analyzer::new(github, provider, &config));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    GatewayServer::new(&config.server.bind, config.server.port, analyzer, shutdown_rx)
        .with_max_body_size(config.server.max_body_bytes)
        .with_request_timeout(Duration::from_secs(config.server.request_timeout_secs))
        .serve()
        .await?;

    Ok(())
}
