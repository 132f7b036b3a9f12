use anyhow::{Context, Result};
use clap::Parser;
use fidelity_proxy::{router, ProxyState, DEFAULT_UPSTREAM};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fidelity-proxy", about = "CORS pass-through for Casper JSON-RPC")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "FIDELITY_PROXY_HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "FIDELITY_PROXY_PORT", default_value_t = 3000)]
    port: u16,

    /// Node RPC endpoint requests are forwarded to.
    #[arg(long, env = "FIDELITY_UPSTREAM_RPC", default_value = DEFAULT_UPSTREAM)]
    upstream: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let app = router(ProxyState::new(cli.upstream.clone()));

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, upstream = %cli.upstream, "fidelity proxy listening");

    axum::serve(listener, app).await?;
    Ok(())
}
