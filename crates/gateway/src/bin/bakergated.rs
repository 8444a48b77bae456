use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use bakergate_gateway::config::Config;
use bakergate_gateway::{router, telemetry, ServerOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Remote signing gateway for bakers")]
struct Opts {
    /// Path to the JSON configuration (backend, keys, policy).
    #[clap(long, default_value = "bakergate.json")]
    config: PathBuf,

    /// Address to listen on.
    /// SECURITY: keep this inside the baker's trusted network segment; the
    /// gateway performs no authentication of its own.
    #[clap(long, env = "BAKERGATE_LISTEN_ADDR", default_value = "127.0.0.1:6732")]
    listen_addr: String,

    /// Per-request deadline in seconds, inherited by the backend call.
    #[clap(long, default_value_t = 10)]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing()?;
    let opts = Opts::parse();

    let config = Config::load(&opts.config)?;
    let gateway = Arc::new(config.build().await?);
    tracing::info!(keys = gateway.key_count(), "loaded signing keys");

    let options = ServerOptions {
        request_timeout: Duration::from_secs(opts.request_timeout_secs),
        ..ServerOptions::default()
    };
    let app = router(gateway, &options);

    let addr: SocketAddr = opts.listen_addr.parse()?;
    tracing::info!(%addr, "gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
