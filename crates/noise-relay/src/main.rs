use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use noise_relay::{DEFAULT_LOKI_URL, RelayConfig, SAVE_LOG_PATH, router};

#[derive(Parser, Debug)]
#[command(name = "noise-relay", about = "Forwards noise-meter log batches to Grafana Loki")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Loki push endpoint
    #[arg(long, default_value = DEFAULT_LOKI_URL)]
    loki_url: String,

    /// Authorization header sent to Loki instead of the caller's
    #[arg(long, env = "LOKI_AUTHORIZATION")]
    loki_authorization: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let app = router(RelayConfig {
        loki_url: args.loki_url.clone(),
        authorization: args.loki_authorization,
    });

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("Relay listening on http://{}{}", args.bind, SAVE_LOG_PATH);
    info!("Forwarding to {}", args.loki_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
