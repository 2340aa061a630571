//! Demo binary: runs the bridged server with an echo handler.
//!
//! Useful for poking the full request path from a terminal:
//!
//! ```text
//! webserver-bridge --port 8080
//! curl http://127.0.0.1:8080/status        # -> "GET /status"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webserver_bridge::config::loader::load_config;
use webserver_bridge::{ServerConfig, TlsOptions, WebServer};

#[derive(Debug, Parser)]
#[command(version, about = "Embedded web server bridged to an echo handler")]
struct Args {
    /// Port to listen on (0 picks an ephemeral port).
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Keystore reference: PEM bundle path or base64 blob. Enables TLS.
    #[arg(long)]
    keystore: Option<String>,

    /// Keystore passphrase.
    #[arg(long)]
    passphrase: Option<String>,

    /// Optional TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webserver_bridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    tracing::info!(
        host = %config.host,
        response_timeout_secs = config.response_timeout_secs,
        "Configuration loaded"
    );

    let server = Arc::new(WebServer::new(config));
    let mut requests = server.register_handler();

    let tls = args.keystore.map(|keystore| TlsOptions {
        keystore,
        passphrase: args.passphrase,
    });
    let addr = server.start(args.port, tls).await?;
    tracing::info!(address = %addr, "Listening for connections");

    let echo = server.clone();
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let body = format!("{} {}", request.method, request.path);
            let payload = serde_json::json!({
                "status": 200,
                "headers": { "content-type": "text/plain" },
                "body": body,
            });
            if let Err(err) = echo.deliver(&request.id.to_string(), payload) {
                tracing::error!(error = %err, "failed to deliver echo response");
            }
        }
        tracing::info!("handler stream closed");
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    server.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
