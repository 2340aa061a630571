//! Shared utilities for integration testing.

use std::sync::Arc;

use webserver_bridge::{RequestDescriptor, ServerConfig, WebServer};

/// Start a server on an ephemeral port, returning it with its base URL.
pub async fn start_server(config: ServerConfig) -> (Arc<WebServer>, String) {
    let server = Arc::new(WebServer::new(config));
    let addr = server.start(0, None).await.unwrap();
    (server, format!("http://127.0.0.1:{}", addr.port()))
}

/// Register a handler that answers every incoming request through `respond`.
#[allow(dead_code)]
pub fn spawn_responder<F>(server: &Arc<WebServer>, respond: F)
where
    F: Fn(&RequestDescriptor) -> serde_json::Value + Send + Sync + 'static,
{
    let mut requests = server.register_handler();
    let server = server.clone();
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let payload = respond(&request);
            let _ = server.deliver(&request.id.to_string(), payload);
        }
    });
}

/// Register a handler that receives requests but never delivers a response.
#[allow(dead_code)]
pub fn spawn_silent_handler(server: &Arc<WebServer>) {
    let mut requests = server.register_handler();
    tokio::spawn(async move { while requests.recv().await.is_some() {} });
}
