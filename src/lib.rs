//! Embeddable HTTP(S) server bridged to an external asynchronous handler.
//!
//! Every accepted request is turned into a [`RequestDescriptor`], pushed to
//! whichever handler is registered, and held open until a response payload
//! is delivered for its identifier:
//!
//! ```text
//! client ──▶ listener ──▶ bridge handler ──┐ descriptor
//!                                          ▼
//!                                   handler channel ──▶ external handler
//!                                          │
//!            correlation table ◀── deliver(id, payload)
//!                  │
//! client ◀── rendered response
//! ```
//!
//! The bridge wait is bounded by a configurable timeout (504 on expiry),
//! answers 503 when no handler is registered, and is released promptly on
//! `stop`. TLS credentials are provisioned from a keystore reference: a PEM
//! bundle on disk or the same bundle base64-encoded.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use webserver_bridge::{ServerConfig, WebServer};
//!
//! let server = WebServer::new(ServerConfig::default());
//! let mut requests = server.register_handler();
//! let addr = server.start(8080, None).await?;
//!
//! while let Some(request) = requests.recv().await {
//!     server.deliver(
//!         &request.id.to_string(),
//!         serde_json::json!({ "status": 200, "body": "ok" }),
//!     )?;
//! }
//! # Ok(()) }
//! ```

// Core subsystems
pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod net;

pub use bridge::slot::RequestReceiver;
pub use bridge::types::{RequestDescriptor, RequestId, ResponsePayload};
pub use config::{ServerConfig, TlsOptions};
pub use error::{DeliverError, StartError, TlsError};
pub use http::WebServer;
