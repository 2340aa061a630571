//! Server lifecycle and the host-facing API.
//!
//! # Responsibilities
//! - Own the listener state machine: Stopped → Running → Stopped
//! - Bind the socket (optionally TLS) and report the bound address
//! - Expose the handler registration and response delivery entry points
//! - On stop: refuse new connections immediately, release every in-flight
//!   bridge wait, then drain within the configured grace period

use std::net::{IpAddr, SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bridge::correlation::CorrelationTable;
use crate::bridge::slot::{HandlerSlot, RequestReceiver};
use crate::bridge::types::{RequestId, ResponsePayload};
use crate::config::{ServerConfig, TlsOptions};
use crate::error::{DeliverError, StartError};
use crate::http::handler::{bridge_request, BridgeState};
use crate::net::tls;

/// An embeddable HTTP(S) server that bridges every request to one external
/// asynchronous handler.
///
/// The correlation table and handler slot live as long as this value and are
/// shared with the listener it spawns; `start` and `stop` drive the listener
/// without invalidating either entry point.
pub struct WebServer {
    config: ServerConfig,
    table: Arc<CorrelationTable>,
    slot: Arc<HandlerSlot>,
    state: Mutex<ListenerState>,
}

enum ListenerState {
    Stopped,
    Running(RunningListener),
}

struct RunningListener {
    handle: Handle,
    local_addr: SocketAddr,
    serve_task: JoinHandle<()>,
}

impl WebServer {
    /// Create a stopped server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let table = Arc::new(CorrelationTable::new(config.max_buffered_responses));
        Self {
            table,
            slot: Arc::new(HandlerSlot::new()),
            config,
            state: Mutex::new(ListenerState::Stopped),
        }
    }

    /// The configuration this server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Register the external handler, replacing any previous registration.
    /// The returned stream yields one descriptor per incoming request and
    /// stays open until replaced, cleared, or the listener stops.
    pub fn register_handler(&self) -> RequestReceiver {
        self.slot.register()
    }

    /// Explicitly clear the handler registration; subsequent requests are
    /// answered 503 without waiting.
    pub fn clear_handler(&self) {
        self.slot.clear();
    }

    /// Deliver a response payload for a request identifier.
    ///
    /// Delivering for an identifier nobody is waiting on is legal: the
    /// payload is buffered until claimed or evicted by the retention bound.
    /// Other in-flight requests are never affected.
    pub fn deliver(&self, id: &str, payload: serde_json::Value) -> Result<(), DeliverError> {
        let id: RequestId = id
            .parse()
            .map_err(|_| DeliverError::InvalidIdentifier(id.to_string()))?;
        let payload = ResponsePayload::from_value(payload)?;
        self.table.put(id, payload);
        Ok(())
    }

    /// Start listening on `port` (0 picks an ephemeral port), with TLS when
    /// options are supplied. Returns the bound address.
    ///
    /// Fails with `AlreadyRunning` if a listener is live; any bind or TLS
    /// failure leaves the state `Stopped` and reports the cause.
    pub async fn start(
        &self,
        port: u16,
        tls_options: Option<TlsOptions>,
    ) -> Result<SocketAddr, StartError> {
        let mut state = self.state.lock().await;
        if let ListenerState::Running(running) = &*state {
            return Err(StartError::AlreadyRunning {
                addr: running.local_addr,
            });
        }

        let rustls_config = match &tls_options {
            Some(options) => Some(
                tls::provision(
                    &options.keystore,
                    options.passphrase.as_deref(),
                    self.config.asset_root.as_deref(),
                )
                .await?,
            ),
            None => None,
        };

        let requested = format!("{}:{}", self.config.host, port);
        let bind_err = |source: std::io::Error| StartError::Bind {
            addr: requested.clone(),
            source,
        };
        let host: IpAddr = self.config.host.parse().map_err(|err| {
            bind_err(std::io::Error::new(std::io::ErrorKind::InvalidInput, err))
        })?;
        let listener = StdTcpListener::bind(SocketAddr::new(host, port)).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        self.table.reopen();

        let bridge_state = BridgeState {
            table: self.table.clone(),
            slot: self.slot.clone(),
            response_timeout: Duration::from_secs(self.config.response_timeout_secs),
            max_body_bytes: self.config.max_body_bytes,
        };
        let app = Router::new()
            .fallback(bridge_request)
            .with_state(bridge_state);

        let handle = Handle::new();
        let serve_handle = handle.clone();
        let serve_task = match rustls_config {
            Some(rustls) => tokio::spawn(async move {
                if let Err(err) = axum_server::from_tcp_rustls(listener, rustls)
                    .handle(serve_handle)
                    .serve(app.into_make_service())
                    .await
                {
                    error!(error = %err, "HTTPS server terminated with error");
                }
            }),
            None => tokio::spawn(async move {
                if let Err(err) = axum_server::from_tcp(listener)
                    .handle(serve_handle)
                    .serve(app.into_make_service())
                    .await
                {
                    error!(error = %err, "HTTP server terminated with error");
                }
            }),
        };

        info!(
            address = %local_addr,
            tls = tls_options.is_some(),
            "Server is running"
        );
        *state = ListenerState::Running(RunningListener {
            handle,
            local_addr,
            serve_task,
        });
        Ok(local_addr)
    }

    /// Stop the listener. Idempotent: stopping a stopped server is a no-op.
    ///
    /// New connections are refused immediately; in-flight bridge waits are
    /// released as cancelled (503) rather than left to time out, and the
    /// handler registration is cleared.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let ListenerState::Running(mut running) =
            std::mem::replace(&mut *state, ListenerState::Stopped)
        else {
            return;
        };

        // Release suspended bridges before draining so connections answer
        // promptly instead of running out their timeouts.
        self.table.close();
        self.slot.clear();
        running
            .handle
            .graceful_shutdown(Some(Duration::from_secs(self.config.shutdown_grace_secs)));

        if let Err(err) = (&mut running.serve_task).await {
            if !err.is_cancelled() {
                error!(error = %err, "server task failed during shutdown");
            }
        }
        info!(address = %running.local_addr, "Server stopped");
    }

    /// The bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.state.lock().await {
            ListenerState::Running(running) => Some(running.local_addr),
            ListenerState::Stopped => None,
        }
    }
}

impl Drop for WebServer {
    fn drop(&mut self) {
        // Best effort: a server dropped while running tears the listener
        // down and releases any suspended bridges.
        if let ListenerState::Running(running) = &*self.state.get_mut() {
            running.handle.shutdown();
            self.table.close();
        }
    }
}
