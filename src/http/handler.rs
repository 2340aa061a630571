//! The per-request bridge handler.
//!
//! # Responsibilities
//! - Mint a fresh request identifier
//! - Buffer the body and build the request descriptor
//! - Fire-and-forget the descriptor to the registered handler
//! - Suspend on the correlation table until delivery, timeout, or shutdown
//! - Render the outcome: payload verbatim, 504 on timeout, 503 when no
//!   handler is registered or the server is stopping
//!
//! Every method and path lands here (the router has no routes, only this
//! fallback): routing is the external handler's business.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use tracing::{debug, warn};

use crate::bridge::correlation::{CorrelationTable, WaitOutcome};
use crate::bridge::slot::HandlerSlot;
use crate::bridge::types::{RequestDescriptor, RequestId, ResponsePayload};

/// State shared with every bridged request.
#[derive(Clone)]
pub(crate) struct BridgeState {
    pub table: Arc<CorrelationTable>,
    pub slot: Arc<HandlerSlot>,
    pub response_timeout: Duration,
    pub max_body_bytes: usize,
}

/// Bridge one accepted request to the external handler and block for its
/// correlated response.
pub(crate) async fn bridge_request(
    State(state): State<BridgeState>,
    request: Request,
) -> Response {
    let id = RequestId::new();
    let (parts, body) = request.into_parts();

    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();
    let query = parse_query(parts.uri.query());
    let headers = collect_headers(&parts.headers);

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) if bytes.is_empty() => None,
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!(%id, error = %err, "request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let descriptor = RequestDescriptor {
        id,
        method: method.clone(),
        path: path.clone(),
        headers,
        query,
        body,
    };

    if state.slot.dispatch(descriptor).is_err() {
        debug!(%id, method = %method, path = %path, "no handler registered");
        return (StatusCode::SERVICE_UNAVAILABLE, "No request handler registered").into_response();
    }

    debug!(%id, method = %method, path = %path, "request dispatched, awaiting response");

    match state.table.claim(id, state.response_timeout).await {
        WaitOutcome::Delivered(payload) => render(payload),
        WaitOutcome::TimedOut => {
            warn!(
                %id,
                timeout_secs = state.response_timeout.as_secs(),
                "handler did not deliver a response in time"
            );
            (StatusCode::GATEWAY_TIMEOUT, "Handler did not respond in time").into_response()
        }
        WaitOutcome::Cancelled => {
            debug!(%id, "wait released by shutdown");
            (StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down").into_response()
        }
    }
}

/// Render a delivered payload as the HTTP response, verbatim.
fn render(payload: ResponsePayload) -> Response {
    match payload {
        ResponsePayload::Http(http) => {
            let mut response = Response::new(Body::from(http.body));
            *response.status_mut() = http.status;
            *response.headers_mut() = http.headers;
            response
        }
        // Handlers that do not speak raw HTTP get their value relayed as
        // JSON with a 200.
        ResponsePayload::Opaque(value) => Json(value).into_response(),
    }
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    match query {
        Some(query) => url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
        None => HashMap::new(),
    }
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut collected: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        collected
            .entry(name.to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    collected
}
