//! Request/response data model for the bridge.
//!
//! # Design Decisions
//! - Request identifiers are v4 UUIDs: collision-free for the process
//!   lifetime, never reused while a waiter is pending
//! - Descriptors are immutable once built and travel by value over the
//!   handler channel
//! - Payloads are validated when delivered, not when rendered, so a
//!   malformed delivery is rejected at the `deliver` boundary and a stored
//!   payload always renders cleanly

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DeliverError;

/// Unique token minted per incoming request, used to correlate the outbound
/// notification with its eventual delivered response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Mint a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Fully buffered view of one accepted request, handed to the external
/// handler over its registration channel.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Correlation identifier for this request.
    pub id: RequestId,

    /// HTTP method (e.g. "GET").
    pub method: String,

    /// URI path, without the query string.
    pub path: String,

    /// Header name to value(s), repeated headers collected in order.
    pub headers: HashMap<String, Vec<String>>,

    /// Query parameters; a repeated name keeps the last value.
    pub query: HashMap<String, String>,

    /// Request body, absent when the client sent none.
    pub body: Option<Bytes>,
}

/// Response delivered by the external handler for one identifier.
///
/// Handlers that speak HTTP deliver `{status, headers, body}`; anything
/// else is treated as an opaque JSON value and rendered as
/// `200 application/json`.
#[derive(Debug, Clone)]
pub enum ResponsePayload {
    /// An HTTP-shaped payload, validated at delivery time.
    Http(HttpResponsePayload),
    /// An application-defined JSON value.
    Opaque(Value),
}

/// The validated HTTP form of a delivered payload.
#[derive(Debug, Clone)]
pub struct HttpResponsePayload {
    /// Response status, defaults to 200.
    pub status: StatusCode,
    /// Response headers, copied onto the response verbatim.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl ResponsePayload {
    /// Classify and validate a delivered JSON value.
    ///
    /// An object carrying any of `status`, `headers` or `body` is treated as
    /// HTTP-shaped and must validate; everything else passes through opaque.
    pub fn from_value(value: Value) -> Result<Self, DeliverError> {
        let object = match &value {
            Value::Object(map)
                if map.contains_key("status")
                    || map.contains_key("headers")
                    || map.contains_key("body") =>
            {
                map
            }
            _ => return Ok(Self::Opaque(value)),
        };

        let status = match object.get("status") {
            None => StatusCode::OK,
            Some(raw) => {
                let code = raw
                    .as_u64()
                    .and_then(|code| u16::try_from(code).ok())
                    .filter(|code| (100..=599).contains(code))
                    .ok_or_else(|| malformed(format!("invalid status `{raw}`")))?;
                StatusCode::from_u16(code)
                    .map_err(|_| malformed(format!("invalid status `{code}`")))?
            }
        };

        let mut headers = HeaderMap::new();
        if let Some(raw) = object.get("headers") {
            let map = raw
                .as_object()
                .ok_or_else(|| malformed("headers must be an object"))?;
            for (name, value) in map {
                let name = HeaderName::from_str(name)
                    .map_err(|_| malformed(format!("invalid header name `{name}`")))?;
                let value = value
                    .as_str()
                    .and_then(|v| HeaderValue::from_str(v).ok())
                    .ok_or_else(|| malformed(format!("invalid value for header `{name}`")))?;
                headers.append(name, value);
            }
        }

        let body = match object.get("body") {
            None => Bytes::new(),
            Some(Value::String(body)) => Bytes::from(body.clone()),
            Some(_) => return Err(malformed("body must be a string")),
        };

        Ok(Self::Http(HttpResponsePayload {
            status,
            headers,
            body,
        }))
    }
}

fn malformed(message: impl Into<String>) -> DeliverError {
    DeliverError::MalformedPayload(message.into())
}
