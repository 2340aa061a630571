//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files;
//! embedding hosts can also build them directly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Server-wide configuration. The listen port and TLS material are not part
/// of this struct: they are arguments to `start`, which the host may call
/// repeatedly with different values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, combined with the port passed to `start`.
    pub host: String,

    /// How long a bridged request waits for the handler's response before
    /// answering 504.
    pub response_timeout_secs: u64,

    /// How long `stop` waits for released connections to drain before
    /// closing them forcibly.
    pub shutdown_grace_secs: u64,

    /// Retention bound for deliveries nobody is waiting on; the oldest
    /// unclaimed entry is evicted beyond this.
    pub max_buffered_responses: usize,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,

    /// Directory that keystore path references resolve against. A bare
    /// path is used as-is when unset.
    pub asset_root: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            response_timeout_secs: 30,
            shutdown_grace_secs: 5,
            max_buffered_responses: 1024,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            asset_root: None,
        }
    }
}

/// TLS material for one `start` call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsOptions {
    /// Keystore reference: a path (relative to `asset_root` when set) to a
    /// PEM bundle holding the certificate chain and private key, or the
    /// same bundle base64-encoded.
    pub keystore: String,

    /// Keystore passphrase. Kept for interface parity; PEM bundles must be
    /// unencrypted and an encrypted key is a typed error.
    pub passphrase: Option<String>,
}
