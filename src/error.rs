//! Error types for the server boundaries.
//!
//! Every failure is recovered where it is detected and surfaced as a typed
//! value: configuration and lifecycle errors to the caller of `start`,
//! malformed deliveries to the caller of `deliver`. Nothing crosses the
//! listener/handler boundary as a panic.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised while provisioning a TLS credential from a keystore.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The keystore reference is neither a readable file nor valid base64.
    #[error("keystore is not a readable file ({io}) and not valid base64 ({decode})")]
    Unresolvable {
        io: std::io::Error,
        decode: base64::DecodeError,
    },

    /// The keystore bytes could not be parsed as a PEM bundle.
    #[error("keystore parse error: {0}")]
    Parse(String),

    /// The keystore contains no certificate.
    #[error("keystore contains no certificate")]
    NoCertificate,

    /// The keystore contains no private key.
    #[error("keystore contains no private key")]
    NoPrivateKey,

    /// The keystore private key is passphrase-encrypted, which the PEM
    /// loader cannot decrypt.
    #[error("keystore private key is encrypted; use an unencrypted PEM bundle")]
    EncryptedKey,

    /// The certificate/key pair was rejected when building the server
    /// credential.
    #[error("invalid server credential: {0}")]
    BadCredential(String),
}

/// Errors raised by `WebServer::start`.
#[derive(Debug, Error)]
pub enum StartError {
    /// The listener is already running; the existing listener is untouched.
    #[error("server already running on {addr}")]
    AlreadyRunning { addr: SocketAddr },

    /// The socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TLS was requested but the credential could not be provisioned.
    #[error("tls failure: {0}")]
    Tls(#[from] TlsError),
}

/// Errors raised by `WebServer::deliver`.
#[derive(Debug, Error)]
pub enum DeliverError {
    /// The identifier is not a valid request identifier.
    #[error("malformed request identifier `{0}`")]
    InvalidIdentifier(String),

    /// The payload cannot be rendered as an HTTP response.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}
