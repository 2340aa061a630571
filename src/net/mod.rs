//! Network-level concerns: TLS credential provisioning.

pub mod tls;
