//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or host-supplied struct
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → owned by the WebServer for its lifetime
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - The port and TLS material are `start` arguments, not config fields,
//!   because the host chooses them per start call

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ServerConfig;
pub use schema::TlsOptions;
