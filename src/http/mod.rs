//! HTTP serving: the bridge handler and the server lifecycle.

pub(crate) mod handler;
pub mod server;

pub use server::WebServer;
