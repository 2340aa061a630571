//! Request/response correlation bridge.
//!
//! The bridge connects two execution contexts that never call each other
//! directly: per-connection server tasks that must block for an answer, and
//! the external handler that produces answers asynchronously, addressed
//! only by request identifier.

pub mod correlation;
pub mod slot;
pub mod types;

pub use correlation::{CorrelationTable, WaitOutcome};
pub use slot::{HandlerSlot, NoHandler, RequestReceiver};
pub use types::{HttpResponsePayload, RequestDescriptor, RequestId, ResponsePayload};
