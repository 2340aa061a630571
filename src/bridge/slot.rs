//! Single-slot registration of the external request handler.
//!
//! # Design Decisions
//! - At most one handler is registered at a time; registering a new one
//!   atomically replaces the old one (the old receiver's stream just ends)
//! - Dispatch is fire-and-forget over an unbounded channel; the bridge
//!   waits on the correlation table, never on the handler itself
//! - A handler that dropped its receiver is treated as unregistered

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bridge::types::RequestDescriptor;

/// Stream of incoming requests, held by the external handler. Stays open
/// until the registration is replaced, cleared, or the listener stops.
pub type RequestReceiver = mpsc::UnboundedReceiver<RequestDescriptor>;

type RequestSender = mpsc::UnboundedSender<RequestDescriptor>;

/// Returned by `dispatch` when no handler is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoHandler;

/// Holds the current handler registration.
#[derive(Default)]
pub struct HandlerSlot {
    current: ArcSwapOption<RequestSender>,
}

impl HandlerSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::const_empty(),
        }
    }

    /// Register a new handler, replacing any previous registration.
    ///
    /// Known hazard, preserved from the original design: requests already
    /// dispatched to the replaced handler keep waiting under their
    /// identifiers. Anything may still deliver for them; otherwise they
    /// time out.
    pub fn register(&self) -> RequestReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        if self.current.swap(Some(Arc::new(sender))).is_some() {
            debug!("handler registration replaced");
        }
        receiver
    }

    /// Remove the current registration, if any.
    pub fn clear(&self) {
        self.current.store(None);
    }

    /// Whether a handler is currently registered.
    pub fn is_registered(&self) -> bool {
        self.current.load().is_some()
    }

    /// Send a descriptor to the registered handler, fire-and-forget.
    pub fn dispatch(&self, descriptor: RequestDescriptor) -> Result<(), NoHandler> {
        let Some(sender) = self.current.load_full() else {
            return Err(NoHandler);
        };
        if sender.send(descriptor).is_err() {
            debug!("handler receiver dropped, clearing registration");
            // Clear only if nothing re-registered in the meantime.
            self.current.rcu(|current| match current {
                Some(existing) if Arc::ptr_eq(existing, &sender) => None,
                other => other.clone(),
            });
            return Err(NoHandler);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::types::RequestId;

    fn descriptor(path: &str) -> RequestDescriptor {
        RequestDescriptor {
            id: RequestId::new(),
            method: "GET".to_string(),
            path: path.to_string(),
            headers: Default::default(),
            query: Default::default(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_without_handler_fails_fast() {
        let slot = HandlerSlot::new();
        assert!(!slot.is_registered());
        assert_eq!(slot.dispatch(descriptor("/")), Err(NoHandler));
    }

    #[tokio::test]
    async fn test_registered_handler_receives_dispatch() {
        let slot = HandlerSlot::new();
        let mut requests = slot.register();

        slot.dispatch(descriptor("/status")).unwrap();
        let received = requests.recv().await.unwrap();
        assert_eq!(received.path, "/status");
    }

    #[tokio::test]
    async fn test_registration_replaces_previous() {
        let slot = HandlerSlot::new();
        let mut old = slot.register();
        let mut new = slot.register();

        slot.dispatch(descriptor("/after")).unwrap();
        assert_eq!(new.recv().await.unwrap().path, "/after");
        // The replaced handler's stream ends.
        assert!(old.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_receiver_clears_registration() {
        let slot = HandlerSlot::new();
        drop(slot.register());

        assert_eq!(slot.dispatch(descriptor("/")), Err(NoHandler));
        assert!(!slot.is_registered());
    }

    #[tokio::test]
    async fn test_clear_unregisters() {
        let slot = HandlerSlot::new();
        let _requests = slot.register();
        slot.clear();
        assert_eq!(slot.dispatch(descriptor("/")), Err(NoHandler));
    }
}
