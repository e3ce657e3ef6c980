//! Node context injection for multi-node logging
//!
//! A simulation runs every node in one process. This module keeps the
//! identity of the node currently handling an event in thread-local
//! storage, so spans opened inside that scope can be tagged with it.

use std::cell::RefCell;

use ferry_core::PeerIdentity;
use uuid::Uuid;

/// Node context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq)]
pub struct NodeContextData {
    /// The node's identity as a short string
    pub node_id: String,
    /// Unique id of the run this node belongs to
    pub instance_id: Uuid,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// Creating the guard sets the node context for the current thread.
/// Dropping it restores whatever context was active before.
///
/// # Example
///
/// ```ignore
/// use ferry_logging::NodeContextGuard;
/// use ferry_core::HostId;
///
/// let _guard = NodeContextGuard::new(&HostId(3));
///
/// // Spans opened in this scope carry node_id = "n3"
/// let _span = tracing::info_span!("contact_up").entered();
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Set the node context with a fresh instance id
    pub fn new<I: PeerIdentity>(identity: &I) -> Self {
        Self::with_instance_id(identity, Uuid::new_v4())
    }

    /// Set the node context with a specific instance id
    ///
    /// A simulation passes its run id here so every node's logs can be
    /// grouped by run.
    pub fn with_instance_id<I: PeerIdentity>(identity: &I, instance_id: Uuid) -> Self {
        let previous = Self::current();
        let new_ctx = NodeContextData {
            node_id: identity.short_id(),
            instance_id,
        };
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = Some(new_ctx));
        Self { previous }
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current node id (if set)
    pub fn current_node_id() -> Option<String> {
        Self::current().map(|ctx| ctx.node_id)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Convenience macro to run a block inside a node context
///
/// # Example
///
/// ```ignore
/// with_node_context!(&node_id, {
///     tracing::info!("Contact up");
/// });
/// ```
#[macro_export]
macro_rules! with_node_context {
    ($identity:expr, $body:block) => {{
        let _guard = $crate::context::NodeContextGuard::new($identity);
        $body
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::HostId;

    #[test]
    fn test_node_context_guard() {
        assert!(NodeContextGuard::current().is_none());

        {
            let _guard = NodeContextGuard::new(&HostId(1));
            let ctx = NodeContextGuard::current().unwrap();
            assert_eq!(ctx.node_id, "n1");
        }

        assert!(NodeContextGuard::current().is_none());
    }

    #[test]
    fn test_nested_contexts_restore() {
        let run = Uuid::new_v4();
        {
            let _a = NodeContextGuard::with_instance_id(&HostId(1), run);
            {
                let _b = NodeContextGuard::with_instance_id(&HostId(2), run);
                assert_eq!(NodeContextGuard::current_node_id(), Some("n2".to_string()));
            }
            let ctx = NodeContextGuard::current().unwrap();
            assert_eq!(ctx.node_id, "n1");
            assert_eq!(ctx.instance_id, run);
        }
        assert!(NodeContextGuard::current_node_id().is_none());
    }

    #[test]
    fn test_macro_scopes_context() {
        let seen = crate::with_node_context!(&HostId(7), { NodeContextGuard::current_node_id() });
        assert_eq!(seen, Some("n7".to_string()));
        assert!(NodeContextGuard::current().is_none());
    }
}
