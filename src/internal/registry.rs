use std::sync::Arc;

use tokio::sync::RwLock;

use crate::Handler;

/// Ordered handler set of one event.
///
/// Copy-on-write: writers build a new sequence and swap it in under the
/// write lock, readers clone the current `Arc` under the read lock. A
/// snapshot taken by the dispatch loop is never affected by later writes.
#[derive(Debug)]
pub(crate) struct HandlerRegistry {
    handlers: RwLock<Arc<[Handler]>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Append handlers, keeping registration order.
    pub async fn add(&self, added: impl IntoIterator<Item = Handler>) {
        let mut added = added.into_iter().peekable();
        if added.peek().is_none() {
            return;
        }
        let mut handlers = self.handlers.write().await;
        let mut next = handlers.to_vec();
        next.extend(added);
        *handlers = Arc::from(next);
    }

    /// Remove every entry sharing `handler`'s identity. No-op when absent.
    pub async fn remove(&self, handler: &Handler) -> usize {
        let mut handlers = self.handlers.write().await;
        let before = handlers.len();
        if !handlers.contains(handler) {
            return 0;
        }
        let next: Vec<Handler> = handlers.iter().filter(|h| h != &handler).cloned().collect();
        *handlers = Arc::from(next);
        before - handlers.len()
    }

    pub async fn clear(&self) {
        *self.handlers.write().await = Arc::from(Vec::new());
    }

    pub async fn snapshot(&self) -> Arc<[Handler]> {
        self.handlers.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.handlers.read().await.len()
    }
}
