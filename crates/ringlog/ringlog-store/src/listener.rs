//! Copy-on-write registry of message handlers.
//!
//! Registration clones the current handler list, appends, and swaps the new
//! list in atomically. The writer's fan-out only loads the current snapshot,
//! so it never locks or allocates, and a snapshot is never mutated in place.

use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::debug;

/// A message handler: called with the payload and its sequence number.
///
/// Handlers run synchronously on the writer thread. They must be fast and
/// must not fail: a panic propagates out of the `insert` that triggered it.
pub type Handler = Arc<dyn Fn(&[u8], i64) + Send + Sync>;

pub struct ListenerRegistry {
    handlers: ArcSwap<Vec<Handler>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Appends `handler`. Safe to call from any thread at any time; the
    /// handler sees only messages inserted after this returns.
    pub fn register<F>(&self, handler: F)
    where
        F: Fn(&[u8], i64) + Send + Sync + 'static,
    {
        self.register_arc(Arc::new(handler));
    }

    pub fn register_arc(&self, handler: Handler) {
        let prev = self.handlers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&handler));
            next
        });
        debug!(handlers = prev.len() + 1, "registered message handler");
    }

    /// Calls every handler, in registration order.
    #[inline]
    pub fn notify(&self, payload: &[u8], sequence: i64) {
        let snapshot = self.handlers.load();
        for handler in snapshot.iter() {
            handler(payload, sequence);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn notifies_in_registration_order() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for id in 1..=3 {
            let calls = Arc::clone(&calls);
            registry.register(move |payload: &[u8], seq| {
                calls.lock().unwrap().push((id, payload.to_vec(), seq));
            });
        }
        registry.notify(b"m", 9);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![(1, b"m".to_vec(), 9), (2, b"m".to_vec(), 9), (3, b"m".to_vec(), 9)]
        );
    }

    #[test]
    fn duplicates_are_kept() {
        let registry = ListenerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let handler: Handler = {
            let count = Arc::clone(&count);
            Arc::new(move |_: &[u8], _: i64| {
                count.fetch_add(1, Ordering::Relaxed);
            })
        };
        registry.register_arc(Arc::clone(&handler));
        registry.register_arc(handler);

        registry.notify(b"", 0);
        assert_eq!(registry.len(), 2);
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn concurrent_registration_loses_nothing() {
        let registry = Arc::new(ListenerRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        registry.register(|_: &[u8], _| {});
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(registry.len(), 400);
    }

    #[test]
    fn empty_registry_is_a_no_op() {
        let registry = ListenerRegistry::default();
        assert!(registry.is_empty());
        registry.notify(b"ignored", 1);
    }
}
