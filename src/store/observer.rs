//! Observers notified when cached data changes

use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Anything that wants to re-render when a path it read gets new data
pub trait Observer: Send + Sync {
    /// Called (on a later task, never inline) after `path` was refreshed
    fn notify(&self, path: &str);
}

impl<F> Observer for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, path: &str) {
        self(path)
    }
}

/// An observer with an identity and its own subscription list
///
/// Clones share identity and subscriptions. A UI binding keeps one
/// `Subscriber` for its lifetime, unsubscribes it before each render pass
/// and on teardown.
#[derive(Clone)]
pub struct Subscriber {
    inner: Arc<SubscriberInner>,
}

struct SubscriberInner {
    id: Uuid,
    observer: Box<dyn Observer>,
    subscriptions: Mutex<Vec<String>>,
}

impl Subscriber {
    /// Wrap an observer
    pub fn new(observer: impl Observer + 'static) -> Self {
        Self {
            inner: Arc::new(SubscriberInner {
                id: Uuid::new_v4(),
                observer: Box::new(observer),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Subscriber that ignores notifications
    pub fn detached() -> Self {
        Self::new(|_: &str| {})
    }

    /// Paths this subscriber currently observes
    pub fn subscriptions(&self) -> Vec<String> {
        self.lock_subscriptions().clone()
    }

    pub(crate) fn notify(&self, path: &str) {
        self.inner.observer.notify(path);
    }

    pub(crate) fn record(&self, path: &str) {
        self.lock_subscriptions().push(path.to_string());
    }

    pub(crate) fn take_subscriptions(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock_subscriptions())
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.inner.id)
            .field("subscriptions", &self.subscriptions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn closure_observer() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = Subscriber::new(move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.notify("a");
        sub.notify("b");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clones_share_identity() {
        let sub = Subscriber::detached();
        let other = sub.clone();
        assert_eq!(sub, other);
        assert_ne!(sub, Subscriber::detached());

        other.record("x");
        assert_eq!(sub.subscriptions(), vec!["x".to_string()]);
        assert_eq!(sub.take_subscriptions(), vec!["x".to_string()]);
        assert!(other.subscriptions().is_empty());
    }
}
