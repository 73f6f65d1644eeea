//! A minimal observable value with subscription teardown.
//!
//! The form, throttle and token flow all expose state through this primitive
//! instead of any UI-lifecycle-bound mechanism: a value that can be read at
//! any time, subscribed to for change notifications, and closed when its
//! owner is disposed. After `close()` the value stops emitting; subscribers
//! are dropped and later `set` calls are ignored.
//!
//! Notifications fire only on actual changes (`PartialEq` inequality), in
//! subscription order, on the caller's thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Box<dyn Fn(&T) + Send>;

struct Inner<T> {
    value: Mutex<T>,
    subscribers: Mutex<Vec<(u64, Callback<T>)>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// A shareable observable value.
///
/// Clones share the same underlying state; observers registered through any
/// clone see every change.
pub struct ObservableValue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + Send + 'static> ObservableValue<T> {
    /// Creates an observable holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: Mutex::new(initial),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// A clone of the current value.
    pub fn get(&self) -> T {
        self.inner
            .value
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replaces the value, notifying subscribers when it actually changed.
    ///
    /// No-op transitions (new value equal to the old) do not notify. After
    /// [`ObservableValue::close`] this does nothing at all.
    pub fn set(&self, value: T) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        {
            let mut current = self
                .inner
                .value
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if *current == value {
                return;
            }
            *current = value.clone();
        }
        let subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        for (_, callback) in subscribers.iter() {
            callback(&value);
        }
    }

    /// Registers a change observer.
    ///
    /// The observer fires on every subsequent change until the returned
    /// [`Subscription`] is dropped (or [`Subscription::detach`]ed) or the
    /// observable is closed. It does not fire for the current value.
    pub fn subscribe(&self, observer: impl Fn(&T) + Send + 'static) -> Subscription {
        if self.inner.closed.load(Ordering::Acquire) {
            return Subscription { cancel: None };
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Box::new(observer)));

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .subscribers
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .retain(|(sub_id, _)| *sub_id != id);
                }
            })),
        }
    }

    /// Stops all future emissions and drops every subscriber.
    ///
    /// Idempotent. The last value remains readable through
    /// [`ObservableValue::get`].
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// True once [`ObservableValue::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

/// RAII handle for an observer registration; dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Unsubscribes immediately.
    pub fn detach(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_get_set() {
        let value = ObservableValue::new(1);
        assert_eq!(value.get(), 1);
        value.set(2);
        assert_eq!(value.get(), 2);
    }

    #[test]
    fn test_subscribers_notified_on_change() {
        let value = ObservableValue::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let _sub = value.subscribe(move |v| seen2.lock().unwrap().push(*v));

        value.set(1);
        value.set(2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_no_notification_on_noop_transition() {
        let value = ObservableValue::new(1);
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);
        let _sub = value.subscribe(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });

        value.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        value.set(2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let value = ObservableValue::new(0);
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);
        let sub = value.subscribe(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });

        value.set(1);
        drop(sub);
        value.set(2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_stops_emissions() {
        let value = ObservableValue::new(0);
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);
        let _sub = value.subscribe(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });

        value.close();
        value.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        // Last value stays readable
        assert_eq!(value.get(), 0);
        assert!(value.is_closed());
    }

    #[test]
    fn test_subscribe_after_close_is_inert() {
        let value = ObservableValue::new(0);
        value.close();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);
        let sub = value.subscribe(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        value.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        sub.detach();
    }

    #[test]
    fn test_clones_share_state() {
        let value = ObservableValue::new(0);
        let other = value.clone();
        value.set(5);
        assert_eq!(other.get(), 5);
    }
}
