#![forbid(unsafe_code)]

//! Listener registry with change notification and explicit disposal.
//!
//! # Design
//!
//! [`Observable`] is a handle to shared, reference-counted storage
//! (`Rc<RefCell<..>>`). Cloning a handle does not create a new observable;
//! identity is the inner allocation ([`Observable::ptr_eq`]).
//!
//! Listeners are kept as an ordered multiset: registering the same
//! [`Listener`] twice means it runs twice per notification, and
//! [`remove_listener`](Observable::remove_listener) removes one registration
//! at a time.
//!
//! # Invariants
//!
//! 1. Listeners run in registration order, once per registration, per pass.
//! 2. A pass runs over the listeners registered when it started. Listeners
//!    added or removed by a callback take effect on the next pass.
//! 3. A failing listener is contained; the rest of the pass still runs.
//! 4. After [`dispose()`](Observable::dispose) the observable is inert:
//!    `add_listener` fails, `remove_listener` and `notify` are no-ops.
//!
//! # Failure Modes
//!
//! - **Self-notifying loop**: a listener that notifies its own observable
//!   recurses without bound. No cycle detection is attempted.
//! - **Disposal mid-pass**: a listener that disposes the observable stops the
//!   remaining listeners of that pass.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::ObservableConfig;
use crate::error::{DisposedError, ListenerFailure};
use crate::listener::Listener;

/// Process-unique identity of an [`Observable`].
///
/// Used for membership diffing and as a log field. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservableId(u64);

impl ObservableId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of one notification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Listeners that ran to completion.
    pub delivered: usize,
    /// Listeners that panicked or returned `Err`, in invocation order.
    pub failures: Vec<ListenerFailure>,
}

impl NotifyReport {
    /// Total listeners invoked.
    #[must_use]
    pub fn invoked(&self) -> usize {
        self.delivered + self.failures.len()
    }

    /// Whether every invoked listener succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct ObservableInner {
    id: ObservableId,
    listeners: Vec<Listener>,
    disposed: bool,
    config: ObservableConfig,
}

/// A unit of state that can be listened to.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use ftui_reactive::{Listener, Observable};
///
/// let obs = Observable::new();
/// let hits = Rc::new(Cell::new(0));
/// let h = Rc::clone(&hits);
/// let listener = Listener::new(move || h.set(h.get() + 1));
///
/// obs.add_listener(listener.clone()).unwrap();
/// obs.notify();
/// obs.remove_listener(&listener);
/// obs.notify();
/// assert_eq!(hits.get(), 1);
/// ```
#[derive(Clone)]
pub struct Observable {
    inner: Rc<RefCell<ObservableInner>>,
}

impl Observable {
    /// Create a live observable with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ObservableConfig::default())
    }

    /// Create a live observable with the given configuration.
    #[must_use]
    pub fn with_config(config: ObservableConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                id: ObservableId::next(),
                listeners: Vec::new(),
                disposed: false,
                config,
            })),
        }
    }

    /// Identity of this observable.
    #[must_use]
    pub fn id(&self) -> ObservableId {
        self.inner.borrow().id
    }

    /// Configured label, if any.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.inner.borrow().config.label.clone()
    }

    /// Whether `self` and `other` are handles to the same observable.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register `listener`. No uniqueness check is made.
    ///
    /// # Errors
    ///
    /// [`DisposedError`] if the observable has been disposed.
    pub fn add_listener(&self, listener: Listener) -> Result<(), DisposedError> {
        let mut inner = self.inner.borrow_mut();
        if inner.disposed {
            return Err(DisposedError {
                observable: inner.id,
                operation: "add_listener",
            });
        }
        inner.listeners.push(listener);
        Ok(())
    }

    /// Remove the first registration of `listener`.
    ///
    /// Returns `false` when the listener was not registered or the
    /// observable is disposed.
    pub fn remove_listener(&self, listener: &Listener) -> bool {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let index = inner.listeners.iter().position(|l| l.ptr_eq(listener));
            index.map(|index| inner.listeners.remove(index))
        };
        removed.is_some()
    }

    /// Register `listener` and return a guard that removes it on drop.
    ///
    /// # Errors
    ///
    /// [`DisposedError`] if the observable has been disposed.
    pub fn subscribe(&self, listener: Listener) -> Result<Subscription, DisposedError> {
        self.add_listener(listener.clone())?;
        Ok(Subscription {
            source: Rc::downgrade(&self.inner),
            listener: Some(listener),
        })
    }

    /// Number of registrations (duplicates counted).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Number of registrations of `listener`.
    #[must_use]
    pub fn registrations_of(&self, listener: &Listener) -> usize {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.ptr_eq(listener))
            .count()
    }

    /// Whether `listener` has at least one registration.
    #[must_use]
    pub fn has_listener(&self, listener: &Listener) -> bool {
        self.registrations_of(listener) > 0
    }

    /// Whether [`dispose()`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    /// Invoke every registered listener. A no-op on a disposed observable.
    pub fn notify(&self) -> NotifyReport {
        self.try_notify().unwrap_or_default()
    }

    /// Invoke every registered listener, reporting disposal.
    ///
    /// # Errors
    ///
    /// [`DisposedError`] if the observable has been disposed.
    pub fn try_notify(&self) -> Result<NotifyReport, DisposedError> {
        let (id, listeners) = {
            let inner = self.inner.borrow();
            if inner.disposed {
                return Err(DisposedError {
                    observable: inner.id,
                    operation: "notify",
                });
            }
            (inner.id, inner.listeners.clone())
        };

        #[cfg(feature = "tracing")]
        let _span =
            tracing::debug_span!("observable_notify", observable = %id, listeners = listeners.len())
                .entered();

        let mut report = NotifyReport::default();
        for listener in &listeners {
            if self.is_disposed() {
                break;
            }
            match listener.invoke() {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    self.report_failure(id, &failure);
                    report.failures.push(failure);
                }
            }
        }
        Ok(report)
    }

    /// Drop every listener and make the observable permanently inert.
    pub fn dispose(&self) {
        // Listeners are dropped after the borrow ends; a captured
        // `Subscription` may call back into this observable from its `Drop`.
        let (id, dropped) = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            (inner.id, std::mem::take(&mut inner.listeners))
        };
        tracing::trace!(observable = %id, listeners = dropped.len(), "observable disposed");
        drop(dropped);
    }

    fn report_failure(&self, id: ObservableId, failure: &ListenerFailure) {
        let hook = {
            let inner = self.inner.borrow();
            if inner.config.report_failures {
                tracing::warn!(
                    observable = %id,
                    label = ?inner.config.label,
                    kind = ?failure.kind,
                    "{failure}"
                );
            }
            inner.config.failure_hook.clone()
        };
        if let Some(hook) = hook {
            hook(id, failure);
        }
    }
}

impl Default for Observable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("id", &inner.id)
            .field("label", &inner.config.label)
            .field("listener_count", &inner.listeners.len())
            .field("disposed", &inner.disposed)
            .finish()
    }
}

impl AsRef<Observable> for Observable {
    fn as_ref(&self) -> &Observable {
        self
    }
}

/// RAII guard for one listener registration.
///
/// Dropping the guard removes the registration. The guard holds the
/// observable weakly, so it never keeps a dropped observable alive, and
/// dropping it after disposal is a no-op.
#[must_use = "dropping a Subscription immediately removes the listener"]
pub struct Subscription {
    source: Weak<RefCell<ObservableInner>>,
    listener: Option<Listener>,
}

impl Subscription {
    /// The registered listener.
    #[must_use]
    pub fn listener(&self) -> Option<&Listener> {
        self.listener.as_ref()
    }

    /// Remove the registration now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the registration for the lifetime of the observable.
    pub fn forget(mut self) {
        self.listener = None;
    }

    fn release(&mut self) {
        if let (Some(listener), Some(inner)) = (self.listener.take(), self.source.upgrade()) {
            Observable { inner }.remove_listener(&listener);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use std::cell::Cell;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> Listener {
        let log = Rc::clone(log);
        Listener::new(move || log.borrow_mut().push(name))
    }

    #[test]
    fn ids_are_unique() {
        let a = Observable::new();
        let b = Observable::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
    }

    #[test]
    fn clone_shares_identity() {
        let a = Observable::new();
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Observable::new()));
    }

    #[test]
    fn notify_runs_listeners_in_registration_order() {
        let obs = Observable::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["l1", "l2", "l3"] {
            obs.add_listener(recorder(&log, name)).unwrap();
        }

        let report = obs.notify();
        assert_eq!(*log.borrow(), vec!["l1", "l2", "l3"]);
        assert_eq!(report.delivered, 3);
        assert!(report.is_clean());
    }

    #[test]
    fn duplicate_registration_runs_twice() {
        let obs = Observable::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let listener = Listener::new(move || h.set(h.get() + 1));

        obs.add_listener(listener.clone()).unwrap();
        obs.add_listener(listener.clone()).unwrap();
        assert_eq!(obs.registrations_of(&listener), 2);

        obs.notify();
        assert_eq!(hits.get(), 2);

        assert!(obs.remove_listener(&listener));
        assert_eq!(obs.registrations_of(&listener), 1);
        obs.notify();
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn remove_missing_listener_is_noop() {
        let obs = Observable::new();
        assert!(!obs.remove_listener(&Listener::new(|| {})));
    }

    #[test]
    fn failing_listener_does_not_stop_pass() {
        let obs = Observable::with_config(ObservableConfig::new().report_failures(false));
        let log = Rc::new(RefCell::new(Vec::new()));
        obs.add_listener(recorder(&log, "l1")).unwrap();
        obs.add_listener(Listener::new(|| panic!("l2 exploded"))).unwrap();
        obs.add_listener(recorder(&log, "l3")).unwrap();

        let report = obs.notify();
        assert_eq!(*log.borrow(), vec!["l1", "l3"]);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Panicked);
        assert_eq!(report.invoked(), 3);

        // Still usable afterwards.
        let report = obs.notify();
        assert_eq!(report.delivered, 2);
    }

    #[test]
    fn failure_hook_receives_failures() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let obs = Observable::with_config(
            ObservableConfig::new()
                .report_failures(false)
                .on_failure(move |id, failure| s.borrow_mut().push((id, failure.clone()))),
        );
        obs.add_listener(Listener::fallible(|| Err::<(), _>("nope")))
            .unwrap();
        obs.notify();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, obs.id());
        assert_eq!(seen[0].1.message, "nope");
    }

    #[test]
    fn dispose_makes_observable_inert() {
        let obs = Observable::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let listener = Listener::new(move || h.set(h.get() + 1));
        obs.add_listener(listener.clone()).unwrap();

        obs.dispose();
        assert!(obs.is_disposed());
        assert_eq!(obs.listener_count(), 0);

        let err = obs.add_listener(listener.clone()).unwrap_err();
        assert_eq!(err.operation, "add_listener");
        assert_eq!(err.observable, obs.id());
        assert!(!obs.remove_listener(&listener));
        assert_eq!(obs.notify(), NotifyReport::default());
        assert!(obs.try_notify().is_err());
        assert_eq!(hits.get(), 0);

        // Second dispose is harmless.
        obs.dispose();
    }

    #[test]
    fn listener_added_during_pass_runs_next_pass() {
        let obs = Observable::new();
        let late_hits = Rc::new(Cell::new(0));
        let lh = Rc::clone(&late_hits);
        let late = Listener::new(move || lh.set(lh.get() + 1));

        let o = obs.clone();
        let added = Rc::new(Cell::new(false));
        let a = Rc::clone(&added);
        obs.add_listener(Listener::new(move || {
            if !a.replace(true) {
                o.add_listener(late.clone()).unwrap();
            }
        }))
        .unwrap();

        obs.notify();
        assert_eq!(late_hits.get(), 0);
        obs.notify();
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn dispose_mid_pass_stops_remaining_listeners() {
        let obs = Observable::new();
        let o = obs.clone();
        obs.add_listener(Listener::new(move || o.dispose())).unwrap();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        obs.add_listener(Listener::new(move || h.set(h.get() + 1)))
            .unwrap();

        let report = obs.notify();
        assert_eq!(report.delivered, 1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn subscription_drop_unsubscribes() {
        let obs = Observable::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = obs
            .subscribe(Listener::new(move || h.set(h.get() + 1)))
            .unwrap();

        obs.notify();
        drop(sub);
        obs.notify();
        assert_eq!(hits.get(), 1);
        assert_eq!(obs.listener_count(), 0);
    }

    #[test]
    fn subscription_removes_only_its_registration() {
        let obs = Observable::new();
        let listener = Listener::new(|| {});
        obs.add_listener(listener.clone()).unwrap();
        let sub = obs.subscribe(listener.clone()).unwrap();
        assert_eq!(obs.registrations_of(&listener), 2);
        sub.unsubscribe();
        assert_eq!(obs.registrations_of(&listener), 1);
    }

    #[test]
    fn subscription_outlives_observable() {
        let obs = Observable::new();
        let sub = obs.subscribe(Listener::new(|| {})).unwrap();
        drop(obs);
        drop(sub);
    }

    #[test]
    fn subscription_forget_keeps_listener() {
        let obs = Observable::new();
        obs.subscribe(Listener::new(|| {})).unwrap().forget();
        assert_eq!(obs.listener_count(), 1);
    }

    #[test]
    fn subscribe_on_disposed_fails() {
        let obs = Observable::new();
        obs.dispose();
        assert!(obs.subscribe(Listener::new(|| {})).is_err());
    }

    #[test]
    fn debug_format() {
        let obs = Observable::with_config(ObservableConfig::new().label("menu"));
        obs.add_listener(Listener::new(|| {})).unwrap();
        let debug = format!("{obs:?}");
        assert!(debug.contains("listener_count: 1"));
        assert!(debug.contains("menu"));
        assert!(debug.contains("disposed: false"));
    }
}
