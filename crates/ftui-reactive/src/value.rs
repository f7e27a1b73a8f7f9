#![forbid(unsafe_code)]

//! Value-holding observables and the transactional mutation gate.
//!
//! [`ValueObservable<T>`] pairs an [`Observable`] with a current value.
//! [`mutate`](ValueObservable::mutate) is the single mutation primitive; the
//! other setters are thin wrappers over it.
//!
//! # Mutation sequencing
//!
//! For `mutate(Some(v), options)`:
//!
//! 1. The prior value is captured and `v` is assigned.
//! 2. If `options.notify`, every listener runs and reads `v`.
//! 3. If `!options.persist`, the prior value is restored after the last
//!    listener returns.
//!
//! Listeners therefore always observe the transient value, even for an
//! ephemeral pulse that leaves no durable change. A listener that assigns the
//! value during an ephemeral pass has its write overwritten by the restore.
//!
//! `mutate(None, ..)` changes nothing and only notifies ("force re-render").
//! Because absence is `None` rather than a sentinel, `ValueObservable<Option<U>>`
//! can still be set to `None` with `mutate(Some(None), ..)`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::{MutateOptions, ObservableConfig};
use crate::error::DisposedError;
use crate::listener::Listener;
use crate::observable::{NotifyReport, Observable, ObservableId, Subscription};

struct ValueSlot<T> {
    value: T,
    version: u64,
}

/// An [`Observable`] holding a current value of type `T`.
///
/// Cloning creates a new handle to the **same** value and listeners.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 per assignment, including the
///    restore step of an ephemeral mutation.
/// 2. No equality check is made: assigning an equal value still notifies.
pub struct ValueObservable<T> {
    notifier: Observable,
    slot: Rc<RefCell<ValueSlot<T>>>,
}

impl<T> Clone for ValueObservable<T> {
    fn clone(&self) -> Self {
        Self {
            notifier: self.notifier.clone(),
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> ValueObservable<T> {
    /// Create an observable with the given initial value.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_config(value, ObservableConfig::default())
    }

    /// Create an observable with the given initial value and configuration.
    #[must_use]
    pub fn with_config(value: T, config: ObservableConfig) -> Self {
        Self {
            notifier: Observable::with_config(config),
            slot: Rc::new(RefCell::new(ValueSlot { value, version: 0 })),
        }
    }

    /// The underlying listener registry.
    #[must_use]
    pub fn observable(&self) -> &Observable {
        &self.notifier
    }

    #[must_use]
    pub fn id(&self) -> ObservableId {
        self.notifier.id()
    }

    /// Whether `self` and `other` are handles to the same observable.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.notifier.ptr_eq(&other.notifier)
    }

    /// Borrow the current value.
    ///
    /// # Panics
    ///
    /// Panics if `f` mutates this observable (RefCell borrow rules).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.slot.borrow().value)
    }

    /// Assignment counter.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.slot.borrow().version
    }

    /// The mutation gate.
    ///
    /// - `None`: notify only (when `options.notify`), value untouched.
    /// - `Some(v)`: assign, notify, then restore the prior value unless
    ///   `options.persist`.
    ///
    /// Returns `self` for chaining.
    ///
    /// # Errors
    ///
    /// [`DisposedError`] if the observable has been disposed. The value is
    /// left unchanged.
    pub fn mutate(&self, value: Option<T>, options: MutateOptions) -> Result<&Self, DisposedError> {
        if self.notifier.is_disposed() {
            return Err(DisposedError {
                observable: self.notifier.id(),
                operation: "mutate",
            });
        }

        let Some(value) = value else {
            if options.notify {
                self.notifier.notify();
            }
            return Ok(self);
        };

        let prior = self.assign(value);
        if options.notify {
            self.notifier.notify();
        }
        if !options.persist {
            self.assign(prior);
        }
        Ok(self)
    }

    /// Durable assignment with notification.
    ///
    /// # Errors
    ///
    /// [`DisposedError`] if the observable has been disposed.
    pub fn set(&self, value: T) -> Result<&Self, DisposedError> {
        self.mutate(Some(value), MutateOptions::durable())
    }

    /// Ephemeral assignment: listeners see `value`, then the prior value is
    /// restored.
    ///
    /// # Errors
    ///
    /// [`DisposedError`] if the observable has been disposed.
    pub fn pulse(&self, value: T) -> Result<&Self, DisposedError> {
        self.mutate(Some(value), MutateOptions::ephemeral())
    }

    /// Notify without changing the value.
    ///
    /// # Errors
    ///
    /// [`DisposedError`] if the observable has been disposed.
    pub fn refresh(&self) -> Result<&Self, DisposedError> {
        self.mutate(None, MutateOptions::durable())
    }

    /// Modify the value in place, then notify.
    ///
    /// # Errors
    ///
    /// [`DisposedError`] if the observable has been disposed; `f` is not
    /// called.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<&Self, DisposedError> {
        if self.notifier.is_disposed() {
            return Err(DisposedError {
                observable: self.notifier.id(),
                operation: "update",
            });
        }
        {
            let mut slot = self.slot.borrow_mut();
            f(&mut slot.value);
            slot.version += 1;
        }
        self.notifier.notify();
        Ok(self)
    }

    pub fn add_listener(&self, listener: Listener) -> Result<(), DisposedError> {
        self.notifier.add_listener(listener)
    }

    pub fn remove_listener(&self, listener: &Listener) -> bool {
        self.notifier.remove_listener(listener)
    }

    /// See [`Observable::subscribe`].
    ///
    /// # Errors
    ///
    /// [`DisposedError`] if the observable has been disposed.
    pub fn subscribe(&self, listener: Listener) -> Result<Subscription, DisposedError> {
        self.notifier.subscribe(listener)
    }

    pub fn notify(&self) -> NotifyReport {
        self.notifier.notify()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.notifier.listener_count()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.notifier.is_disposed()
    }

    /// Dispose the listener registry. The last value stays readable.
    pub fn dispose(&self) {
        self.notifier.dispose();
    }

    fn assign(&self, value: T) -> T {
        let mut slot = self.slot.borrow_mut();
        slot.version += 1;
        std::mem::replace(&mut slot.value, value)
    }
}

impl<T: Clone> ValueObservable<T> {
    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.slot.borrow().value.clone()
    }
}

impl<T: Default> Default for ValueObservable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> AsRef<Observable> for ValueObservable<T> {
    fn as_ref(&self) -> &Observable {
        &self.notifier
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueObservable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.borrow();
        f.debug_struct("ValueObservable")
            .field("id", &self.notifier.id())
            .field("value", &slot.value)
            .field("version", &slot.version)
            .field("listener_count", &self.notifier.listener_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
