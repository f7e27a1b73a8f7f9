#![forbid(unsafe_code)]

//! One-shot results as observables.
//!
//! Asynchronous glue (futures, streams) lives outside this crate. What it
//! needs from here is a three-state [`Snapshot`] and an observable that
//! notifies exactly once, when the result arrives: [`OneShot`].
//!
//! ```
//! use std::rc::Rc;
//! use ftui_reactive::{FrameScheduler, OneShot, bind_snapshot};
//!
//! let result: OneShot<u32, String> = OneShot::new();
//! let mut view = bind_snapshot(
//!     &result,
//!     || "loading".to_string(),
//!     |err| format!("failed: {err}"),
//!     |n| format!("{n} rows"),
//! );
//! view.attach(Rc::new(FrameScheduler::new())).unwrap();
//! assert_eq!(view.render(), "loading");
//!
//! result.complete(Ok(3)).unwrap();
//! assert_eq!(view.render(), "3 rows");
//! ```

use std::rc::Rc;

use crate::binding::{BindingNode, Dependency, bind};
use crate::error::CompletionError;
use crate::observable::Observable;
use crate::value::ValueObservable;

/// State tag of a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    Pending,
    Error,
    Ready,
}

/// The three observable states of an asynchronous result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot<T, E> {
    Pending,
    Error(E),
    Ready(T),
}

impl<T, E> Snapshot<T, E> {
    #[must_use]
    pub fn state(&self) -> SnapshotState {
        match self {
            Self::Pending => SnapshotState::Pending,
            Self::Error(_) => SnapshotState::Error,
            Self::Ready(_) => SnapshotState::Ready,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Pick the callback for the current state.
    pub fn select<R>(
        &self,
        pending: impl FnOnce() -> R,
        error: impl FnOnce(&E) -> R,
        ready: impl FnOnce(&T) -> R,
    ) -> R {
        match self {
            Self::Pending => pending(),
            Self::Error(err) => error(err),
            Self::Ready(value) => ready(value),
        }
    }
}

impl<T, E> From<Result<T, E>> for Snapshot<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(err) => Self::Error(err),
        }
    }
}

/// An observable that leaves `Pending` once and notifies once.
pub struct OneShot<T, E> {
    cell: ValueObservable<Snapshot<T, E>>,
}

impl<T, E> Clone for OneShot<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T, E> OneShot<T, E> {
    /// A pending result.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: ValueObservable::new(Snapshot::Pending),
        }
    }

    /// Deliver the result and notify listeners.
    ///
    /// # Errors
    ///
    /// - [`CompletionError::AlreadyCompleted`] if a result was already
    ///   delivered; listeners are not notified again.
    /// - [`CompletionError::Disposed`] if the observable was disposed.
    pub fn complete(&self, result: Result<T, E>) -> Result<(), CompletionError> {
        if !self.is_pending() {
            return Err(CompletionError::AlreadyCompleted);
        }
        self.cell.set(result.into())?;
        Ok(())
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.cell.with(Snapshot::is_pending)
    }

    /// Borrow the current snapshot.
    pub fn with<R>(&self, f: impl FnOnce(&Snapshot<T, E>) -> R) -> R {
        self.cell.with(f)
    }

    #[must_use]
    pub fn observable(&self) -> &Observable {
        self.cell.observable()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.cell.ptr_eq(&other.cell)
    }

    pub fn dispose(&self) {
        self.cell.dispose();
    }
}

impl<T: Clone, E: Clone> OneShot<T, E> {
    /// Clone of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T, E> {
        self.cell.get()
    }
}

impl<T, E> Default for OneShot<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Dependency for OneShot<T, E> {
    fn members(&self) -> Rc<[Observable]> {
        Rc::new([self.observable().clone()])
    }

    fn same_ref(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T, E> AsRef<Observable> for OneShot<T, E> {
    fn as_ref(&self) -> &Observable {
        self.observable()
    }
}

/// Bind a node whose render callback is chosen by the snapshot state.
pub fn bind_snapshot<T: 'static, E: 'static, R>(
    source: &OneShot<T, E>,
    pending: impl Fn() -> R + 'static,
    error: impl Fn(&E) -> R + 'static,
    ready: impl Fn(&T) -> R + 'static,
) -> BindingNode<OneShot<T, E>, R> {
    bind(source.clone(), move |shot: &OneShot<T, E>| {
        shot.with(|snapshot| snapshot.select(&pending, &error, &ready))
    })
}
