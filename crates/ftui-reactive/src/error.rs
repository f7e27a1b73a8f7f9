#![forbid(unsafe_code)]

//! Error taxonomy for the notification engine.
//!
//! | Error | Raised by | Propagation |
//! |-------|-----------|-------------|
//! | [`DisposedError`] | `add_listener`, `subscribe`, `mutate` on a disposed observable | Returned to the caller |
//! | [`ListenerFailure`] | A listener panicking or returning `Err` during `notify()` | Logged + counted in [`NotifyReport`](crate::NotifyReport), never returned |
//! | [`MembershipFailure`] | One unusable member of a [`ListenerSet`](crate::ListenerSet) batch | Returned per element, batch completes |
//! | [`BindingError`] | Lifecycle calls made in the wrong [`BindingState`] | Returned to the caller |
//! | [`CompletionError`] | Completing a [`OneShot`](crate::OneShot) twice | Returned to the caller |
//!
//! `remove_listener` and `notify` never fail: removal after disposal is an
//! expected race during teardown.

use std::fmt;

use crate::binding::BindingState;
use crate::observable::ObservableId;

/// An operation that requires a live observable was attempted after
/// [`dispose()`](crate::Observable::dispose).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisposedError {
    /// The disposed observable.
    pub observable: ObservableId,
    /// Name of the rejected operation (e.g. `"add_listener"`).
    pub operation: &'static str,
}

impl fmt::Display for DisposedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on disposed observable {}",
            self.operation, self.observable
        )
    }
}

impl std::error::Error for DisposedError {}

/// How a listener failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The callback panicked; the panic was caught at the listener boundary.
    Panicked,
    /// A fallible callback returned `Err`.
    Returned,
}

/// A single listener failing during a notification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    /// Panic or error return.
    pub kind: FailureKind,
    /// Panic payload or error message.
    pub message: String,
}

impl ListenerFailure {
    pub(crate) fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Panicked,
            message: message.into(),
        }
    }

    pub(crate) fn returned(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Returned,
            message: message.into(),
        }
    }
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Panicked => write!(f, "listener panicked: {}", self.message),
            FailureKind::Returned => write!(f, "listener failed: {}", self.message),
        }
    }
}

impl std::error::Error for ListenerFailure {}

/// One member of a batch operation could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipFailure {
    /// Position of the member in the set at the time of the batch.
    pub index: usize,
    /// The unusable member.
    pub observable: ObservableId,
    /// Why the member was rejected.
    pub source: DisposedError,
}

impl fmt::Display for MembershipFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member #{} unusable: {}", self.index, self.source)
    }
}

impl std::error::Error for MembershipFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A [`BindingNode`](crate::BindingNode) lifecycle call made out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingError {
    /// `operation` is not valid while the node is in `state`.
    InvalidTransition {
        operation: &'static str,
        state: BindingState,
    },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { operation, state } => {
                write!(f, "cannot {operation} a binding node that is {state}")
            }
        }
    }
}

impl std::error::Error for BindingError {}

/// Errors from [`OneShot::complete`](crate::OneShot::complete).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionError {
    /// The one-shot already left the pending state.
    AlreadyCompleted,
    /// The underlying observable was disposed.
    Disposed(DisposedError),
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyCompleted => write!(f, "one-shot result already completed"),
            Self::Disposed(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CompletionError {}

impl From<DisposedError> for CompletionError {
    fn from(err: DisposedError) -> Self {
        Self::Disposed(err)
    }
}
