#![forbid(unsafe_code)]

//! Listener lifecycle and mutation notification for FrankenTUI views.
//!
//! This crate connects mutable observable state to render-tree nodes so a
//! view re-renders whenever anything it depends on changes:
//!
//! - [`Observable`]: a listener registry with ordered, fault-isolated
//!   notification and explicit disposal.
//! - [`ValueObservable`]: an `Observable` holding a value, with the
//!   [`mutate`](ValueObservable::mutate) gate (set, notify, optionally roll
//!   back).
//! - [`ListenerSet`]: a group of observables kept subscribed to one shared
//!   listener, with identity-based membership diffing.
//! - [`BindingNode`]: a render-tree node that owns its subscriptions across
//!   attach, reconfigure and detach, and requests renders from the host.
//! - [`OneShot`]: a single-notification observable for asynchronous results.
//!
//! # Architecture
//!
//! Everything is single-threaded: handles are `Rc<RefCell<..>>` and `!Send`.
//! Notification is synchronous on the caller's stack. There is no background
//! work and no suspension point.
//!
//! # Invariants
//!
//! 1. Listeners fire in registration order, once per registration, per pass.
//! 2. A failing listener never stops the rest of its pass and never
//!    propagates to the caller of `notify()`.
//! 3. An attached `BindingNode` is subscribed to exactly its declared
//!    dependencies.
//! 4. Detaching is idempotent and always safe.
//!
//! # Known limitation
//!
//! A listener that mutates the observable it is listening to recurses
//! without bound. No cycle detection is attempted.
//!
//! # Feature Flags
//!
//! - `tracing`: debug spans around notification passes and node renders.
//!   Warnings for listener failures are emitted regardless.

pub mod binding;
pub mod config;
pub mod error;
pub mod host;
pub mod listener;
pub mod listener_set;
pub mod observable;
pub mod oneshot;
pub mod outcome;
pub mod value;

pub use binding::{BindingNode, BindingState, Dependency, bind, bind_value};
pub use config::{FailureHook, MutateOptions, ObservableConfig};
pub use error::{
    BindingError, CompletionError, DisposedError, FailureKind, ListenerFailure, MembershipFailure,
};
pub use host::{FrameScheduler, NodeId, NodeLifecycle, RenderRequester};
pub use listener::Listener;
pub use listener_set::ListenerSet;
pub use observable::{NotifyReport, Observable, ObservableId, Subscription};
pub use oneshot::{OneShot, Snapshot, SnapshotState, bind_snapshot};
pub use outcome::{BatchOutcome, for_each_member};
pub use value::ValueObservable;
