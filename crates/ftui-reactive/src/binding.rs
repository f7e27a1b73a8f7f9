#![forbid(unsafe_code)]

//! Render-tree nodes bound to observable dependencies.
//!
//! A [`BindingNode`] connects a dependency (one observable, or a collection
//! of them) to a render function. While attached, a single node-owned
//! listener is registered on every observable the dependency resolves to;
//! any notification marks the node dirty and asks the host for a render.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use ftui_reactive::{FrameScheduler, ValueObservable, bind_value};
//!
//! let counter = ValueObservable::new(0);
//! let scheduler = Rc::new(FrameScheduler::new());
//!
//! let mut view = bind_value(&counter, |c| format!("Count: {c}"));
//! view.attach(scheduler.clone()).unwrap();
//!
//! counter.set(5).unwrap();
//! assert_eq!(scheduler.take_frame(), vec![view.id()]);
//! assert_eq!(view.render(), "Count: 5");
//!
//! view.detach();
//! counter.set(6).unwrap();
//! assert!(scheduler.take_frame().is_empty());
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Unattached --attach--> Attached --detach--> Detached (final)
//!     |                   |    ^
//!     |                   +----+ reconfigure
//!     +---------------detach---------------------^
//! ```
//!
//! # Invariants
//!
//! 1. While `Attached`, the node listener is registered exactly once per
//!    declared dependency member and nowhere else.
//! 2. `reconfigure` with a reference-identical dependency performs no
//!    subscribe or unsubscribe.
//! 3. `detach` is idempotent and safe before `attach` or after the
//!    observables were disposed. Dropping the node detaches it.
//! 4. Between two `render()` calls, any number of notifications produce one
//!    render request.
//!
//! # Failure Modes
//!
//! - Render function panic: propagates to the caller of `render()`.
//! - Requester panic: contained as a listener failure; the dirty flag is
//!   cleared so the next notification requests again.
//! - Disposed dependency at attach/reconfigure: reported in the returned
//!   [`BatchOutcome`], the node still transitions.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::BindingError;
use crate::host::{NodeId, RenderRequester};
use crate::listener::Listener;
use crate::listener_set::ListenerSet;
use crate::observable::Observable;
use crate::outcome::BatchOutcome;
use crate::value::ValueObservable;

// ---------------------------------------------------------------------------
// Dependency: what a node subscribes to
// ---------------------------------------------------------------------------

/// A reference to the observables a node depends on.
pub trait Dependency {
    /// The observables to subscribe to, in order.
    fn members(&self) -> Rc<[Observable]>;

    /// Whether `self` and `other` refer to the same underlying state.
    fn same_ref(&self, other: &Self) -> bool;
}

impl Dependency for Observable {
    fn members(&self) -> Rc<[Observable]> {
        Rc::new([self.clone()])
    }

    fn same_ref(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Dependency for ValueObservable<T> {
    fn members(&self) -> Rc<[Observable]> {
        Rc::new([self.observable().clone()])
    }

    fn same_ref(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Collections compare by the collection reference itself: two distinct
/// collections with the same members are a change.
impl Dependency for Rc<[Observable]> {
    fn members(&self) -> Rc<[Observable]> {
        Rc::clone(self)
    }

    fn same_ref(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

// ---------------------------------------------------------------------------
// BindingNode
// ---------------------------------------------------------------------------

/// Lifecycle state of a [`BindingNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Created, not yet subscribed.
    Unattached,
    /// Subscribed to the current dependency.
    Attached,
    /// Terminal; holds no subscriptions.
    Detached,
}

impl fmt::Display for BindingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unattached => "unattached",
            Self::Attached => "attached",
            Self::Detached => "detached",
        })
    }
}

type RequesterSlot = Rc<RefCell<Option<Rc<dyn RenderRequester>>>>;

/// Clears the dirty flag if a render request unwinds, so the next
/// notification asks again.
struct DirtyReset<'a> {
    dirty: &'a Cell<bool>,
    armed: bool,
}

impl Drop for DirtyReset<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.dirty.set(false);
        }
    }
}

/// A render-tree node that re-renders when its dependencies notify.
///
/// Created by [`bind`] or [`bind_value`].
pub struct BindingNode<D: Dependency, R> {
    id: NodeId,
    state: BindingState,
    dependency: D,
    render: Box<dyn Fn(&D) -> R>,
    subscriptions: ListenerSet,
    dirty: Rc<Cell<bool>>,
    requester: RequesterSlot,
}

/// Create an unattached node rendering `dependency` with `render`.
pub fn bind<D: Dependency, R>(dependency: D, render: impl Fn(&D) -> R + 'static) -> BindingNode<D, R> {
    BindingNode::new(dependency, Box::new(render))
}

/// Create an unattached node rendering the current value of `source`.
pub fn bind_value<T: 'static, R>(
    source: &ValueObservable<T>,
    render: impl Fn(&T) -> R + 'static,
) -> BindingNode<ValueObservable<T>, R> {
    bind(source.clone(), move |obs: &ValueObservable<T>| obs.with(|v| render(v)))
}

impl<D: Dependency, R> BindingNode<D, R> {
    fn new(dependency: D, render: Box<dyn Fn(&D) -> R>) -> Self {
        let id = NodeId::next();
        let dirty = Rc::new(Cell::new(false));
        let requester: RequesterSlot = Rc::new(RefCell::new(None));

        let listener = {
            let dirty = Rc::clone(&dirty);
            let requester = Rc::clone(&requester);
            Listener::new(move || {
                if dirty.replace(true) {
                    return;
                }
                let target = requester.borrow().clone();
                if let Some(target) = target {
                    let mut reset = DirtyReset {
                        dirty: &dirty,
                        armed: true,
                    };
                    target.request_render(id);
                    reset.armed = false;
                }
            })
        };

        Self {
            id,
            state: BindingState::Unattached,
            dependency,
            render,
            subscriptions: ListenerSet::new(listener),
            dirty,
            requester,
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> BindingState {
        self.state
    }

    /// The currently declared dependency.
    #[must_use]
    pub fn dependency(&self) -> &D {
        &self.dependency
    }

    /// The node-owned listener used for every subscription.
    #[must_use]
    pub fn listener(&self) -> &Listener {
        self.subscriptions.shared_listener()
    }

    /// Observables the node is currently subscribed to.
    #[must_use]
    pub fn subscribed(&self) -> &[Observable] {
        self.subscriptions.members()
    }

    /// Whether a notification arrived since the last `render()`.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Subscribe to the dependency and start forwarding render requests.
    ///
    /// # Errors
    ///
    /// [`BindingError::InvalidTransition`] unless the node is `Unattached`.
    pub fn attach(
        &mut self,
        requester: Rc<dyn RenderRequester>,
    ) -> Result<BatchOutcome<()>, BindingError> {
        if self.state != BindingState::Unattached {
            return Err(self.invalid("attach"));
        }
        *self.requester.borrow_mut() = Some(requester);
        let outcome = self.subscriptions.set_members(self.dependency.members());
        self.state = BindingState::Attached;
        tracing::trace!(
            node = %self.id,
            members = self.subscriptions.len(),
            failed = outcome.failure_count(),
            "binding attached"
        );
        Ok(outcome)
    }

    /// Rebind to `dependency`.
    ///
    /// A reference-identical dependency is a no-op. Otherwise members no
    /// longer declared are unsubscribed, then new members are subscribed.
    ///
    /// # Errors
    ///
    /// [`BindingError::InvalidTransition`] unless the node is `Attached`.
    pub fn reconfigure(&mut self, dependency: D) -> Result<BatchOutcome<()>, BindingError> {
        if self.state != BindingState::Attached {
            return Err(self.invalid("reconfigure"));
        }
        if self.dependency.same_ref(&dependency) {
            return Ok(BatchOutcome::empty());
        }
        let outcome = self.subscriptions.set_members(dependency.members());
        self.dependency = dependency;
        tracing::trace!(
            node = %self.id,
            members = self.subscriptions.len(),
            failed = outcome.failure_count(),
            "binding reconfigured"
        );
        Ok(outcome)
    }

    /// Replace the render function. Takes effect on the next `render()`.
    pub fn set_render(&mut self, render: impl Fn(&D) -> R + 'static) {
        self.render = Box::new(render);
    }

    /// Unsubscribe from everything and enter the terminal state.
    pub fn detach(&mut self) {
        if self.state == BindingState::Detached {
            return;
        }
        self.subscriptions.clear();
        self.requester.borrow_mut().take();
        self.dirty.set(false);
        tracing::trace!(node = %self.id, from = %self.state, "binding detached");
        self.state = BindingState::Detached;
    }

    /// Produce the node's output from the current dependency and clear the
    /// dirty flag.
    pub fn render(&self) -> R {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("binding_render", node = %self.id).entered();

        self.dirty.set(false);
        (self.render)(&self.dependency)
    }

    fn invalid(&self, operation: &'static str) -> BindingError {
        BindingError::InvalidTransition {
            operation,
            state: self.state,
        }
    }
}

impl<D: Dependency, R> Drop for BindingNode<D, R> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<D: Dependency, R> fmt::Debug for BindingNode<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingNode")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("dirty", &self.dirty.get())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
