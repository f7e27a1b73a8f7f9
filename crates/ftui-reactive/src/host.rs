#![forbid(unsafe_code)]

//! Seams to the host render tree.
//!
//! The host owns layout, diffing and the render loop. This module defines
//! what the binding layer needs from it ([`RenderRequester`]) and what it
//! offers back ([`NodeLifecycle`]), plus [`FrameScheduler`], a minimal host
//! that coalesces render requests per frame.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::binding::{BindingNode, Dependency};
use crate::error::BindingError;

/// Process-unique identity of a render-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Receives "this node's output may have changed" signals.
///
/// Implementations are free to coalesce; the binding layer only guarantees
/// at least one request per notification burst.
///
/// A node issues its next request only after it has been rendered. A host
/// that drains a request must render that node (`BindingNode::render` or
/// [`NodeLifecycle::build`]) or the node stays quiet for later bursts.
/// A panicking `request_render` is contained as a listener failure and the
/// node asks again on the next notification.
pub trait RenderRequester {
    fn request_render(&self, node: NodeId);
}

impl<F: Fn(NodeId)> RenderRequester for F {
    fn request_render(&self, node: NodeId) {
        self(node);
    }
}

/// Collects render requests until the host drains them for the next frame.
///
/// Each node appears at most once per frame, in first-request order.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: RefCell<Vec<NodeId>>,
    requests: Cell<u64>,
}

impl FrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes waiting for the next frame.
    #[must_use]
    pub fn pending(&self) -> Vec<NodeId> {
        self.pending.borrow().clone()
    }

    /// Drain the nodes to render this frame.
    pub fn take_frame(&self) -> Vec<NodeId> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    /// Total requests received, including coalesced duplicates.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests.get()
    }

    /// Whether no node is waiting.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

impl RenderRequester for FrameScheduler {
    fn request_render(&self, node: NodeId) {
        self.requests.set(self.requests.get() + 1);
        let mut pending = self.pending.borrow_mut();
        if !pending.contains(&node) {
            pending.push(node);
        }
    }
}

/// Hooks a host tree calls on its nodes.
///
/// | Hook | When |
/// |------|------|
/// | `init` | Node mounted |
/// | `did_update` | Node's declared inputs changed |
/// | `dispose` | Node removed permanently (may be called more than once) |
/// | `build` | Host renders the node |
///
/// `build` must be called for every node drained from a frame; it is what
/// re-arms the node's render requests.
pub trait NodeLifecycle {
    /// Declared inputs supplied on update.
    type Config;
    /// Render output.
    type Output;

    /// # Errors
    ///
    /// When the node cannot be mounted in its current state.
    fn init(&mut self, requester: Rc<dyn RenderRequester>) -> Result<(), BindingError>;

    /// # Errors
    ///
    /// When the node is not mounted.
    fn did_update(&mut self, config: Self::Config) -> Result<(), BindingError>;

    fn dispose(&mut self);

    fn build(&mut self) -> Self::Output;
}

impl<D: Dependency, R> NodeLifecycle for BindingNode<D, R> {
    type Config = D;
    type Output = R;

    fn init(&mut self, requester: Rc<dyn RenderRequester>) -> Result<(), BindingError> {
        self.attach(requester).map(drop)
    }

    fn did_update(&mut self, config: D) -> Result<(), BindingError> {
        self.reconfigure(config).map(drop)
    }

    fn dispose(&mut self) {
        self.detach();
    }

    fn build(&mut self) -> R {
        self.render()
    }
}
