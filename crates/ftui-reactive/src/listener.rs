#![forbid(unsafe_code)]

//! Listener handles with reference identity.
//!
//! A [`Listener`] is a cheaply clonable handle to a callback. Clones share
//! identity: adding a listener and later removing any clone of it removes
//! the same registration. Two listeners built from identical closures are
//! still distinct.
//!
//! Invoking a listener never unwinds past [`Listener::invoke`]: a panic inside
//! the callback is caught and turned into a [`ListenerFailure`], so one bad
//! callback cannot abort a notification pass.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::ListenerFailure;

type Callback = dyn Fn() -> Result<(), ListenerFailure>;

/// A notification callback with stable identity.
#[derive(Clone)]
pub struct Listener {
    callback: Rc<Callback>,
}

impl Listener {
    /// Wrap an infallible callback.
    pub fn new(callback: impl Fn() + 'static) -> Self {
        Self {
            callback: Rc::new(move || {
                callback();
                Ok(())
            }),
        }
    }

    /// Wrap a callback that can report failure by returning `Err`.
    ///
    /// The error is rendered with `Display` and reported like a panic would
    /// be; it never reaches the caller of `notify()`.
    pub fn fallible<E: fmt::Display>(callback: impl Fn() -> Result<(), E> + 'static) -> Self {
        Self {
            callback: Rc::new(move || {
                callback().map_err(|err| ListenerFailure::returned(err.to_string()))
            }),
        }
    }

    /// Whether `self` and `other` are the same listener.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }

    /// Run the callback, containing panics.
    pub fn invoke(&self) -> Result<(), ListenerFailure> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.callback)())) {
            Ok(result) => result,
            Err(payload) => Err(ListenerFailure::panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
