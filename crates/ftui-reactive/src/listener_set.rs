#![forbid(unsafe_code)]

//! A group of observables sharing one listener.
//!
//! [`ListenerSet`] owns a shared [`Listener`] and keeps it registered on
//! every member, and on nothing else. Membership changes subscribe or
//! unsubscribe immediately.
//!
//! # Invariants
//!
//! 1. The shared listener holds exactly one registration per membership on
//!    every live member, and none on observables outside the set.
//! 2. [`set_members`](ListenerSet::set_members) compares by identity, never
//!    by value. Installing the same `Rc<[Observable]>` again is a no-op.
//! 3. Batch operations run over every member in order and report one result
//!    per member; a failing member never aborts the batch.
//! 4. Dropping the set unsubscribes it from every member.
//!
//! # Failure Modes
//!
//! - **Disposed member**: it stays in the membership (so diffs against the
//!   declared collection stay exact) but holds no registration, since a
//!   disposed observable holds nothing; batch operations report it as a
//!   [`MembershipFailure`](crate::MembershipFailure).

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::DisposedError;
use crate::listener::Listener;
use crate::observable::{NotifyReport, Observable, ObservableId};
use crate::outcome::{BatchOutcome, for_each_member};

/// Observables tracked as a unit under one shared listener.
pub struct ListenerSet {
    listener: Listener,
    members: Vec<Observable>,
    /// Collection passed to the last `set_members`, cleared by any other
    /// membership change.
    installed: Option<Rc<[Observable]>>,
}

impl ListenerSet {
    /// An empty set around `listener`.
    #[must_use]
    pub fn new(listener: Listener) -> Self {
        Self {
            listener,
            members: Vec::new(),
            installed: None,
        }
    }

    /// The listener registered on every member.
    #[must_use]
    pub fn shared_listener(&self) -> &Listener {
        &self.listener
    }

    /// Current members, in order.
    #[must_use]
    pub fn members(&self) -> &[Observable] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `obs` is a member.
    #[must_use]
    pub fn contains(&self, obs: &Observable) -> bool {
        self.members.iter().any(|m| m.ptr_eq(obs))
    }

    /// Append `obs` and subscribe the shared listener to it.
    ///
    /// # Errors
    ///
    /// [`DisposedError`] if `obs` is disposed. It is still recorded as a
    /// member.
    pub fn add_observable(&mut self, obs: impl AsRef<Observable>) -> Result<(), DisposedError> {
        let obs = obs.as_ref().clone();
        let subscribed = obs.add_listener(self.listener.clone());
        self.members.push(obs);
        self.installed = None;
        subscribed
    }

    /// Remove one membership of `obs` and its registration.
    ///
    /// Returns `false` if `obs` was not a member.
    pub fn remove_observable(&mut self, obs: impl AsRef<Observable>) -> bool {
        let obs = obs.as_ref();
        let Some(index) = self.members.iter().position(|m| m.ptr_eq(obs)) else {
            return false;
        };
        let member = self.members.remove(index);
        member.remove_listener(&self.listener);
        self.installed = None;
        true
    }

    /// Replace the membership with `collection`.
    ///
    /// Members absent from `collection` are unsubscribed first, then members
    /// new to it are subscribed. Members in both keep their registration.
    /// Identity is compared per observable, counting duplicates.
    ///
    /// The returned outcome covers the newly subscribed members only; a
    /// failure's `index` is its position within that batch. Reinstalling the
    /// collection last passed here returns an empty outcome without touching
    /// any observable.
    pub fn set_members(&mut self, collection: Rc<[Observable]>) -> BatchOutcome<()> {
        if self
            .installed
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, &collection))
        {
            return BatchOutcome::empty();
        }

        let mut wanted: HashMap<ObservableId, usize> = HashMap::new();
        for member in collection.iter() {
            *wanted.entry(member.id()).or_default() += 1;
        }

        let mut kept: HashMap<ObservableId, usize> = HashMap::new();
        let mut removed = Vec::new();
        for member in &self.members {
            let id = member.id();
            match wanted.get_mut(&id) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    *kept.entry(id).or_default() += 1;
                }
                _ => removed.push(member.clone()),
            }
        }

        let mut added = Vec::new();
        for member in collection.iter() {
            match kept.get_mut(&member.id()) {
                Some(remaining) if *remaining > 0 => *remaining -= 1,
                _ => added.push(member.clone()),
            }
        }

        for member in &removed {
            member.remove_listener(&self.listener);
        }
        let outcome = for_each_member(&added, |m| m.add_listener(self.listener.clone()));

        tracing::trace!(
            removed = removed.len(),
            added = added.len(),
            members = collection.len(),
            "listener set membership replaced"
        );

        self.members = collection.to_vec();
        self.installed = Some(collection);
        outcome
    }

    /// Notify every member in order. Disposed members are skipped and
    /// reported.
    pub fn notify_all(&self) -> BatchOutcome<NotifyReport> {
        for_each_member(&self.members, Observable::try_notify)
    }

    /// Register an additional listener on every current member.
    pub fn add_shared_listener(&self, listener: &Listener) -> BatchOutcome<()> {
        for_each_member(&self.members, |m| m.add_listener(listener.clone()))
    }

    /// Remove one registration of `listener` from every current member.
    ///
    /// Each success value says whether a registration was found.
    pub fn remove_shared_listener(&self, listener: &Listener) -> BatchOutcome<bool> {
        for_each_member(&self.members, |m| {
            if m.is_disposed() {
                return Err(DisposedError {
                    observable: m.id(),
                    operation: "remove_listener",
                });
            }
            Ok(m.remove_listener(listener))
        })
    }

    /// Unsubscribe from every member and empty the set.
    pub fn clear(&mut self) {
        for member in self.members.drain(..) {
            member.remove_listener(&self.listener);
        }
        self.installed = None;
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field(
                "members",
                &self.members.iter().map(Observable::id).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting_listener() -> (Listener, Rc<Cell<u32>>) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        (Listener::new(move || h.set(h.get() + 1)), hits)
    }

    fn collection(members: &[&Observable]) -> Rc<[Observable]> {
        members.iter().map(|m| (*m).clone()).collect()
    }

    #[test]
    fn add_subscribes_immediately() {
        let (listener, hits) = counting_listener();
        let mut set = ListenerSet::new(listener.clone());
        let obs = Observable::new();

        set.add_observable(&obs).unwrap();
        assert!(obs.has_listener(&listener));
        obs.notify();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn remove_unsubscribes_immediately() {
        let (listener, hits) = counting_listener();
        let mut set = ListenerSet::new(listener.clone());
        let obs = Observable::new();
        set.add_observable(&obs).unwrap();

        assert!(set.remove_observable(&obs));
        assert!(!obs.has_listener(&listener));
        obs.notify();
        assert_eq!(hits.get(), 0);
        assert!(!set.remove_observable(&obs));
    }

    #[test]
    fn add_disposed_records_member_and_reports() {
        let mut set = ListenerSet::new(Listener::new(|| {}));
        let dead = Observable::new();
        dead.dispose();
        assert!(set.add_observable(&dead).is_err());
        assert!(set.contains(&dead));
    }

    #[test]
    fn set_members_diffs_by_identity() {
        let listener = Listener::new(|| {});
        let mut set = ListenerSet::new(listener.clone());
        let (a, b, c) = (Observable::new(), Observable::new(), Observable::new());

        set.set_members(collection(&[&a, &b]));
        assert!(a.has_listener(&listener));
        assert!(b.has_listener(&listener));

        let outcome = set.set_members(collection(&[&b, &c]));
        assert_eq!(outcome.len(), 1, "only c is newly subscribed");
        assert!(!a.has_listener(&listener));
        assert_eq!(b.registrations_of(&listener), 1);
        assert!(c.has_listener(&listener));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn set_members_same_collection_is_noop() {
        let listener = Listener::new(|| {});
        let mut set = ListenerSet::new(listener.clone());
        let a = Observable::new();
        let members = collection(&[&a]);
        set.set_members(Rc::clone(&members));

        // Remove behind the set's back; a real reinstall would re-add it.
        a.remove_listener(&listener);
        let outcome = set.set_members(members);
        assert!(outcome.is_empty());
        assert_eq!(a.listener_count(), 0);
    }

    #[test]
    fn set_members_equal_contents_new_collection() {
        let listener = Listener::new(|| {});
        let mut set = ListenerSet::new(listener.clone());
        let a = Observable::new();
        set.set_members(collection(&[&a]));
        let outcome = set.set_members(collection(&[&a]));
        assert!(outcome.is_empty());
        assert_eq!(a.registrations_of(&listener), 1);
    }

    #[test]
    fn set_members_counts_duplicates() {
        let listener = Listener::new(|| {});
        let mut set = ListenerSet::new(listener.clone());
        let a = Observable::new();

        set.set_members(collection(&[&a, &a]));
        assert_eq!(a.registrations_of(&listener), 2);
        set.set_members(collection(&[&a]));
        assert_eq!(a.registrations_of(&listener), 1);
    }

    #[test]
    fn notify_all_tolerates_disposed_member() {
        let (listener, hits) = counting_listener();
        let mut set = ListenerSet::new(listener);
        let live1 = Observable::new();
        let dead = Observable::new();
        let live2 = Observable::new();
        set.set_members(collection(&[&live1, &dead, &live2]));
        dead.dispose();

        let outcome = set.notify_all();
        assert_eq!(outcome.success_count(), 2);
        assert_eq!(outcome.failure_count(), 1);
        assert_eq!(outcome.failures().next().unwrap().index, 1);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn shared_listener_add_and_remove() {
        let mut set = ListenerSet::new(Listener::new(|| {}));
        let a = Observable::new();
        let dead = Observable::new();
        set.add_observable(&a).unwrap();
        set.add_observable(&dead).unwrap();
        dead.dispose();

        let (extra, hits) = counting_listener();
        let added = set.add_shared_listener(&extra);
        assert_eq!(added.success_count(), 1);
        assert_eq!(added.failure_count(), 1);
        a.notify();
        assert_eq!(hits.get(), 1);

        let removed = set.remove_shared_listener(&extra);
        assert_eq!(removed.successes().copied().collect::<Vec<_>>(), vec![true]);
        assert_eq!(removed.failure_count(), 1);
        assert!(!a.has_listener(&extra));
    }

    #[test]
    fn clear_and_drop_unsubscribe() {
        let listener = Listener::new(|| {});
        let a = Observable::new();
        {
            let mut set = ListenerSet::new(listener.clone());
            set.add_observable(&a).unwrap();
            set.clear();
            assert!(set.is_empty());
            assert!(!a.has_listener(&listener));
            set.add_observable(&a).unwrap();
        }
        assert!(!a.has_listener(&listener));
    }

    #[test]
    fn accepts_value_observables() {
        let listener = Listener::new(|| {});
        let mut set = ListenerSet::new(listener.clone());
        let value = crate::ValueObservable::new(1);
        set.add_observable(&value).unwrap();
        assert!(value.observable().has_listener(&listener));
    }
}
