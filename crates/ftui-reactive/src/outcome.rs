#![forbid(unsafe_code)]

//! Per-member outcomes for batch operations over a group of observables.
//!
//! [`for_each_member`] applies an operation to every member in order and
//! collects one `Result` per member. A failing member never aborts the batch,
//! so callers can diagnose a partially torn-down group after the fact.

use crate::error::{DisposedError, MembershipFailure};
use crate::observable::Observable;

/// One result per member, in member order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<T> {
    results: Vec<Result<T, MembershipFailure>>,
}

impl<T> BatchOutcome<T> {
    /// An outcome for an empty batch.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    /// Per-member results.
    #[must_use]
    pub fn results(&self) -> &[Result<T, MembershipFailure>] {
        &self.results
    }

    #[must_use]
    pub fn into_results(self) -> Vec<Result<T, MembershipFailure>> {
        self.results
    }

    /// Members processed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Members for which the operation succeeded.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Members for which the operation failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    /// Failed members, in member order.
    pub fn failures(&self) -> impl Iterator<Item = &MembershipFailure> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    /// Successful values, in member order.
    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    /// Whether every member succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(Result::is_ok)
    }

    /// Append another batch, keeping order.
    pub fn extend(&mut self, other: Self) {
        self.results.extend(other.results);
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Apply `op` to every member, turning each `DisposedError` into a
/// [`MembershipFailure`] tagged with the member's position.
pub fn for_each_member<'a, T, I, F>(members: I, mut op: F) -> BatchOutcome<T>
where
    I: IntoIterator<Item = &'a Observable>,
    F: FnMut(&Observable) -> Result<T, DisposedError>,
{
    let results = members
        .into_iter()
        .enumerate()
        .map(|(index, member)| {
            op(member).map_err(|source| {
                let failure = MembershipFailure {
                    index,
                    observable: source.observable,
                    source,
                };
                tracing::debug!(member = index, observable = %failure.observable, "{failure}");
                failure
            })
        })
        .collect();
    BatchOutcome { results }
}
