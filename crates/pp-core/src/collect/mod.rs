//! Batched collection over the platform port.
//!
//! Both collectors drive their platform calls through a [`Governor`], keep
//! their accumulators local to one invocation, and return a finished
//! [`CollectionResult`].
//!
//! [`Governor`]: crate::platform::governor::Governor

pub mod comments;
pub mod last_seen;
pub mod members;

#[cfg(test)]
pub(crate) mod fake;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    errors::Error,
    paginate::{paginate, Page},
    Result,
};

/// Ordered records produced by one run. The count is always the length of
/// the sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionResult<T> {
    items: Vec<T>,
}

impl<T> CollectionResult<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    /// Zero records is a valid outcome, not a failure.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn page(&self, page: usize, page_size: usize) -> Page<'_, T> {
        paginate(&self.items, page, page_size)
    }
}

impl<T> Default for CollectionResult<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

/// How the enclosing loop should treat the result of one message, reply or
/// profile lookup.
#[derive(Debug)]
pub(crate) enum ItemOutcome<T> {
    Done(T),
    /// Item-scoped failure: log it, skip the item, keep going.
    Skip(Error),
    /// Aborts the whole run.
    Fatal(Error),
}

impl<T> From<Result<T>> for ItemOutcome<T> {
    fn from(res: Result<T>) -> Self {
        match res {
            Ok(v) => ItemOutcome::Done(v),
            Err(e) if e.is_item_scoped() => ItemOutcome::Skip(e),
            Err(e) => ItemOutcome::Fatal(e),
        }
    }
}

/// Cooperative check-point at the top of every outer-loop iteration.
pub(crate) fn ensure_not_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(Error::Cancelled),
        _ => Ok(()),
    }
}
