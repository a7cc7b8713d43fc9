//! Iteration cache.
//!
//! [`IterationCache`] maps iteration numbers to their [`IterationRecord`].
//! Membership in the cache is the only cache-hit test: a cached iteration
//! is displayed through the warm path, anything else through the cold path.
//!
//! # State machine
//!
//! ```text
//! Unseen ──begin_fetch──▶ Fetching ──insert──▶ Cached
//!    ▲                        │
//!    └──────end_fetch─────────┘   (failure)
//! ```
//!
//! New iterations are always appended. Cached slots are never renumbered
//! or replaced; inserting an iteration that is already cached fails with
//! [`PayloadError::IterationConflict`].

pub mod types;

pub use types::{IterationRecord, IterationState};

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::PayloadError;
use crate::types::Iteration;

/// Records of every iteration fetched so far.
#[derive(Clone, Debug, Default)]
pub struct IterationCache {
    records: BTreeMap<Iteration, IterationRecord>,
    /// Iterations in the order they were first cached.
    order: Vec<Iteration>,
    /// Number of in-flight fetches per iteration.
    in_flight: HashMap<Iteration, usize>,
    /// Latest `maximum_iteration` reported by the server.
    maximum_iteration: Option<Iteration>,
}

impl IterationCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `iteration` has been fetched at least once.
    #[inline]
    pub fn contains(&self, iteration: Iteration) -> bool {
        self.records.contains_key(&iteration)
    }

    /// Returns the record of `iteration`.
    #[inline]
    pub fn get(&self, iteration: Iteration) -> Option<&IterationRecord> {
        self.records.get(&iteration)
    }

    /// Returns the fetch state of `iteration`.
    pub fn state(&self, iteration: Iteration) -> IterationState {
        if self.contains(iteration) {
            IterationState::Cached
        } else if self.in_flight.get(&iteration).is_some_and(|n| *n > 0) {
            IterationState::Fetching
        } else {
            IterationState::Unseen
        }
    }

    /// Number of cached iterations.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing is cached.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cached iterations in first-fetch order.
    pub fn available(&self) -> &[Iteration] {
        &self.order
    }

    /// Iterates over cached records in iteration order.
    pub fn records(&self) -> impl Iterator<Item = &IterationRecord> {
        self.records.values()
    }

    /// Latest total iteration count reported by the server.
    #[inline]
    pub fn maximum_iteration(&self) -> Option<Iteration> {
        self.maximum_iteration
    }

    /// Records the server-reported maximum iteration.
    pub fn set_maximum_iteration(&mut self, maximum: Iteration) {
        self.maximum_iteration = Some(maximum);
    }

    /// Marks a fetch of `iteration` as started.
    pub fn begin_fetch(&mut self, iteration: Iteration) {
        *self.in_flight.entry(iteration).or_insert(0) += 1;
    }

    /// Marks a fetch of `iteration` as finished (success or failure).
    pub fn end_fetch(&mut self, iteration: Iteration) {
        if let Some(n) = self.in_flight.get_mut(&iteration) {
            *n = n.saturating_sub(1);
            if *n == 0 {
                self.in_flight.remove(&iteration);
            }
        }
    }

    /// Checks that `iteration` can still be inserted.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::IterationConflict`] if it is already cached.
    pub fn check_vacant(&self, iteration: Iteration) -> Result<(), PayloadError> {
        if self.contains(iteration) {
            return Err(PayloadError::IterationConflict(iteration));
        }
        Ok(())
    }

    /// Appends a new record.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::IterationConflict`] if the iteration is
    /// already cached; the existing record is left untouched.
    pub fn insert(&mut self, record: IterationRecord) -> Result<(), PayloadError> {
        self.check_vacant(record.iteration)?;
        let iteration = record.iteration;
        debug!(
            %iteration,
            real = record.real_data_number,
            valid = record.valid_point_number,
            "Iteration cached"
        );
        self.records.insert(iteration, record);
        self.order.push(iteration);
        Ok(())
    }
}
