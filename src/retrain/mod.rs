//! User feedback for active-learning retrains.
//!
//! The user marks points as interesting (accepted) or not (rejected). Only
//! points the server lists as `Unlabeled` at the working iteration are
//! eligible; everything else is dropped before the request is built.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::iteration::IterationRecord;
use crate::protocol::RetrainRequest;
use crate::types::PointProperty;

/// Accepted and rejected point indices.
///
/// An index is in at most one of the two sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionFeedback {
    /// Points marked as interesting.
    pub accepted: BTreeSet<usize>,
    /// Points marked as not interesting.
    pub rejected: BTreeSet<usize>,
}

impl SelectionFeedback {
    /// Creates empty feedback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds feedback from index lists.
    ///
    /// An index present in both lists ends up rejected.
    pub fn from_indices(
        accepted: impl IntoIterator<Item = usize>,
        rejected: impl IntoIterator<Item = usize>,
    ) -> Self {
        let mut feedback = Self::new();
        for i in accepted {
            feedback.accept(i);
        }
        for i in rejected {
            feedback.reject(i);
        }
        feedback
    }

    /// Marks `index` as interesting.
    pub fn accept(&mut self, index: usize) {
        self.rejected.remove(&index);
        self.accepted.insert(index);
    }

    /// Marks `index` as not interesting.
    pub fn reject(&mut self, index: usize) {
        self.accepted.remove(&index);
        self.rejected.insert(index);
    }

    /// Forgets all feedback.
    pub fn clear(&mut self) {
        self.accepted.clear();
        self.rejected.clear();
    }

    /// Returns true if nothing was marked.
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty() && self.rejected.is_empty()
    }

    /// Keeps only indices that are `Unlabeled` in `record`.
    pub fn eligible(&self, record: &IterationRecord) -> Self {
        let keep = |set: &BTreeSet<usize>| -> BTreeSet<usize> {
            set.iter()
                .copied()
                .filter(|&i| record.property(i) == Some(PointProperty::Unlabeled))
                .collect()
        };
        let eligible = Self {
            accepted: keep(&self.accepted),
            rejected: keep(&self.rejected),
        };

        let dropped = self.accepted.len() + self.rejected.len()
            - eligible.accepted.len()
            - eligible.rejected.len();
        if dropped > 0 {
            debug!(
                iteration = %record.iteration,
                dropped,
                "Ineligible feedback indices dropped"
            );
        }
        eligible
    }

    /// Builds the `/al_train` body for the working iteration.
    pub fn to_request(&self, config: &Config, record: &IterationRecord) -> RetrainRequest {
        let eligible = self.eligible(record);
        RetrainRequest {
            iteration: record.iteration,
            acc_indices: eligible.accepted.into_iter().collect(),
            rej_indices: eligible.rejected.into_iter().collect(),
            content_path: config.content_path.clone(),
            username: config.username.clone(),
        }
    }
}
