//! Type definitions for cached iterations.

use serde::{Deserialize, Serialize};

use crate::types::{Iteration, PointProperty};

/// Cached metadata of one fetched iteration.
///
/// Created exactly once, the first time the iteration is merged (cold
/// fetch or retrain), and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Iteration number.
    pub iteration: Iteration,

    /// Number of real (non-background) points.
    pub real_data_number: usize,

    /// `real_data_number` plus the background corner count.
    pub valid_point_number: usize,

    /// Evaluation metrics, passed through verbatim from the server.
    pub evaluation: serde_json::Value,

    /// Label category of each real point.
    pub properties: Vec<PointProperty>,

    /// Indices the server flagged as newly selected.
    pub new_selection: Vec<usize>,

    /// Opaque backdrop payload (`grid_color`), if provided.
    pub background_image: Option<String>,
}

impl IterationRecord {
    /// Number of background corner points.
    #[inline]
    pub fn background_point_number(&self) -> usize {
        self.valid_point_number - self.real_data_number
    }

    /// Returns true if `index` is a real point at this iteration.
    #[inline]
    pub fn is_real(&self, index: usize) -> bool {
        index < self.real_data_number
    }

    /// Returns the label category of `index`, if it is a real point.
    pub fn property(&self, index: usize) -> Option<PointProperty> {
        self.properties.get(index).copied()
    }
}

/// Fetch state of an iteration number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IterationState {
    /// Never fetched successfully and no fetch in flight.
    Unseen,
    /// At least one fetch in flight, none completed yet.
    Fetching,
    /// Record present; the warm path applies.
    Cached,
}
