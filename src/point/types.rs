//! Type definitions for points.
//!
//! A **point** is one row of the ever-growing point table. Real points are
//! dataset samples; background points are synthetic backdrop corners.
//!
//! # Per-iteration data
//!
//! ```text
//! Point
//!  ├── history: Iteration → PointSnapshot   (written once per iteration)
//!  ├── current: CurrentState                (mirror of the displayed snapshot)
//!  └── projections: "tsne-0/1/2" → f64      (rendered coordinates)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Iteration, MetadataValue, Rgb};

/// Rendered projection axis keys, in component order.
pub const PROJECTION_KEYS: [&str; 3] = ["tsne-0", "tsne-1", "tsne-2"];

/// Label and prediction sentinel carried by background points.
pub const BACKGROUND: &str = "background";

/// Label shown for points whose label is hidden from the client.
pub const UNLABELED: &str = "unlabeled";

/// Metadata field holding the point label.
pub const LABEL_FIELD: &str = "label";

/// Fixed per-point record for one iteration.
///
/// Real points carry server data; background points carry a grid corner
/// and the sentinel values (`None` flags, `"background"` prediction).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSnapshot {
    /// 2D projected position.
    pub projection: [f64; 2],
    /// Display color.
    pub color: Rgb,
    /// Label shown at this iteration.
    pub label: String,
    /// Training membership (`None` for background points).
    pub training: Option<bool>,
    /// Testing membership (`None` for background points).
    pub testing: Option<bool>,
    /// Model prediction at this iteration.
    pub prediction: String,
    /// Inverse-projection accuracy score.
    pub inv_acc: f64,
    /// Whether the server flagged this point as newly selected.
    pub new_selection: Option<bool>,
    /// Whether the sample carries a noisy (flipped) label.
    pub noisy: Option<bool>,
}

impl Default for PointSnapshot {
    /// Reserved slot contents before the merge writes the real values.
    fn default() -> Self {
        Self {
            projection: [0.0, 0.0],
            color: Rgb::default(),
            label: String::new(),
            training: None,
            testing: None,
            prediction: String::new(),
            inv_acc: 0.0,
            new_selection: None,
            noisy: None,
        }
    }
}

impl PointSnapshot {
    /// Returns true if this snapshot describes a background point.
    pub fn is_background(&self) -> bool {
        self.prediction == BACKGROUND
    }

    /// Wrong-prediction flag derived from label and prediction.
    ///
    /// `None` for background points.
    pub fn wrong_prediction(&self) -> Option<bool> {
        if self.label == BACKGROUND {
            None
        } else {
            Some(self.prediction != self.label)
        }
    }
}

/// Denormalized mirror of the snapshot for the displayed iteration.
///
/// All fields are `None` when the point is not part of the displayed
/// iteration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentState {
    /// Display color.
    pub color: Option<Rgb>,
    /// Training membership.
    pub training: Option<bool>,
    /// Testing membership.
    pub testing: Option<bool>,
    /// Model prediction.
    pub prediction: Option<String>,
    /// Inverse-projection accuracy score.
    pub inv_acc: Option<f64>,
    /// Prediction differs from label.
    pub wrong_prediction: Option<bool>,
    /// Newly selected by the server.
    pub new_selection: Option<bool>,
    /// Noisy label flag.
    pub noisy: Option<bool>,
}

impl From<&PointSnapshot> for CurrentState {
    fn from(s: &PointSnapshot) -> Self {
        Self {
            color: Some(s.color),
            training: s.training,
            testing: s.testing,
            prediction: Some(s.prediction.clone()),
            inv_acc: Some(s.inv_acc),
            wrong_prediction: s.wrong_prediction(),
            new_selection: s.new_selection,
            noisy: s.noisy,
        }
    }
}

/// One row of the point table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Stable position in the point table.
    pub index: usize,

    /// Metadata fields; always contains `label`.
    pub metadata: BTreeMap<String, MetadataValue>,

    /// Rendered coordinates for the displayed iteration (empty when hidden).
    pub projections: BTreeMap<String, f64>,

    /// Per-iteration snapshots.
    pub history: BTreeMap<Iteration, PointSnapshot>,

    /// Mirror of the displayed iteration's snapshot.
    pub current: CurrentState,

    /// Label before noise injection, when the server provides one.
    pub original_label: Option<String>,
}

impl Point {
    /// Creates a placeholder point with a `"background"` label and no data.
    pub fn placeholder(index: usize) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(LABEL_FIELD.to_string(), MetadataValue::from(BACKGROUND));
        Self {
            index,
            metadata,
            projections: BTreeMap::new(),
            history: BTreeMap::new(),
            current: CurrentState::default(),
            original_label: None,
        }
    }

    /// Returns the current label.
    pub fn label(&self) -> Option<&str> {
        self.metadata.get(LABEL_FIELD).and_then(MetadataValue::as_str)
    }

    /// Sets the current label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.metadata
            .insert(LABEL_FIELD.to_string(), MetadataValue::Text(label.into()));
    }

    /// Returns the snapshot stored for `iteration`.
    pub fn snapshot(&self, iteration: Iteration) -> Option<&PointSnapshot> {
        self.history.get(&iteration)
    }

    /// Returns the rendered 3D position, if the point is visible.
    pub fn rendered(&self) -> Option<[f64; 3]> {
        let x = *self.projections.get(PROJECTION_KEYS[0])?;
        let y = *self.projections.get(PROJECTION_KEYS[1])?;
        let z = self.projections.get(PROJECTION_KEYS[2]).copied().unwrap_or(0.0);
        Some([x, y, z])
    }

    /// Returns true if the point has rendered coordinates.
    pub fn is_visible(&self) -> bool {
        !self.projections.is_empty()
    }

    /// Sets the rendered coordinates from a 2D projection (`z = 0`).
    pub(crate) fn render(&mut self, projection: [f64; 2]) {
        self.projections
            .insert(PROJECTION_KEYS[0].to_string(), projection[0]);
        self.projections
            .insert(PROJECTION_KEYS[1].to_string(), projection[1]);
        self.projections.insert(PROJECTION_KEYS[2].to_string(), 0.0);
    }

    /// Hides the point: empties rendered coordinates and the current mirror.
    pub(crate) fn hide(&mut self) {
        self.projections.clear();
        self.current = CurrentState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let p = Point::placeholder(5);
        assert_eq!(p.index, 5);
        assert_eq!(p.label(), Some(BACKGROUND));
        assert!(p.history.is_empty());
        assert!(!p.is_visible());
        assert!(p.rendered().is_none());
    }

    #[test]
    fn test_render_and_hide() {
        let mut p = Point::placeholder(0);
        p.render([1.5, -2.0]);
        assert_eq!(p.rendered(), Some([1.5, -2.0, 0.0]));

        p.current.training = Some(true);
        p.hide();
        assert!(!p.is_visible());
        assert_eq!(p.current, CurrentState::default());
    }

    #[test]
    fn test_wrong_prediction() {
        let mut s = PointSnapshot {
            label: "cat".to_string(),
            prediction: "dog".to_string(),
            ..PointSnapshot::default()
        };
        assert_eq!(s.wrong_prediction(), Some(true));

        s.prediction = "cat".to_string();
        assert_eq!(s.wrong_prediction(), Some(false));

        s.label = BACKGROUND.to_string();
        s.prediction = BACKGROUND.to_string();
        assert_eq!(s.wrong_prediction(), None);
        assert!(s.is_background());
    }

    #[test]
    fn test_current_state_from_snapshot() {
        let s = PointSnapshot {
            projection: [0.1, 0.2],
            color: Rgb(1, 2, 3),
            label: "cat".to_string(),
            training: Some(true),
            testing: Some(false),
            prediction: "cat".to_string(),
            inv_acc: 0.9,
            new_selection: Some(false),
            noisy: Some(false),
        };
        let c = CurrentState::from(&s);
        assert_eq!(c.color, Some(Rgb(1, 2, 3)));
        assert_eq!(c.training, Some(true));
        assert_eq!(c.prediction.as_deref(), Some("cat"));
        assert_eq!(c.wrong_prediction, Some(false));
    }
}
