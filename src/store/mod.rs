//! The append-only point table.
//!
//! [`PointStore`] owns every [`Point`] the session has ever seen. It only
//! grows: a payload reporting fewer points than the table holds leaves the
//! extra rows in place (hidden), because other cached iterations still
//! address them.
//!
//! # Write protocol
//!
//! ```text
//! ensure_capacity(real, background)      ← append placeholders
//!     └── ensure_defaults(iteration, ..) ← reserve snapshot slots
//!             ├── write_real_point()     ← index 0 upward
//!             └── write_background_point()
//! clear_stale(valid)                     ← hide rows past this iteration
//! ```
//!
//! Writes into an iteration whose slot was not reserved fail with
//! [`ProjectorError::State`].

use std::ops::Range;

use tracing::debug;

use crate::error::{NotFoundError, ProjectorError, Result};
use crate::point::{CurrentState, Point, PointSnapshot, BACKGROUND};
use crate::types::{Iteration, Rgb};

/// Field values written for one real point at one iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct RealPointWrite {
    /// 2D projected position.
    pub projection: [f64; 2],
    /// Display color.
    pub color: Rgb,
    /// Label shown at this iteration.
    pub label: String,
    /// Model prediction.
    pub prediction: String,
    /// Training membership.
    pub training: bool,
    /// Testing membership.
    pub testing: bool,
    /// Inverse-projection accuracy score.
    pub inv_acc: f64,
    /// Label before noise injection.
    pub original_label: Option<String>,
    /// Newly selected by the server at this iteration.
    pub new_selection: bool,
    /// Noisy label flag.
    pub noisy: bool,
}

/// Ordered, append-only table of points.
#[derive(Clone, Debug, Default)]
pub struct PointStore {
    points: Vec<Point>,
}

impl PointStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points ever created.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no point was ever created.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the point at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    /// Iterates over all points in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    /// Returns all points as a slice.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Grows the table to hold `new_real + new_background` points.
    ///
    /// Appends placeholder points with sequential indices. A total at or
    /// below the current length is a no-op; the table never shrinks.
    ///
    /// Returns the number of points appended.
    pub fn ensure_capacity(&mut self, new_real: usize, new_background: usize) -> usize {
        let target = new_real.saturating_add(new_background);
        let current = self.points.len();
        if target <= current {
            return 0;
        }

        self.points.extend((current..target).map(Point::placeholder));
        debug!(from = current, to = target, "Point store grown");
        target - current
    }

    /// Reserves a snapshot slot for `iteration` on every point in `range`.
    ///
    /// Existing snapshots are left untouched, so repeated calls are
    /// harmless. The range is clamped to the store length.
    pub fn ensure_defaults(&mut self, iteration: Iteration, range: Range<usize>) {
        let end = range.end.min(self.points.len());
        let start = range.start.min(end);
        for point in &mut self.points[start..end] {
            point.history.entry(iteration).or_default();
        }
    }

    /// Writes the snapshot, current mirror and rendered position of a real point.
    ///
    /// # Errors
    ///
    /// - `NotFoundError::Point` if `index` is beyond the table
    /// - `ProjectorError::State` if the slot for `iteration` was not reserved
    pub fn write_real_point(
        &mut self,
        index: usize,
        iteration: Iteration,
        write: RealPointWrite,
    ) -> Result<()> {
        let point = self.reserved_point(index, iteration)?;

        let snapshot = PointSnapshot {
            projection: write.projection,
            color: write.color,
            label: write.label,
            training: Some(write.training),
            testing: Some(write.testing),
            prediction: write.prediction,
            inv_acc: write.inv_acc,
            new_selection: Some(write.new_selection),
            noisy: Some(write.noisy),
        };

        point.set_label(snapshot.label.clone());
        point.current = CurrentState::from(&snapshot);
        point.render(snapshot.projection);
        if write.original_label.is_some() {
            point.original_label = write.original_label;
        }
        point.history.insert(iteration, snapshot);
        Ok(())
    }

    /// Writes the fixed synthetic fields of a background point.
    ///
    /// Training, testing, new-selection and noisy flags are `None`; label and
    /// prediction are `"background"`.
    ///
    /// # Errors
    ///
    /// Same as [`write_real_point`](Self::write_real_point).
    pub fn write_background_point(
        &mut self,
        index: usize,
        iteration: Iteration,
        grid_projection: [f64; 2],
        grid_color: Rgb,
    ) -> Result<()> {
        let point = self.reserved_point(index, iteration)?;

        let snapshot = PointSnapshot {
            projection: grid_projection,
            color: grid_color,
            label: BACKGROUND.to_string(),
            training: None,
            testing: None,
            prediction: BACKGROUND.to_string(),
            inv_acc: 0.0,
            new_selection: None,
            noisy: None,
        };

        point.set_label(BACKGROUND);
        point.current = CurrentState::from(&snapshot);
        point.render(snapshot.projection);
        point.original_label = Some(BACKGROUND.to_string());
        point.history.insert(iteration, snapshot);
        Ok(())
    }

    /// Hides every point at or beyond `from_index`.
    ///
    /// Rendered coordinates and the current mirror are emptied; the
    /// per-iteration history is kept.
    pub fn clear_stale(&mut self, from_index: usize) {
        if from_index >= self.points.len() {
            return;
        }
        for point in &mut self.points[from_index..] {
            point.hide();
        }
        debug!(from_index, "Stale points hidden");
    }

    /// Re-derives the displayed state of `iteration` from stored snapshots.
    ///
    /// Every point below `valid` gets its label, current mirror and rendered
    /// position rebuilt from its snapshot; points from `valid` upward are
    /// hidden. Nothing is written unless every snapshot is present.
    ///
    /// # Errors
    ///
    /// Returns `ProjectorError::State` if `valid` exceeds the table or a
    /// point below `valid` has no snapshot for `iteration`.
    pub fn restore_iteration(&mut self, iteration: Iteration, valid: usize) -> Result<()> {
        if valid > self.points.len() {
            return Err(ProjectorError::state(format!(
                "iteration {} covers {} points but the store holds {}",
                iteration,
                valid,
                self.points.len()
            )));
        }
        if let Some(missing) = self.points[..valid]
            .iter()
            .find(|p| !p.history.contains_key(&iteration))
        {
            return Err(ProjectorError::state(format!(
                "point {} has no snapshot for iteration {}",
                missing.index, iteration
            )));
        }

        for point in &mut self.points[..valid] {
            if let Some(snapshot) = point.history.get(&iteration) {
                let label = snapshot.label.clone();
                let projection = snapshot.projection;
                point.current = CurrentState::from(snapshot);
                point.set_label(label);
                point.render(projection);
            }
        }
        self.clear_stale(valid);
        Ok(())
    }

    fn reserved_point(&mut self, index: usize, iteration: Iteration) -> Result<&mut Point> {
        let point = self
            .points
            .get_mut(index)
            .ok_or_else(|| NotFoundError::point(index))?;
        if !point.history.contains_key(&iteration) {
            return Err(ProjectorError::state(format!(
                "snapshot slot for point {} at iteration {} was not reserved",
                index, iteration
            )));
        }
        Ok(point)
    }
}
