//! Cold merge and warm replay.
//!
//! These functions apply a server response to the engine state. They are
//! synchronous and run under the projector's write lock; the network part
//! of each protocol lives in [`Projector`](crate::Projector).
//!
//! # Cold merge
//!
//! ```text
//! validate ─▶ check_vacant ─▶ ensure_capacity ─▶ ensure_defaults(0..valid)
//!     ─▶ real points 0.. ─▶ 4 background corners ─▶ clear_stale(valid)
//!     ─▶ insert record ─▶ recompute scope
//! ```
//!
//! Everything that can reject the payload runs before the first write.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TrainingSetting;
use crate::error::{NotFoundError, PayloadError, Result};
use crate::filter::FilterEngine;
use crate::iteration::{IterationCache, IterationRecord};
use crate::point::UNLABELED;
use crate::protocol::{validate_projection, ProjectionResponse, GRID_COLORS};
use crate::store::{PointStore, RealPointWrite};
use crate::types::{Iteration, PointProperty, Rgb};

/// Outcome of one display or retrain attempt, as handed to callbacks.
///
/// All fields are `None` on failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Iteration now displayed.
    pub iteration: Option<Iteration>,
    /// Evaluation metrics of that iteration.
    pub evaluation: Option<serde_json::Value>,
    /// Indices newly selected at that iteration.
    pub new_selection: Option<Vec<usize>>,
    /// Indices matching the request predicates (`selectedPoints`).
    pub filter_indices: Option<Vec<usize>>,
    /// Latest iteration available on the server.
    pub total_iterations: Option<Iteration>,
}

impl StepReport {
    /// The all-`None` report of a failed attempt.
    pub fn failed() -> Self {
        Self::default()
    }

    /// Returns true if this is the failure sentinel.
    pub fn is_failed(&self) -> bool {
        *self == Self::default()
    }
}

/// Assigns a label and color to each real point.
///
/// In active-learning settings only `Labeled` points consume the next entry
/// of the compact lists; the rest are shown as unlabeled. Otherwise every
/// point consumes one entry. Running out of entries yields unlabeled gray.
pub fn partition_labels(
    setting: &TrainingSetting,
    properties: &[PointProperty],
    labels: &[String],
    colors: &[Rgb],
    real: usize,
) -> Vec<(String, Rgb)> {
    let compact = setting.is_active_learning();
    let mut next = 0;
    (0..real)
        .map(|i| {
            let consumes = !compact || properties.get(i) == Some(&PointProperty::Labeled);
            if !consumes {
                return (UNLABELED.to_string(), Rgb::UNLABELED);
            }
            let k = next;
            next += 1;
            match (labels.get(k), colors.get(k)) {
                (Some(label), Some(color)) => (label.clone(), *color),
                _ => (UNLABELED.to_string(), Rgb::UNLABELED),
            }
        })
        .collect()
}

/// Merges a full projection payload as a new cached iteration.
///
/// Used by both the cold fetch and retrain. After the merge the filter
/// scope holds every valid index passing the standing predicates.
///
/// # Errors
///
/// - `ProjectorError::Payload` if the payload fails validation or the
///   iteration is already cached; nothing is written
/// - `ProjectorError::State` on an internal slot inconsistency
pub fn merge_projection(
    store: &mut PointStore,
    cache: &mut IterationCache,
    filter: &mut FilterEngine,
    setting: &TrainingSetting,
    iteration: Iteration,
    resp: ProjectionResponse,
) -> Result<StepReport> {
    validate_projection(&resp)?;
    cache.check_vacant(iteration)?;

    let real = resp.real_data_number();
    let valid = resp.valid_point_number();

    let appended = store.ensure_capacity(real, valid - real);
    store.ensure_defaults(iteration, 0..valid);

    let shown = partition_labels(
        setting,
        &resp.properties,
        &resp.label_list,
        &resp.label_color_list,
        real,
    );
    let training: HashSet<usize> = resp.training_data.iter().copied().collect();
    let testing: HashSet<usize> = resp.testing_data.iter().copied().collect();
    let selected: HashSet<usize> = resp.new_selection.iter().copied().collect();
    let noisy: HashSet<usize> = resp.noisy_data.iter().copied().collect();
    let originals = resp.original_label_list.as_deref().unwrap_or_default();

    for (i, (label, color)) in shown.into_iter().enumerate() {
        store.write_real_point(
            i,
            iteration,
            RealPointWrite {
                projection: resp.result[i],
                color,
                label,
                prediction: resp.prediction_list[i].clone(),
                training: training.contains(&i),
                testing: testing.contains(&i),
                inv_acc: resp.inv_acc_list.get(i).copied().unwrap_or(0.0),
                original_label: originals.get(i).cloned(),
                new_selection: selected.contains(&i),
                noisy: noisy.contains(&i),
            },
        )?;
    }

    for (offset, (corner, color)) in resp.grid_corners().into_iter().zip(GRID_COLORS).enumerate() {
        store.write_background_point(real + offset, iteration, corner, color)?;
    }

    store.clear_stale(valid);

    let record = IterationRecord {
        iteration,
        real_data_number: real,
        valid_point_number: valid,
        evaluation: resp.evaluation.clone(),
        properties: resp.properties[..real].to_vec(),
        new_selection: resp.new_selection.clone(),
        background_image: resp.grid_color.clone(),
    };
    cache.insert(record)?;
    cache.set_maximum_iteration(resp.maximum_iteration);

    filter.set_visible(valid);
    let scope = filter.current_scope(store);
    filter.set_scope(scope);

    info!(
        %iteration,
        real,
        valid,
        appended,
        maximum = %resp.maximum_iteration,
        "Projection merged"
    );

    Ok(StepReport {
        iteration: Some(iteration),
        evaluation: Some(resp.evaluation),
        new_selection: Some(resp.new_selection),
        filter_indices: Some(resp.selected_points),
        total_iterations: Some(resp.maximum_iteration),
    })
}

/// Re-displays a cached iteration from stored snapshots.
///
/// `selected` is the `/query` result; it becomes the filter scope.
///
/// # Errors
///
/// - `NotFoundError::Iteration` if `iteration` is not cached
/// - `ProjectorError::Payload` if `selected` names a point outside the
///   iteration
/// - `ProjectorError::State` if a snapshot is missing
///
/// Nothing is written on error.
pub fn replay_iteration(
    store: &mut PointStore,
    cache: &IterationCache,
    filter: &mut FilterEngine,
    iteration: Iteration,
    selected: Vec<usize>,
) -> Result<StepReport> {
    let record = cache
        .get(iteration)
        .ok_or_else(|| NotFoundError::iteration(iteration))?;

    if let Some(&index) = selected.iter().find(|&&i| i >= record.valid_point_number) {
        return Err(
            PayloadError::index_out_of_range("selectedPoints", index, record.valid_point_number)
                .into(),
        );
    }

    store.restore_iteration(iteration, record.valid_point_number)?;
    filter.set_visible(record.valid_point_number);
    filter.set_scope(selected.clone());

    debug!(%iteration, valid = record.valid_point_number, "Iteration replayed");

    Ok(StepReport {
        iteration: Some(iteration),
        evaluation: Some(record.evaluation.clone()),
        new_selection: Some(record.new_selection.clone()),
        filter_indices: Some(selected),
        total_iterations: cache.maximum_iteration(),
    })
}
