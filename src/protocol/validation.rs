//! Schema check for projection payloads.
//!
//! A payload must reconcile with itself before any point is written: the
//! merge trusts every length and index checked here.
//!
//! # Rules
//!
//! | Field | Constraint |
//! |-------|------------|
//! | `result` | Non-empty, finite coordinates |
//! | `grid_index` | Exactly 4 finite numbers |
//! | `properties`, `prediction_list` | At least one entry per real point |
//! | `label_list`, `label_color_list` | Same length |
//! | `inv_acc_list`, `original_label_list` | Empty/absent, or one entry per real point |
//! | `training_data`, `testing_data`, `new_selection`, `noisy_data` | Indices below the real point count |
//! | `selectedPoints` | Indices below the valid point count |

use crate::error::PayloadError;

use super::{ProjectionResponse, GRID_CORNERS};

/// Validates a [`ProjectionResponse`] before merging.
pub(crate) fn validate_projection(resp: &ProjectionResponse) -> Result<(), PayloadError> {
    let real = resp.real_data_number();

    if real == 0 {
        return Err(PayloadError::required_field("result"));
    }

    if let Some(i) = resp
        .result
        .iter()
        .position(|[x, y]| !x.is_finite() || !y.is_finite())
    {
        return Err(PayloadError::invalid_value(
            "result",
            format!("non-finite coordinate at index {}", i),
        ));
    }

    if resp.grid_index.len() != GRID_CORNERS {
        return Err(PayloadError::length_mismatch(
            "grid_index",
            GRID_CORNERS,
            resp.grid_index.len(),
        ));
    }
    if resp.grid_index.iter().any(|v| !v.is_finite()) {
        return Err(PayloadError::invalid_value(
            "grid_index",
            "non-finite bound",
        ));
    }

    at_least("properties", real, resp.properties.len())?;
    at_least("prediction_list", real, resp.prediction_list.len())?;

    if resp.label_list.len() != resp.label_color_list.len() {
        return Err(PayloadError::length_mismatch(
            "label_color_list",
            resp.label_list.len(),
            resp.label_color_list.len(),
        ));
    }

    if !resp.inv_acc_list.is_empty() {
        at_least("inv_acc_list", real, resp.inv_acc_list.len())?;
    }
    if let Some(ref originals) = resp.original_label_list {
        if !originals.is_empty() {
            at_least("original_label_list", real, originals.len())?;
        }
    }

    within("training_data", &resp.training_data, real)?;
    within("testing_data", &resp.testing_data, real)?;
    within("new_selection", &resp.new_selection, real)?;
    within("noisy_data", &resp.noisy_data, real)?;
    within(
        "selectedPoints",
        &resp.selected_points,
        resp.valid_point_number(),
    )?;

    Ok(())
}

fn at_least(field: &str, expected: usize, got: usize) -> Result<(), PayloadError> {
    if got < expected {
        return Err(PayloadError::length_mismatch(field, expected, got));
    }
    Ok(())
}

fn within(field: &str, indices: &[usize], bound: usize) -> Result<(), PayloadError> {
    match indices.iter().find(|&&i| i >= bound) {
        Some(&index) => Err(PayloadError::index_out_of_range(field, index, bound)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Iteration, PointProperty, Rgb};

    fn valid_payload() -> ProjectionResponse {
        ProjectionResponse {
            result: vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]],
            grid_index: vec![-5.0, -5.0, 5.0, 5.0],
            properties: vec![PointProperty::Labeled; 3],
            label_list: vec!["a".into(), "b".into(), "c".into()],
            label_color_list: vec![Rgb(1, 1, 1); 3],
            prediction_list: vec!["a".into(), "b".into(), "a".into()],
            training_data: vec![0, 1],
            testing_data: vec![2],
            maximum_iteration: Iteration::new(1),
            selected_points: vec![0, 6],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_payload_passes() {
        assert!(validate_projection(&valid_payload()).is_ok());
    }

    #[test]
    fn test_empty_result_rejected() {
        let resp = ProjectionResponse {
            result: vec![],
            ..valid_payload()
        };
        assert!(matches!(
            validate_projection(&resp),
            Err(PayloadError::RequiredField { .. })
        ));
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let mut resp = valid_payload();
        resp.result[1] = [f64::NAN, 0.0];
        assert!(matches!(
            validate_projection(&resp),
            Err(PayloadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_grid_index_length_checked() {
        let resp = ProjectionResponse {
            grid_index: vec![0.0, 1.0],
            ..valid_payload()
        };
        assert!(matches!(
            validate_projection(&resp),
            Err(PayloadError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_short_prediction_list_rejected() {
        let resp = ProjectionResponse {
            prediction_list: vec!["a".into()],
            ..valid_payload()
        };
        let err = validate_projection(&resp).unwrap_err();
        assert!(err.to_string().contains("prediction_list"));
    }

    #[test]
    fn test_label_lists_must_pair() {
        let resp = ProjectionResponse {
            label_color_list: vec![Rgb(1, 1, 1)],
            ..valid_payload()
        };
        assert!(validate_projection(&resp).is_err());
    }

    #[test]
    fn test_training_index_out_of_range() {
        let resp = ProjectionResponse {
            training_data: vec![3],
            ..valid_payload()
        };
        assert!(matches!(
            validate_projection(&resp),
            Err(PayloadError::IndexOutOfRange { index: 3, bound: 3, .. })
        ));
    }

    #[test]
    fn test_selected_points_bounded_by_valid_count() {
        let resp = ProjectionResponse {
            selected_points: vec![7],
            ..valid_payload()
        };
        assert!(validate_projection(&resp).is_err());
    }

    #[test]
    fn test_optional_lists_may_be_empty() {
        let resp = ProjectionResponse {
            inv_acc_list: vec![],
            original_label_list: Some(vec![]),
            ..valid_payload()
        };
        assert!(validate_projection(&resp).is_ok());
    }
}
