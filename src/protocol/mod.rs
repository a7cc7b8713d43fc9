//! Wire types for the projection server protocol.
//!
//! All requests and responses are JSON. Field names follow the server
//! exactly, including its mix of snake_case and camelCase.
//!
//! | Endpoint | Request | Response |
//! |----------|---------|----------|
//! | `POST /updateProjection` | [`ProjectionRequest`] | [`ProjectionResponse`] |
//! | `POST /query` | [`QueryRequest`] | [`QueryResponse`] |
//! | `POST /al_train` | [`RetrainRequest`] | [`ProjectionResponse`] |
//! | `GET /sprite` | [`SpriteRequest`] (query string) | opaque JSON |

mod validation;

pub(crate) use validation::validate_projection;

use serde::{Deserialize, Serialize};

use crate::config::{Config, TrainingSetting};
use crate::types::{Iteration, PointProperty, Rgb};

/// Endpoint path of the full projection fetch.
pub const UPDATE_PROJECTION: &str = "/updateProjection";
/// Endpoint path of the predicate-only query.
pub const QUERY: &str = "/query";
/// Endpoint path of the retrain request.
pub const AL_TRAIN: &str = "/al_train";
/// Endpoint path of the sprite lookup.
pub const SPRITE: &str = "/sprite";

/// Number of background corner points derived from `grid_index`.
pub const GRID_CORNERS: usize = 4;

/// Fixed colors of the four background corners, in corner order.
pub const GRID_COLORS: [Rgb; GRID_CORNERS] = [
    Rgb(137, 120, 117),
    Rgb(136, 119, 116),
    Rgb(136, 118, 115),
    Rgb(135, 117, 114),
];

/// Body of `POST /updateProjection`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRequest {
    /// Training run path (same value as `content_path`).
    pub path: String,
    /// Requested iteration.
    pub iteration: Iteration,
    /// Backdrop resolution.
    pub resolution: u32,
    /// Server-side predicate object, passed through verbatim.
    pub predicates: serde_json::Value,
    /// Opaque user identifier.
    pub username: String,
    /// Visualization method.
    pub vis_method: String,
    /// Training setting.
    pub setting: TrainingSetting,
    /// Training run path.
    pub content_path: String,
}

impl ProjectionRequest {
    /// Builds the request for `iteration` from the session configuration.
    pub fn new(config: &Config, iteration: Iteration, predicates: serde_json::Value) -> Self {
        Self {
            path: config.content_path.clone(),
            iteration,
            resolution: config.resolution,
            predicates,
            username: config.username.clone(),
            vis_method: config.vis_method.clone(),
            setting: config.setting.clone(),
            content_path: config.content_path.clone(),
        }
    }
}

/// Body of `POST /query`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Server-side predicate object, passed through verbatim.
    pub predicates: serde_json::Value,
    /// Training run path.
    pub content_path: String,
    /// Iteration the predicates are evaluated at.
    pub iteration: Iteration,
    /// Opaque user identifier.
    pub username: String,
    /// Visualization method.
    pub vis_method: String,
    /// Training setting.
    pub setting: TrainingSetting,
}

impl QueryRequest {
    /// Builds the query for `iteration` from the session configuration.
    pub fn new(config: &Config, iteration: Iteration, predicates: serde_json::Value) -> Self {
        Self {
            predicates,
            content_path: config.content_path.clone(),
            iteration,
            username: config.username.clone(),
            vis_method: config.vis_method.clone(),
            setting: config.setting.clone(),
        }
    }
}

/// Response of `POST /query`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Indices matching the predicates.
    #[serde(rename = "selectedPoints", default)]
    pub selected_points: Vec<usize>,
}

/// Body of `POST /al_train`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrainRequest {
    /// Working iteration the feedback was given at.
    pub iteration: Iteration,
    /// Unlabeled indices the user accepted as interesting.
    #[serde(rename = "accIndices")]
    pub acc_indices: Vec<usize>,
    /// Unlabeled indices the user rejected.
    #[serde(rename = "rejIndices")]
    pub rej_indices: Vec<usize>,
    /// Training run path.
    pub content_path: String,
    /// Opaque user identifier.
    pub username: String,
}

/// Query string of `GET /sprite`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpriteRequest {
    /// Point index.
    pub index: usize,
    /// Training run path.
    pub path: String,
    /// Opaque user identifier.
    pub username: String,
}

/// Full per-point payload of `/updateProjection` and `/al_train`.
///
/// `label_list` and `label_color_list` are compact: in active-learning
/// settings they only hold entries for labeled points, in point order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResponse {
    /// 2D position of every real point.
    pub result: Vec<[f64; 2]>,
    /// Backdrop bounds `[x_min, y_min, x_max, y_max]`.
    pub grid_index: Vec<f64>,
    /// Opaque backdrop image payload.
    #[serde(default)]
    pub grid_color: Option<String>,
    /// Label category per real point.
    pub properties: Vec<PointProperty>,
    /// Label colors (compact in active-learning settings).
    #[serde(default)]
    pub label_color_list: Vec<Rgb>,
    /// Labels (compact in active-learning settings).
    #[serde(default)]
    pub label_list: Vec<String>,
    /// Prediction per real point.
    pub prediction_list: Vec<String>,
    /// Indices of training points.
    #[serde(default)]
    pub training_data: Vec<usize>,
    /// Indices of testing points.
    #[serde(default)]
    pub testing_data: Vec<usize>,
    /// Indices newly selected at this iteration.
    #[serde(default)]
    pub new_selection: Vec<usize>,
    /// Indices carrying noisy labels.
    #[serde(default)]
    pub noisy_data: Vec<usize>,
    /// Pre-noise label per real point.
    #[serde(default)]
    pub original_label_list: Option<Vec<String>>,
    /// Evaluation metrics, opaque.
    #[serde(default)]
    pub evaluation: serde_json::Value,
    /// Inverse-projection accuracy per real point.
    #[serde(default)]
    pub inv_acc_list: Vec<f64>,
    /// Latest iteration available on the server.
    pub maximum_iteration: Iteration,
    /// Indices matching the request predicates.
    #[serde(rename = "selectedPoints", default)]
    pub selected_points: Vec<usize>,
}

impl ProjectionResponse {
    /// Number of real points in the payload.
    #[inline]
    pub fn real_data_number(&self) -> usize {
        self.result.len()
    }

    /// Total points covered by the payload (real plus background corners).
    #[inline]
    pub fn valid_point_number(&self) -> usize {
        self.result.len() + GRID_CORNERS
    }

    /// The four backdrop corners in corner order.
    ///
    /// Order: `(x_min, y_min)`, `(x_max, y_min)`, `(x_min, y_max)`,
    /// `(x_max, y_max)`. Call only on a validated payload.
    pub fn grid_corners(&self) -> [[f64; 2]; GRID_CORNERS] {
        let g = |i: usize| self.grid_index.get(i).copied().unwrap_or(0.0);
        let (x0, y0, x1, y1) = (g(0), g(1), g(2), g(3));
        [[x0, y0], [x1, y0], [x0, y1], [x1, y1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_request_field_names() {
        let config = Config {
            username: "alice".to_string(),
            ..Config::new("/data/run")
        };
        let req = ProjectionRequest::new(&config, Iteration::new(4), serde_json::json!({}));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["path"], "/data/run");
        assert_eq!(json["content_path"], "/data/run");
        assert_eq!(json["iteration"], 4);
        assert_eq!(json["resolution"], 400);
        assert_eq!(json["setting"], "normal");
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn test_retrain_request_camel_case() {
        let req = RetrainRequest {
            iteration: Iteration::new(2),
            acc_indices: vec![3, 7],
            rej_indices: vec![],
            content_path: "/data/run".to_string(),
            username: String::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["accIndices"], serde_json::json!([3, 7]));
        assert_eq!(json["rejIndices"], serde_json::json!([]));
    }

    #[test]
    fn test_projection_response_defaults() {
        let json = r#"{
            "result": [[0.0, 1.0]],
            "grid_index": [0, 0, 1, 1],
            "properties": [0],
            "prediction_list": ["cat"],
            "maximum_iteration": 5
        }"#;
        let resp: ProjectionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.real_data_number(), 1);
        assert_eq!(resp.valid_point_number(), 5);
        assert!(resp.selected_points.is_empty());
        assert!(resp.evaluation.is_null());
        assert_eq!(resp.maximum_iteration, Iteration::new(5));
    }

    #[test]
    fn test_grid_corners_order() {
        let resp = ProjectionResponse {
            grid_index: vec![-1.0, -2.0, 3.0, 4.0],
            ..Default::default()
        };
        assert_eq!(
            resp.grid_corners(),
            [[-1.0, -2.0], [3.0, -2.0], [-1.0, 4.0], [3.0, 4.0]]
        );
    }

    #[test]
    fn test_query_response_rename() {
        let resp: QueryResponse = serde_json::from_str(r#"{"selectedPoints": [1, 2]}"#).unwrap();
        assert_eq!(resp.selected_points, vec![1, 2]);
    }
}
