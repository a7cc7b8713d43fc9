//! Configuration types for embedscope.
//!
//! The [`Config`] struct controls how a [`Projector`](crate::Projector)
//! talks to the projection server:
//! - Server address and request timeout
//! - Session identity (content path, username)
//! - Projection method, training setting and backdrop resolution
//!
//! # Example
//! ```rust
//! use embedscope::{Config, TrainingSetting};
//!
//! // Use defaults (localhost:5001, normal training setting)
//! let config = Config::default();
//!
//! // Customize for an active-learning session
//! let config = Config {
//!     content_path: "/data/resnet18-cifar10".to_string(),
//!     username: "alice".to_string(),
//!     setting: TrainingSetting::ActiveLearning,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProjectorError;

/// Session configuration options.
///
/// All fields except `content_path` have sensible defaults. Use struct
/// update syntax to override specific settings:
///
/// ```rust
/// use embedscope::Config;
///
/// let config = Config {
///     server_url: "http://10.0.0.5:5001".to_string(),
///     content_path: "/data/run-1".to_string(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the projection server (scheme + host + port).
    pub server_url: String,

    /// Path of the training run on the server side.
    ///
    /// Sent as both `path` and `content_path` on every request.
    pub content_path: String,

    /// Opaque user identifier forwarded to the server.
    pub username: String,

    /// Visualization method name understood by the server (e.g. `"DVI"`).
    pub vis_method: String,

    /// Training setting; controls how labels of unlabeled points are shown.
    pub setting: TrainingSetting,

    /// Backdrop resolution requested from the server.
    ///
    /// Default: 400
    pub resolution: u32,

    /// Per-request timeout in seconds.
    ///
    /// Default: 120
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5001".to_string(),
            content_path: String::new(),
            username: String::new(),
            vis_method: "DVI".to_string(),
            setting: TrainingSetting::Normal,
            resolution: 400,
            request_timeout_secs: 120,
        }
    }
}

impl Config {
    /// Creates a new Config with default settings for the given run.
    pub fn new(content_path: impl Into<String>) -> Self {
        Self {
            content_path: content_path.into(),
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `Projector::new()`.
    ///
    /// # Errors
    /// Returns `ProjectorError::Config` if:
    /// - `server_url` is empty or lacks an `http://`/`https://` scheme
    /// - `content_path` is empty
    /// - `resolution` is 0
    /// - `request_timeout_secs` is 0
    pub fn validate(&self) -> Result<(), ProjectorError> {
        if self.server_url.trim().is_empty() {
            return Err(ProjectorError::config("server_url must not be empty"));
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ProjectorError::config(format!(
                "server_url must start with http:// or https://, got '{}'",
                self.server_url
            )));
        }

        if self.content_path.trim().is_empty() {
            return Err(ProjectorError::config("content_path must not be empty"));
        }

        if self.resolution == 0 {
            return Err(ProjectorError::config("resolution must be greater than 0"));
        }

        if self.request_timeout_secs == 0 {
            return Err(ProjectorError::config(
                "request_timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Returns the request timeout as a [`Duration`].
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Joins the server base URL with an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }
}

/// Training setting of the observed run.
///
/// Serialized as the exact strings the server expects.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrainingSetting {
    /// Ordinary supervised training.
    Normal,
    /// Active learning: only labeled points reveal their labels.
    ActiveLearning,
    /// Dense active learning; same labeling rules as `ActiveLearning`.
    DenseAl,
    /// Any other setting string, passed through verbatim.
    Other(String),
}

impl TrainingSetting {
    /// Returns the wire string for this setting.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Normal => "normal",
            Self::ActiveLearning => "active learning",
            Self::DenseAl => "dense al",
            Self::Other(s) => s,
        }
    }

    /// Returns true if labels are only revealed for labeled points.
    pub fn is_active_learning(&self) -> bool {
        matches!(self, Self::ActiveLearning | Self::DenseAl)
    }
}

impl Default for TrainingSetting {
    fn default() -> Self {
        Self::Normal
    }
}

impl From<String> for TrainingSetting {
    fn from(s: String) -> Self {
        match s.as_str() {
            "normal" => Self::Normal,
            "active learning" => Self::ActiveLearning,
            "dense al" => Self::DenseAl,
            _ => Self::Other(s),
        }
    }
}

impl From<TrainingSetting> for String {
    fn from(s: TrainingSetting) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for TrainingSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
