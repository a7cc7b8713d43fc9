//! # embedscope
//!
//! Client-side engine for an interactive embedding projector that follows a
//! model's training run iteration by iteration.
//!
//! A projection server computes 2D positions, labels, predictions and
//! metrics for every sample of a training run at a given iteration.
//! embedscope fetches those payloads, keeps every point it has ever seen in
//! an append-only table with one snapshot per iteration, and lets the host
//! move back and forth through iterations, search points, and send
//! active-learning feedback that makes the server retrain.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use embedscope::{Config, Iteration, Projector, TrainingSetting};
//!
//! let config = Config {
//!     setting: TrainingSetting::ActiveLearning,
//!     ..Config::new("/data/cifar10_run")
//! };
//! let projector = Projector::connect(config)?;
//!
//! // Fetch iteration 1 in full, then iteration 2
//! projector.show_iteration(Iteration::new(1), None).await?;
//! projector.show_iteration(Iteration::new(2), None).await?;
//!
//! // Going back is served from the cache
//! let step = projector.show_iteration(Iteration::new(1), None).await?;
//! println!("{:?}", step.evaluation);
//! ```
//!
//! ## Key Concepts
//!
//! ### Points
//!
//! A **point** has a stable index. Indices below an iteration's real data
//! count are dataset samples; the next four are background corners that
//! span the decision-boundary backdrop.
//!
//! ### Cold and warm display
//!
//! The first display of an iteration downloads the full payload (cold).
//! Later displays only refresh the server-side predicate result and replay
//! positions from stored snapshots (warm).
//!
//! ### Retrain
//!
//! Feedback on unlabeled points is sent to the server, which answers with a
//! new iteration that is merged like a cold fetch.
//!
//! ## Features
//!
//! - `http` (default) - [`HttpTransport`](transport::HttpTransport) backed by `reqwest`
//!
//! ## Thread Safety
//!
//! [`Projector`] is `Send + Sync` and can be shared across tasks using `Arc`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod error;
mod projector;
mod types;

pub mod protocol;
pub mod transport;

// Engine modules
mod fetch;
mod filter;
mod iteration;
mod point;
mod retrain;
mod store;

// ============================================================================
// Public API re-exports
// ============================================================================

// Session interface
pub use projector::Projector;

// Configuration
pub use config::{Config, TrainingSetting};

// Error handling
pub use error::{NotFoundError, PayloadError, ProjectorError, Result, TransportError};

// Core types
pub use types::{Iteration, MetadataValue, PointProperty, Rgb};

// Engine types
pub use fetch::{merge_projection, partition_labels, replay_iteration, StepReport};
pub use filter::{FilterEngine, KeywordQuery, NoisyType, Predicate, KEYWORDS};
pub use iteration::{IterationCache, IterationRecord, IterationState};
pub use point::{
    CurrentState, Point, PointSnapshot, BACKGROUND, LABEL_FIELD, PROJECTION_KEYS, UNLABELED,
};
pub use retrain::SelectionFeedback;
pub use store::{PointStore, RealPointWrite};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common embedscope usage.
///
/// ```rust
/// use embedscope::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, TrainingSetting};
    pub use crate::error::{ProjectorError, Result};
    pub use crate::fetch::StepReport;
    pub use crate::filter::Predicate;
    pub use crate::projector::Projector;
    pub use crate::retrain::SelectionFeedback;
    pub use crate::transport::ProjectionTransport;
    pub use crate::types::Iteration;
}
