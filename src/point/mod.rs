//! Point records.
//!
//! A **point** is identified by a stable index equal to its position in the
//! [`PointStore`](crate::store::PointStore) at creation. Whether a point is
//! real data or a background corner depends on the iteration: it is real
//! when `index < real_data_number(iteration)`.

pub mod types;

pub use types::{
    CurrentState, Point, PointSnapshot, BACKGROUND, LABEL_FIELD, PROJECTION_KEYS, UNLABELED,
};
