//! Core type definitions shared across embedscope modules.
//!
//! This module defines the iteration identifier, the color type used for
//! per-point rendering, point metadata values, and the server's per-point
//! label category.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Training iteration (checkpoint) identifier.
///
/// Iterations are not necessarily contiguous: a retrain may produce an
/// iteration number far ahead of the last displayed one.
///
/// # Example
/// ```
/// use embedscope::Iteration;
///
/// let it = Iteration::new(12);
/// assert_eq!(it.get(), 12);
/// assert_eq!(it.to_string(), "12");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Iteration(pub u32);

impl Iteration {
    /// Creates an iteration from its number.
    #[inline]
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    /// Returns the raw iteration number.
    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Iteration {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

impl fmt::Display for Iteration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 8-bit RGB color.
///
/// The server sends colors as `[r, g, b]` triples; the renderer consumes
/// `#rrggbb` strings via [`Rgb::hex`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Gray used for points that are not labeled yet.
    pub const UNLABELED: Rgb = Rgb(204, 204, 204);

    /// Returns the `#rrggbb` hex string.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        [c.0, c.1, c.2]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// A single metadata field value (string or number).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Numeric field.
    Number(f64),
    /// Free-text field.
    Text(String),
}

impl MetadataValue {
    /// Returns the text value, if this is a text field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Label category the server assigns to each real point at an iteration.
///
/// Wire encoding: `0` labeled, `1` unlabeled, `2` testing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PointProperty {
    /// Part of the labeled training pool.
    Labeled,
    /// Not labeled yet; eligible for retrain feedback.
    Unlabeled,
    /// Held-out testing sample.
    Testing,
}

impl TryFrom<u8> for PointProperty {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Labeled),
            1 => Ok(Self::Unlabeled),
            2 => Ok(Self::Testing),
            other => Err(format!("unknown point property {}", other)),
        }
    }
}

impl From<PointProperty> for u8 {
    fn from(p: PointProperty) -> Self {
        match p {
            PointProperty::Labeled => 0,
            PointProperty::Unlabeled => 1,
            PointProperty::Testing => 2,
        }
    }
}
