//! Search query parsing.
//!
//! Non-regex queries use a `key:value` keyword syntax, case-insensitive:
//!
//! ```text
//! label:cat,dog prediction:dog is_training:true is_correct_prediction:false
//! noisy_type:flipped original_or_flipped:true
//! ```
//!
//! Several values for one key are comma separated and match if any of them
//! matches. Boolean keys take exactly one of `true`/`false`; other values
//! are ignored. When no keyword is recognized the whole query is matched as
//! a substring of the searched metadata field.

use crate::point::Point;

/// Keywords understood by the query parser.
pub const KEYWORDS: [&str; 9] = [
    "label",
    "prediction",
    "is_training",
    "is_correct_prediction",
    "new_selection",
    "active_learning",
    "is_noisy",
    "noisy_type",
    "original_or_flipped",
];

/// Which noisy samples `noisy_type:` selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoisyType {
    /// The model predicts the pre-noise label.
    Original,
    /// The model predicts the flipped (current) label.
    Flipped,
    /// The model predicts neither.
    Others,
}

/// A parsed keyword query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeywordQuery {
    labels: Option<Vec<String>>,
    predictions: Option<Vec<String>>,
    is_training: Option<bool>,
    is_correct_prediction: Option<bool>,
    new_selection: Option<bool>,
    active_learning: bool,
    is_noisy: Option<bool>,
    noisy_type: Option<NoisyType>,
    original_or_flipped: bool,
}

impl KeywordQuery {
    /// Parses `text`; unknown keys and malformed values are ignored.
    pub fn parse(text: &str) -> Self {
        let mut q = Self::default();
        for token in text.split_whitespace() {
            let Some((key, value)) = token.split_once(':') else {
                continue;
            };
            let key = key.to_lowercase();
            let values: Vec<String> = value
                .trim_matches('"')
                .split(',')
                .filter(|v| !v.is_empty())
                .map(str::to_lowercase)
                .collect();

            match key.as_str() {
                "label" => q.labels.get_or_insert_with(Vec::new).extend(values),
                "prediction" => q.predictions.get_or_insert_with(Vec::new).extend(values),
                "is_training" => q.is_training = single_bool(&values),
                "is_correct_prediction" => q.is_correct_prediction = single_bool(&values),
                "new_selection" => q.new_selection = single_bool(&values),
                "active_learning" => q.active_learning = single_bool(&values) == Some(true),
                "is_noisy" => q.is_noisy = single_bool(&values),
                "noisy_type" => {
                    q.noisy_type = match values.as_slice() {
                        [v] if v == "original" => Some(NoisyType::Original),
                        [v] if v == "flipped" => Some(NoisyType::Flipped),
                        [v] if v == "others" => Some(NoisyType::Others),
                        _ => None,
                    }
                }
                "original_or_flipped" => {
                    q.original_or_flipped = single_bool(&values) == Some(true)
                }
                _ => {}
            }
        }
        q
    }

    /// Returns true if no keyword term was recognized.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Tests a point against every recognized term.
    pub fn matches(&self, p: &Point) -> bool {
        let label = p.label().unwrap_or_default().to_lowercase();
        let prediction = p
            .current
            .prediction
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        if let Some(ref labels) = self.labels {
            if !labels.iter().any(|l| *l == label) {
                return false;
            }
        }

        if let Some(ref predictions) = self.predictions {
            if !predictions.iter().any(|v| *v == prediction) {
                return false;
            }
        }

        if let Some(want) = self.is_training {
            let hit = if want {
                p.current.training == Some(true)
            } else {
                p.current.testing == Some(true)
            };
            if !hit {
                return false;
            }
        }

        if let Some(want) = self.is_correct_prediction {
            match p.current.wrong_prediction {
                Some(wrong) if wrong != want => {}
                _ => return false,
            }
        }

        if let Some(want) = self.new_selection {
            if p.current.new_selection != Some(want) {
                return false;
            }
        }

        if self.active_learning
            && p.current.new_selection != Some(true)
            && p.current.training != Some(true)
        {
            return false;
        }

        if let Some(want) = self.is_noisy {
            if p.current.noisy != Some(want) {
                return false;
            }
        }

        let original = p
            .original_label
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        if let Some(kind) = self.noisy_type {
            if p.current.noisy != Some(true) {
                return false;
            }
            let hit = match kind {
                NoisyType::Original => original == prediction,
                NoisyType::Flipped => prediction == label,
                NoisyType::Others => prediction != label && original != prediction,
            };
            if !hit {
                return false;
            }
        }

        if self.original_or_flipped
            && (p.current.noisy != Some(true) || (original != prediction && prediction != label))
        {
            return false;
        }

        true
    }
}

fn single_bool(values: &[String]) -> Option<bool> {
    match values {
        [v] if v == "true" => Some(true),
        [v] if v == "false" => Some(false),
        _ => None,
    }
}
