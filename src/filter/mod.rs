//! Point filtering.
//!
//! [`FilterEngine`] keeps a chain of standing [`Predicate`]s, all of which
//! must hold, and the last materialized scope (the index list the host is
//! currently showing). Ad-hoc searches build one more predicate from query
//! text and AND it with the chain.
//!
//! Predicates read a point's `current` mirror and label, and evaluation is
//! bounded to the rows of the displayed iteration, so every result is
//! relative to that iteration. Rows hidden by a smaller iteration keep
//! stale metadata and are never visited.

pub mod query;

pub use query::{KeywordQuery, NoisyType, KEYWORDS};

use std::fmt;
use std::sync::Arc;

use regex::RegexBuilder;
use tracing::debug;

use crate::error::{ProjectorError, Result};
use crate::point::Point;
use crate::store::PointStore;

/// A cloneable, thread-safe point predicate.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Point) -> bool + Send + Sync>);

impl Predicate {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Point) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A predicate that matches nothing.
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Evaluates the predicate.
    #[inline]
    pub fn test(&self, point: &Point) -> bool {
        (self.0)(point)
    }

    /// Builds the predicate for a search query.
    ///
    /// In regex mode `text` is a case-insensitive regular expression over
    /// `metadata[field]`. Otherwise it is parsed as a keyword query, falling
    /// back to a case-insensitive substring match over `metadata[field]`
    /// when no keyword is recognized. Blank text matches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectorError::InvalidQuery`] if the regex does not compile.
    pub fn from_query(text: &str, is_regex: bool, field: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::never());
        }

        let field = field.to_string();

        if is_regex {
            let re = RegexBuilder::new(text)
                .case_insensitive(true)
                .build()
                .map_err(|e| ProjectorError::invalid_query(e.to_string()))?;
            return Ok(Self::new(move |p| {
                p.metadata
                    .get(&field)
                    .is_some_and(|v| re.is_match(&v.to_string()))
            }));
        }

        let keywords = KeywordQuery::parse(text);
        if !keywords.is_empty() {
            return Ok(Self::new(move |p| keywords.matches(p)));
        }

        let needle = text.trim().to_lowercase();
        Ok(Self::new(move |p| {
            p.metadata
                .get(&field)
                .is_some_and(|v| v.to_string().to_lowercase().contains(&needle))
        }))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Standing predicate chain plus the last materialized scope.
#[derive(Clone, Debug, Default)]
pub struct FilterEngine {
    predicates: Vec<Predicate>,
    scope: Vec<usize>,
    /// Valid point count of the displayed iteration; `None` spans the store.
    visible: Option<usize>,
}

impl FilterEngine {
    /// Creates an engine with no predicates and an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a standing predicate.
    pub fn add_predicate(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    /// Removes every standing predicate.
    pub fn clear_predicates(&mut self) {
        self.predicates.clear();
    }

    /// Number of standing predicates.
    #[inline]
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    /// The last materialized scope.
    #[inline]
    pub fn scope(&self) -> &[usize] {
        &self.scope
    }

    /// Replaces the materialized scope.
    pub fn set_scope(&mut self, scope: Vec<usize>) {
        self.scope = scope;
    }

    /// Bounds evaluation to the first `valid` rows.
    pub fn set_visible(&mut self, valid: usize) {
        self.visible = Some(valid);
    }

    /// Number of rows queries and scope refreshes walk.
    pub fn visible(&self, store: &PointStore) -> usize {
        self.visible.map_or(store.len(), |v| v.min(store.len()))
    }

    /// Returns true if `point` passes every standing predicate.
    pub fn passes(&self, point: &Point) -> bool {
        self.predicates.iter().all(|p| p.test(point))
    }

    /// Indices of every visible point passing the standing chain.
    pub fn current_scope(&self, store: &PointStore) -> Vec<usize> {
        store
            .iter()
            .take(self.visible(store))
            .filter(|p| self.passes(p))
            .map(|p| p.index)
            .collect()
    }

    /// Runs a search query.
    ///
    /// Returns the compiled query predicate (so the host can promote it to
    /// a standing predicate) and the indices matching it together with the
    /// whole chain. The engine itself is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectorError::InvalidQuery`] for a malformed regex.
    pub fn query(
        &self,
        store: &PointStore,
        text: &str,
        is_regex: bool,
        field: &str,
    ) -> Result<(Predicate, Vec<usize>)> {
        let predicate = Predicate::from_query(text, is_regex, field)?;
        let matches: Vec<usize> = store
            .iter()
            .take(self.visible(store))
            .filter(|p| self.passes(p) && predicate.test(p))
            .map(|p| p.index)
            .collect();
        debug!(query = text, is_regex, field, matches = matches.len(), "Query evaluated");
        Ok((predicate, matches))
    }
}
