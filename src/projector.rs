//! The projection session.
//!
//! [`Projector`] is the primary interface of the crate. It owns the point
//! table, the iteration cache, the filter chain and the pending retrain
//! feedback of one observed training run, and talks to the projection
//! server through a [`ProjectionTransport`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use embedscope::{Config, Iteration, Projector};
//!
//! let projector = Projector::connect(Config::new("/data/cifar10_run"))?;
//!
//! // First display of an iteration: full projection fetch
//! let step = projector.show_iteration(Iteration::new(1), None).await?;
//!
//! // Search the displayed points
//! let (_, hits) = projector.query("label:cat is_correct_prediction:false", false, "label")?;
//!
//! // Give feedback and retrain
//! projector.mark_interesting(hits[0])?;
//! let step = projector.retrain_pending(Iteration::new(1)).await?;
//! ```
//!
//! # Thread Safety
//!
//! `Projector` is `Send + Sync` and can be shared across tasks using `Arc`.
//! Engine state sits behind one `RwLock` that is never held across an
//! `.await`: requests are built under a read lock, the server call runs
//! unlocked, and each merge is applied under a single write lock.
//!
//! Every display or retrain takes a new generation number. A response that
//! arrives after a newer call has started is discarded with
//! [`ProjectorError::Superseded`] and writes nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{NotFoundError, ProjectorError, Result};
use crate::fetch::{merge_projection, replay_iteration, StepReport};
use crate::filter::{FilterEngine, Predicate};
use crate::iteration::{IterationCache, IterationRecord, IterationState};
use crate::point::Point;
use crate::protocol::{ProjectionRequest, QueryRequest, SpriteRequest};
use crate::retrain::SelectionFeedback;
use crate::store::PointStore;
use crate::transport::ProjectionTransport;
use crate::types::Iteration;

/// Mutable engine state guarded by the projector lock.
#[derive(Debug, Default)]
struct EngineState {
    store: PointStore,
    cache: IterationCache,
    filter: FilterEngine,
    feedback: SelectionFeedback,
    displayed: Option<Iteration>,
}

impl EngineState {
    /// Records a successful display; feedback belongs to one iteration.
    fn mark_displayed(&mut self, iteration: Iteration) {
        if self.displayed != Some(iteration) {
            self.feedback.clear();
        }
        self.displayed = Some(iteration);
    }
}

/// A projection session for one training run.
///
/// Create it with [`Projector::new()`] (any transport) or
/// [`Projector::connect()`] (HTTP).
pub struct Projector {
    /// Server client.
    transport: Box<dyn ProjectionTransport>,

    /// Session configuration.
    config: Config,

    /// Point table, cache, filters and feedback.
    state: RwLock<EngineState>,

    /// Last issued request generation.
    generation: AtomicU64,
}

impl std::fmt::Debug for Projector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projector")
            .field("config", &self.config)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Projector {
    /// Creates a session that talks to the server through `transport`.
    ///
    /// # Errors
    ///
    /// Returns `ProjectorError::Config` if the configuration is invalid
    /// (see [`Config::validate`]).
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use embedscope::{Config, Projector};
    ///
    /// let projector = Projector::new(Config::new("/data/run"), MyTransport::default())?;
    /// ```
    #[instrument(skip(config, transport), fields(content_path = %config.content_path))]
    pub fn new(config: Config, transport: impl ProjectionTransport + 'static) -> Result<Self> {
        config.validate()?;

        info!(
            server = %config.server_url,
            setting = %config.setting,
            vis_method = %config.vis_method,
            "Projection session created"
        );

        Ok(Self {
            transport: Box::new(transport),
            config,
            state: RwLock::new(EngineState::default()),
            generation: AtomicU64::new(0),
        })
    }

    /// Creates a session backed by [`HttpTransport`](crate::transport::HttpTransport).
    ///
    /// # Errors
    ///
    /// Returns `ProjectorError::Config` if the configuration is invalid or
    /// the HTTP client cannot be built.
    #[cfg(feature = "http")]
    pub fn connect(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = crate::transport::HttpTransport::new(&config)?;
        Self::new(config, transport)
    }

    /// Returns the session configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Display
    // =========================================================================

    /// Displays `iteration`.
    ///
    /// An iteration seen before is replayed from cached snapshots after a
    /// lightweight `/query` for the predicates (warm path). Any other
    /// iteration is fetched in full from `/updateProjection` and merged
    /// (cold path). Moving backward or forward in history both work.
    ///
    /// `predicates` is forwarded to the server verbatim; `None` sends `{}`.
    ///
    /// # Errors
    ///
    /// - `ProjectorError::Transport` if the server call fails
    /// - `ProjectorError::Payload` if the payload is malformed
    /// - `ProjectorError::Superseded` if a newer call started meanwhile
    ///
    /// The engine state is unchanged on every error.
    #[instrument(skip_all, fields(iteration = %iteration))]
    pub async fn show_iteration(
        &self,
        iteration: Iteration,
        predicates: Option<serde_json::Value>,
    ) -> Result<StepReport> {
        let generation = self.next_generation();
        let predicates = predicates.unwrap_or_else(|| serde_json::json!({}));
        let cached = self.read()?.cache.contains(iteration);

        let result = if cached {
            self.show_cached(iteration, predicates, generation).await
        } else {
            self.show_uncached(iteration, predicates, generation).await
        };

        match result {
            Ok(ref report) => {
                info!(
                    cached,
                    generation,
                    matches = report.filter_indices.as_ref().map_or(0, Vec::len),
                    "Iteration displayed"
                );
            }
            Err(ref e) if e.is_superseded() => debug!(error = %e, "Stale response dropped"),
            Err(ref e) => warn!(cached, error = %e, "Iteration display failed"),
        }
        result
    }

    /// Like [`show_iteration`](Self::show_iteration), reporting to a callback.
    ///
    /// `on_step` runs exactly once, with [`StepReport::failed()`] on error.
    pub async fn show_iteration_with<F>(
        &self,
        iteration: Iteration,
        predicates: Option<serde_json::Value>,
        on_step: F,
    ) -> Result<StepReport>
    where
        F: FnOnce(StepReport) + Send,
    {
        let result = self.show_iteration(iteration, predicates).await;
        report_to(&result, on_step);
        result
    }

    async fn show_uncached(
        &self,
        iteration: Iteration,
        predicates: serde_json::Value,
        generation: u64,
    ) -> Result<StepReport> {
        let request = ProjectionRequest::new(&self.config, iteration, predicates);
        self.write()?.cache.begin_fetch(iteration);

        let response = self.transport.update_projection(&request).await;

        let mut guard = self.write()?;
        guard.cache.end_fetch(iteration);
        let response = response?;
        self.ensure_current(generation)?;

        let state = &mut *guard;
        let report = merge_projection(
            &mut state.store,
            &mut state.cache,
            &mut state.filter,
            &self.config.setting,
            iteration,
            response,
        )?;
        state.mark_displayed(iteration);
        Ok(report)
    }

    async fn show_cached(
        &self,
        iteration: Iteration,
        predicates: serde_json::Value,
        generation: u64,
    ) -> Result<StepReport> {
        let request = QueryRequest::new(&self.config, iteration, predicates);
        let response = self.transport.query(&request).await?;

        let mut guard = self.write()?;
        self.ensure_current(generation)?;

        let state = &mut *guard;
        let report = replay_iteration(
            &mut state.store,
            &state.cache,
            &mut state.filter,
            iteration,
            response.selected_points,
        )?;
        state.mark_displayed(iteration);
        Ok(report)
    }

    // =========================================================================
    // Retrain
    // =========================================================================

    /// Asks the server to retrain from `iteration` with `feedback`.
    ///
    /// Only indices that are unlabeled at `iteration` are sent. The response
    /// is merged as a new iteration numbered by its `maximum_iteration`;
    /// cached iterations are never renumbered.
    ///
    /// # Errors
    ///
    /// - `NotFoundError::Iteration` if `iteration` was never displayed
    /// - `PayloadError::IterationConflict` if the server reports an
    ///   iteration that is already cached
    /// - the errors of [`show_iteration`](Self::show_iteration)
    #[instrument(skip_all, fields(iteration = %iteration))]
    pub async fn retrain(
        &self,
        iteration: Iteration,
        feedback: &SelectionFeedback,
    ) -> Result<StepReport> {
        let generation = self.next_generation();
        let result = self.retrain_inner(iteration, feedback, generation).await;

        match result {
            Ok(ref report) => info!(
                new_iteration = ?report.iteration,
                generation,
                "Retrain merged"
            ),
            Err(ref e) if e.is_superseded() => debug!(error = %e, "Stale retrain dropped"),
            Err(ref e) => warn!(error = %e, "Retrain failed"),
        }
        result
    }

    /// Like [`retrain`](Self::retrain), reporting to a callback.
    ///
    /// `on_step` runs exactly once, with [`StepReport::failed()`] on error.
    pub async fn retrain_with<F>(
        &self,
        iteration: Iteration,
        feedback: &SelectionFeedback,
        on_step: F,
    ) -> Result<StepReport>
    where
        F: FnOnce(StepReport) + Send,
    {
        let result = self.retrain(iteration, feedback).await;
        report_to(&result, on_step);
        result
    }

    /// Retrains with the feedback collected through
    /// [`mark_interesting`](Self::mark_interesting) and
    /// [`mark_not_interesting`](Self::mark_not_interesting).
    ///
    /// The collected feedback is cleared on success, as after any retrain.
    pub async fn retrain_pending(&self, iteration: Iteration) -> Result<StepReport> {
        let feedback = self.feedback()?;
        self.retrain(iteration, &feedback).await
    }

    async fn retrain_inner(
        &self,
        iteration: Iteration,
        feedback: &SelectionFeedback,
        generation: u64,
    ) -> Result<StepReport> {
        let request = {
            let state = self.read()?;
            let record = state
                .cache
                .get(iteration)
                .ok_or_else(|| NotFoundError::iteration(iteration))?;
            feedback.to_request(&self.config, record)
        };
        debug!(
            accepted = request.acc_indices.len(),
            rejected = request.rej_indices.len(),
            "Sending retrain request"
        );

        let response = self.transport.al_train(&request).await?;
        let new_iteration = response.maximum_iteration;

        let mut guard = self.write()?;
        self.ensure_current(generation)?;

        let state = &mut *guard;
        let report = merge_projection(
            &mut state.store,
            &mut state.cache,
            &mut state.filter,
            &self.config.setting,
            new_iteration,
            response,
        )?;
        state.feedback.clear();
        state.displayed = Some(new_iteration);
        Ok(report)
    }

    // =========================================================================
    // Feedback
    // =========================================================================

    /// Marks a point as interesting for the next retrain.
    pub fn mark_interesting(&self, index: usize) -> Result<()> {
        self.write()?.feedback.accept(index);
        Ok(())
    }

    /// Marks a point as not interesting for the next retrain.
    pub fn mark_not_interesting(&self, index: usize) -> Result<()> {
        self.write()?.feedback.reject(index);
        Ok(())
    }

    /// Returns a copy of the collected feedback.
    pub fn feedback(&self) -> Result<SelectionFeedback> {
        Ok(self.read()?.feedback.clone())
    }

    /// Discards the collected feedback.
    pub fn clear_feedback(&self) -> Result<()> {
        self.write()?.feedback.clear();
        Ok(())
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    /// Runs a search over the displayed points.
    ///
    /// See [`FilterEngine::query`]. The returned predicate can be made
    /// standing with [`add_predicate`](Self::add_predicate).
    pub fn query(&self, text: &str, is_regex: bool, field: &str) -> Result<(Predicate, Vec<usize>)> {
        let state = self.read()?;
        state.filter.query(&state.store, text, is_regex, field)
    }

    /// Appends a standing predicate. The scope is not recomputed until
    /// [`refresh_scope`](Self::refresh_scope) or the next display.
    pub fn add_predicate(&self, predicate: Predicate) -> Result<()> {
        self.write()?.filter.add_predicate(predicate);
        Ok(())
    }

    /// Removes every standing predicate.
    pub fn clear_predicates(&self) -> Result<()> {
        self.write()?.filter.clear_predicates();
        Ok(())
    }

    /// Recomputes the scope from the standing predicates over the displayed
    /// points.
    pub fn refresh_scope(&self) -> Result<Vec<usize>> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let scope = state.filter.current_scope(&state.store);
        state.filter.set_scope(scope.clone());
        Ok(scope)
    }

    /// Returns the last materialized scope.
    pub fn scope(&self) -> Result<Vec<usize>> {
        Ok(self.read()?.filter.scope().to_vec())
    }

    // =========================================================================
    // Sprite
    // =========================================================================

    /// Fetches the sprite payload of a point, unchanged.
    #[instrument(skip(self))]
    pub async fn sprite(&self, index: usize) -> Result<serde_json::Value> {
        let request = SpriteRequest {
            index,
            path: self.config.content_path.clone(),
            username: self.config.username.clone(),
        };
        self.transport.sprite(&request).await.map_err(|e| {
            warn!(error = %e, "Sprite fetch failed");
            ProjectorError::from(e)
        })
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// Number of points ever created.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.store.len())
    }

    /// Returns true if no point was created yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.store.is_empty())
    }

    /// Returns a copy of the point at `index`.
    pub fn point(&self, index: usize) -> Result<Point> {
        self.read()?
            .store
            .get(index)
            .cloned()
            .ok_or_else(|| NotFoundError::point(index).into())
    }

    /// Rendered positions of all points (`None` for hidden ones).
    pub fn rendered_positions(&self) -> Result<Vec<Option<[f64; 3]>>> {
        Ok(self.read()?.store.iter().map(Point::rendered).collect())
    }

    /// Returns a copy of the cached record of `iteration`.
    pub fn record(&self, iteration: Iteration) -> Result<IterationRecord> {
        self.read()?
            .cache
            .get(iteration)
            .cloned()
            .ok_or_else(|| NotFoundError::iteration(iteration).into())
    }

    /// Fetch state of `iteration`.
    pub fn iteration_state(&self, iteration: Iteration) -> Result<IterationState> {
        Ok(self.read()?.cache.state(iteration))
    }

    /// Cached iterations in first-fetch order.
    pub fn available_iterations(&self) -> Result<Vec<Iteration>> {
        Ok(self.read()?.cache.available().to_vec())
    }

    /// Latest iteration reported by the server.
    pub fn maximum_iteration(&self) -> Result<Option<Iteration>> {
        Ok(self.read()?.cache.maximum_iteration())
    }

    /// Iteration shown by the last successful display or retrain.
    pub fn displayed_iteration(&self) -> Result<Option<Iteration>> {
        Ok(self.read()?.displayed)
    }

    /// Last issued request generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        let current = self.generation.load(Ordering::SeqCst);
        if current != generation {
            return Err(ProjectorError::Superseded {
                generation,
                current,
            });
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EngineState>> {
        self.state
            .read()
            .map_err(|_| ProjectorError::state("Engine state lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EngineState>> {
        self.state
            .write()
            .map_err(|_| ProjectorError::state("Engine state lock poisoned"))
    }
}

fn report_to<F: FnOnce(StepReport)>(result: &Result<StepReport>, on_step: F) {
    match result {
        Ok(report) => on_step(report.clone()),
        Err(_) => on_step(StepReport::failed()),
    }
}
