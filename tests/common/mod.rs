//! Shared fixtures: an in-memory projection server and payload builders.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use embedscope::protocol::{
    ProjectionRequest, ProjectionResponse, QueryRequest, QueryResponse, RetrainRequest,
    SpriteRequest, AL_TRAIN, QUERY, SPRITE, UPDATE_PROJECTION,
};
use embedscope::transport::ProjectionTransport;
use embedscope::{Config, Iteration, PointProperty, Projector, Rgb, TransportError};

/// A request as seen by the mock server.
#[derive(Clone, Debug, PartialEq)]
pub enum Recorded {
    Update(ProjectionRequest),
    Query(QueryRequest),
    Train(RetrainRequest),
    Sprite(SpriteRequest),
}

#[derive(Default)]
struct MockState {
    projections: HashMap<Iteration, ProjectionResponse>,
    retrains: VecDeque<ProjectionResponse>,
    selected: Vec<usize>,
    delays: HashMap<Iteration, Duration>,
    fail_update: Option<u16>,
    fail_query: Option<u16>,
    requests: Vec<Recorded>,
}

/// Scripted in-memory server.
///
/// Share it with a projector as `Arc<MockTransport>` and keep a clone to
/// script responses and inspect recorded requests.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serves `resp` for `/updateProjection` at `iteration`.
    pub fn serve(&self, iteration: u32, resp: ProjectionResponse) {
        self.lock()
            .projections
            .insert(Iteration::new(iteration), resp);
    }

    /// Queues `resp` as the next `/al_train` answer.
    pub fn serve_retrain(&self, resp: ProjectionResponse) {
        self.lock().retrains.push_back(resp);
    }

    /// Sets the `/query` answer.
    pub fn select(&self, indices: Vec<usize>) {
        self.lock().selected = indices;
    }

    /// Delays `/updateProjection` at `iteration`.
    pub fn delay(&self, iteration: u32, delay: Duration) {
        self.lock().delays.insert(Iteration::new(iteration), delay);
    }

    /// Makes `/updateProjection` answer with `status` (`None` to recover).
    pub fn fail_update(&self, status: Option<u16>) {
        self.lock().fail_update = status;
    }

    /// Makes `/query` answer with `status` (`None` to recover).
    pub fn fail_query(&self, status: Option<u16>) {
        self.lock().fail_query = status;
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    pub fn count(&self, matches: impl Fn(&Recorded) -> bool) -> usize {
        self.lock().requests.iter().filter(|r| matches(r)).count()
    }

    pub fn updates(&self) -> usize {
        self.count(|r| matches!(r, Recorded::Update(_)))
    }

    pub fn queries(&self) -> usize {
        self.count(|r| matches!(r, Recorded::Query(_)))
    }

    pub fn retrain_requests(&self) -> Vec<RetrainRequest> {
        self.lock()
            .requests
            .iter()
            .filter_map(|r| match r {
                Recorded::Train(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ProjectionTransport for MockTransport {
    async fn update_projection(
        &self,
        request: &ProjectionRequest,
    ) -> Result<ProjectionResponse, TransportError> {
        let (delay, outcome) = {
            let mut state = self.lock();
            state.requests.push(Recorded::Update(request.clone()));
            let delay = state.delays.get(&request.iteration).copied();
            let outcome = match state.fail_update {
                Some(status) => Err(TransportError::status(UPDATE_PROJECTION, status)),
                None => state
                    .projections
                    .get(&request.iteration)
                    .cloned()
                    .ok_or_else(|| TransportError::status(UPDATE_PROJECTION, 404)),
            };
            (delay, outcome)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, TransportError> {
        let mut state = self.lock();
        state.requests.push(Recorded::Query(request.clone()));
        if let Some(status) = state.fail_query {
            return Err(TransportError::status(QUERY, status));
        }
        Ok(QueryResponse {
            selected_points: state.selected.clone(),
        })
    }

    async fn al_train(
        &self,
        request: &RetrainRequest,
    ) -> Result<ProjectionResponse, TransportError> {
        let mut state = self.lock();
        state.requests.push(Recorded::Train(request.clone()));
        state
            .retrains
            .pop_front()
            .ok_or_else(|| TransportError::status(AL_TRAIN, 500))
    }

    async fn sprite(&self, request: &SpriteRequest) -> Result<serde_json::Value, TransportError> {
        let mut state = self.lock();
        state.requests.push(Recorded::Sprite(request.clone()));
        if request.index >= 1_000 {
            return Err(TransportError::status(SPRITE, 404));
        }
        Ok(serde_json::json!({ "imgUrl": format!("data:image/png;base64,{}", request.index) }))
    }
}

/// A consistent payload with `real` points.
///
/// Even indices are training points, odd ones testing. Labels cycle over
/// `cat`, `dog`, `bird`; every third point is mispredicted.
pub fn payload(real: usize, maximum: u32) -> ProjectionResponse {
    let labels = ["cat", "dog", "bird"];
    ProjectionResponse {
        result: (0..real).map(|i| [i as f64, (i * 2) as f64]).collect(),
        grid_index: vec![-50.0, -50.0, 250.0, 250.0],
        grid_color: Some("data:image/png;base64,AAAA".to_string()),
        properties: vec![PointProperty::Labeled; real],
        label_list: (0..real).map(|i| labels[i % 3].to_string()).collect(),
        label_color_list: (0..real).map(|i| Rgb(i as u8, 0, 0)).collect(),
        prediction_list: (0..real)
            .map(|i| {
                if i % 3 == 2 {
                    labels[0].to_string()
                } else {
                    labels[i % 3].to_string()
                }
            })
            .collect(),
        training_data: (0..real).filter(|i| i % 2 == 0).collect(),
        testing_data: (0..real).filter(|i| i % 2 == 1).collect(),
        new_selection: vec![],
        noisy_data: vec![],
        original_label_list: None,
        evaluation: serde_json::json!({ "train_acc": 0.91, "test_acc": 0.87 }),
        inv_acc_list: vec![0.5; real],
        maximum_iteration: Iteration::new(maximum),
        selected_points: vec![0, 1, 2],
    }
}

/// Same as [`payload`] with every position shifted by `dx`.
pub fn shifted_payload(real: usize, maximum: u32, dx: f64) -> ProjectionResponse {
    let mut resp = payload(real, maximum);
    for p in &mut resp.result {
        p[0] += dx;
    }
    resp
}

pub fn config() -> Config {
    Config {
        username: "tester".to_string(),
        ..Config::new("/data/run")
    }
}

/// A projector over a fresh mock server.
pub fn projector() -> (Projector, Arc<MockTransport>) {
    projector_with(config())
}

pub fn projector_with(config: Config) -> (Projector, Arc<MockTransport>) {
    let mock = MockTransport::new();
    let projector = Projector::new(config, Arc::clone(&mock)).unwrap();
    (projector, mock)
}
