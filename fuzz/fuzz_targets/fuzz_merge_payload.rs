//! Arbitrary payloads must either merge completely or leave the engine
//! untouched.

#![no_main]

use embedscope::protocol::ProjectionResponse;
use embedscope::{merge_projection, FilterEngine, Iteration, IterationCache, PointStore};
use embedscope::TrainingSetting;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(resp) = serde_json::from_slice::<ProjectionResponse>(data) else {
        return;
    };

    let mut store = PointStore::new();
    let mut cache = IterationCache::new();
    let mut filter = FilterEngine::new();

    let result = merge_projection(
        &mut store,
        &mut cache,
        &mut filter,
        &TrainingSetting::ActiveLearning,
        Iteration::new(0),
        resp,
    );

    match result {
        Ok(_) => {
            let record = cache.get(Iteration::new(0)).expect("merged iteration is cached");
            assert_eq!(store.len(), record.valid_point_number);
            assert!(store.iter().all(|p| p.snapshot(Iteration::new(0)).is_some()));
        }
        Err(_) => {
            assert!(store.is_empty());
            assert!(cache.is_empty());
        }
    }
});
