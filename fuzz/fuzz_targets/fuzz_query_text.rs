//! Query parsing must never panic, whatever the text.

#![no_main]

use embedscope::{FilterEngine, KeywordQuery, Point, PointStore};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, bool)| {
    let (text, is_regex) = data;
    let _ = KeywordQuery::parse(text);

    let mut store = PointStore::new();
    store.ensure_capacity(4, 0);
    let engine = FilterEngine::new();
    if let Ok((predicate, hits)) = engine.query(&store, text, is_regex, "label") {
        assert!(hits.len() <= store.len());
        let _ = predicate.test(&Point::placeholder(0));
    }
});
