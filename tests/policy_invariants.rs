// Cross-engine invariant tests: behavior every eviction engine must share,
// exercised through the common trait rather than any one implementation.

use cachemesh::policy::{ArcCache, LfuCache, LruCache};
use cachemesh::{ByteView, CacheEngine};

fn engines(capacity: usize) -> Vec<(&'static str, Box<dyn CacheEngine<ByteView>>)> {
    vec![
        ("lru", Box::new(LruCache::new(capacity))),
        ("lfu", Box::new(LfuCache::new(capacity))),
        ("arc", Box::new(ArcCache::new(capacity))),
    ]
}

#[test]
fn empty_engines_report_empty() {
    for (name, engine) in engines(64) {
        assert_eq!(engine.len(), 0, "{name}");
        assert!(engine.is_empty(), "{name}");
        assert_eq!(engine.current_cost(), 0, "{name}");
        assert_eq!(engine.capacity(), 64, "{name}");
        assert!(!engine.contains("anything"), "{name}");
    }
}

#[test]
fn cost_never_exceeds_capacity_under_churn() {
    for (name, mut engine) in engines(48) {
        for round in 0..6 {
            for i in 0..12 {
                let key = format!("key-{i}");
                let value = ByteView::from(vec![b'x'; (i % 5) + 1]);
                engine.add(&key, value);
                assert!(
                    engine.current_cost() <= 48,
                    "{name}: cost {} over capacity after round {round}",
                    engine.current_cost()
                );
                engine.get(&format!("key-{}", i / 2));
            }
        }
        assert!(engine.len() > 0, "{name}: everything was evicted");
    }
}

#[test]
fn get_returns_what_add_stored() {
    for (name, mut engine) in engines(0) {
        engine.add("k1", ByteView::from("first"));
        engine.add("k2", ByteView::from("second"));
        assert_eq!(
            engine.get("k1").map(ByteView::to_string),
            Some("first".to_owned()),
            "{name}"
        );
        assert_eq!(engine.get("missing"), None, "{name}");
        assert!(engine.contains("k2"), "{name}");
        assert_eq!(engine.len(), 2, "{name}");
    }
}

#[test]
fn updates_replace_without_growing_len() {
    for (name, mut engine) in engines(0) {
        engine.add("k", ByteView::from("old"));
        engine.add("k", ByteView::from("newer"));
        assert_eq!(engine.len(), 1, "{name}");
        assert_eq!(
            engine.get("k").map(ByteView::to_string),
            Some("newer".to_owned()),
            "{name}"
        );
        assert_eq!(engine.current_cost(), 1 + 5, "{name}");
    }
}

#[test]
fn unbounded_engines_accept_everything() {
    for (name, mut engine) in engines(0) {
        for i in 0..256 {
            engine.add(&format!("key-{i}"), ByteView::from("v"));
        }
        assert_eq!(engine.len(), 256, "{name}");
        for i in 0..256 {
            assert!(engine.contains(&format!("key-{i}")), "{name}: key-{i}");
        }
    }
}

#[test]
fn frequently_accessed_keys_survive_scans() {
    // A recency-only engine cannot resist a scan; the frequency-aware
    // engines must.
    let engines: Vec<(&str, Box<dyn CacheEngine<ByteView>>)> = vec![
        ("lfu", Box::new(LfuCache::new(40))),
        ("arc", Box::new(ArcCache::new(40))),
    ];
    for (name, mut engine) in engines {
        engine.add("hot", ByteView::from("vvvv"));
        // Make it unambiguously hot.
        for _ in 0..4 {
            engine.get("hot");
        }
        for i in 0..24 {
            engine.add(&format!("scan-{i}"), ByteView::from("vvvv"));
        }
        assert!(engine.contains("hot"), "{name}: hot key was evicted");
    }
}
