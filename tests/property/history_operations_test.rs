//! Property-based tests for watch-history and search-history operations.
//!
//! These tests verify that, for arbitrary sequences of views, the stored
//! history carries one entry per distinct stream with the right repeat count
//! and recency order, and that deleting then re-inserting entries restores
//! the history exactly.

use std::collections::HashMap;

use proptest::prelude::*;
use watchlog::clock::ManualClock;
use watchlog::database::Database;
use watchlog::managers::history_manager::{HistoryRecordManager, HistoryRecordManagerTrait};
use watchlog::types::history::StreamItem;

/// Strategy for a sequence of views drawn from a small pool of streams, so
/// repeats are common.
fn arb_views() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(0usize..6, 1..40)
}

fn stream_url(index: usize) -> String {
    format!("https://www.youtube.com/watch?v=video{}", index)
}

// *For any* sequence of views, each distinct stream appears once with a
// repeat count equal to its number of occurrences, ordered by last view.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn view_counts_and_order_follow_the_sequence(views in arb_views()) {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let clock = ManualClock::new(0);
        let mut mgr = HistoryRecordManager::new(db.connection(), &clock);

        let mut counts: HashMap<String, i64> = HashMap::new();
        let mut last_seen: HashMap<String, usize> = HashMap::new();
        for (step, &index) in views.iter().enumerate() {
            clock.advance(1);
            let url = stream_url(index);
            mgr.record_view(&StreamItem::new(0, &url)).unwrap();
            *counts.entry(url.clone()).or_insert(0) += 1;
            last_seen.insert(url, step);
        }

        let history = mgr.stream_history().unwrap();
        prop_assert_eq!(history.len(), counts.len());

        for entry in &history {
            prop_assert_eq!(Some(&entry.repeat_count), counts.get(&entry.stream.url));
        }

        let mut expected: Vec<(&String, &usize)> = last_seen.iter().collect();
        expected.sort_by(|a, b| b.1.cmp(a.1));
        let expected_urls: Vec<&str> = expected.iter().map(|(url, _)| url.as_str()).collect();
        let actual_urls: Vec<&str> = history.iter().map(|e| e.stream.url.as_str()).collect();
        prop_assert_eq!(actual_urls, expected_urls);
    }
}

// *For any* history and any subset of its entries, deleting the subset and
// inserting it back yields the original history.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn delete_then_insert_restores_history(
        views in arb_views(),
        mask in proptest::collection::vec(any::<bool>(), 6),
    ) {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let clock = ManualClock::new(0);
        let mut mgr = HistoryRecordManager::new(db.connection(), &clock);

        for &index in &views {
            clock.advance(1);
            mgr.record_view(&StreamItem::new(0, stream_url(index))).unwrap();
        }
        let before = mgr.stream_history().unwrap();

        let subset: Vec<_> = before
            .iter()
            .enumerate()
            .filter(|(i, _)| mask[*i % mask.len()])
            .map(|(_, e)| e.clone())
            .collect();

        let deleted = mgr.delete_stream_history(&subset).unwrap();
        prop_assert_eq!(deleted, subset.len());
        prop_assert_eq!(mgr.stream_history().unwrap().len(), before.len() - subset.len());

        let inserted = mgr.insert_stream_history(&subset).unwrap();
        prop_assert_eq!(inserted, subset.len());
        prop_assert_eq!(mgr.stream_history().unwrap(), before);
    }
}

// *For any* set of recorded queries, suggestions never repeat a text.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn related_searches_are_distinct(
        queries in proptest::collection::vec("[a-c]{1,3}", 1..30),
    ) {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let clock = ManualClock::new(0);
        let mut mgr = HistoryRecordManager::new(db.connection(), &clock);

        for query in &queries {
            clock.advance(1);
            mgr.record_search(0, query).unwrap();
        }

        let related = mgr.related_searches("", 100, 100).unwrap();
        let mut texts: Vec<&str> = related.iter().map(|e| e.search.as_str()).collect();
        let total = texts.len();
        texts.sort_unstable();
        texts.dedup();
        prop_assert_eq!(texts.len(), total);

        let mut distinct = queries.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(total, distinct.len());
    }
}
