// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{cached, named, scheduler, BlindCache, Scripted, ScriptedClient};
use harvestrs::domain::models::cache_record::CacheRecord;
use harvestrs::domain::models::progress::ProgressState;
use harvestrs::domain::models::quality::Quality;
use harvestrs::domain::models::vendor_queue::VendorQueue;
use harvestrs::domain::repositories::cache_repository::CacheRepository;
use harvestrs::infrastructure::cache::memory_cache::MemoryCache;
use harvestrs::infrastructure::storage::MemoryProgressStore;
use std::collections::BTreeSet;
use std::sync::Arc;

fn set(urls: &[&str]) -> BTreeSet<String> {
    urls.iter().map(|u| u.to_string()).collect()
}

#[tokio::test]
async fn test_cached_urls_are_skipped_and_only_misses_are_scraped() {
    let cache = MemoryCache::new();
    cache.seed(cached("u1", Quality::Partial));
    cache.seed(cached("u3", Quality::AiOnly));

    let client = ScriptedClient::new();
    client.script("u2", [Scripted::Ok(Quality::Full)]);
    let store = MemoryProgressStore::new();

    let queues = vec![
        VendorQueue::new("a.com", ["u1", "u2"]),
        VendorQueue::new("b.com", ["u3"]),
    ];
    let summary = scheduler(&client, Arc::new(cache.clone()), &store, 2)
        .run(&queues)
        .await
        .unwrap();

    assert_eq!(client.calls(), vec!["u2".to_string()]);
    assert_eq!(cache.stats().stores, 1);

    let progress = store.latest().unwrap();
    assert_eq!(progress.completed["a.com"], set(&["u1", "u2"]));
    assert_eq!(progress.completed["b.com"], set(&["u3"]));
    assert_eq!(progress.stats.total_scraped, 1);
    assert_eq!(progress.stats.total_cached, 2);
    assert_eq!(progress.stats.total_failed, 0);

    let a = summary.vendor("a.com").unwrap();
    assert_eq!((a.scraped, a.failed, a.skipped), (1, 0, 1));
    let b = summary.vendor("b.com").unwrap();
    assert_eq!((b.scraped, b.failed, b.skipped), (0, 0, 1));
}

#[tokio::test]
async fn test_lower_quality_result_keeps_existing_record_and_completes() {
    let memory = MemoryCache::new();
    memory.seed(CacheRecord::new("u", Quality::Partial, named("P1")));

    let client = ScriptedClient::new();
    client.script("u", [Scripted::Ok(Quality::AiOnly)]);
    let store = MemoryProgressStore::new();

    let summary = scheduler(&client, Arc::new(BlindCache(memory.clone())), &store, 1)
        .run(&[VendorQueue::new("a.com", ["u"])])
        .await
        .unwrap();

    assert_eq!(client.calls_for("u"), 1);
    assert_eq!(summary.total_scraped(), 1);
    assert_eq!(summary.total_failed(), 0);

    let record = memory.get("u").await.unwrap().unwrap();
    assert_eq!(record.quality, Quality::Partial);
    assert_eq!(record.payload.name.as_deref(), Some("P1"));

    let progress = store.latest().unwrap();
    assert!(progress.is_completed("a.com", "u"));
    assert!(!progress.is_failed("a.com", "u"));
}

#[tokio::test]
async fn test_higher_quality_result_replaces_existing_record() {
    let memory = MemoryCache::new();
    memory.seed(cached("u", Quality::AiOnly));

    let client = ScriptedClient::new();
    client.script("u", [Scripted::Ok(Quality::Full)]);
    let store = MemoryProgressStore::new();

    scheduler(&client, Arc::new(BlindCache(memory.clone())), &store, 1)
        .run(&[VendorQueue::new("a.com", ["u"])])
        .await
        .unwrap();

    let record = memory.get("u").await.unwrap().unwrap();
    assert_eq!(record.quality, Quality::Full);
}

#[tokio::test]
async fn test_each_vendor_gets_one_item_per_round() {
    let client = ScriptedClient::new();
    let store = MemoryProgressStore::new();
    let queues = vec![
        VendorQueue::new("a.com", ["a1", "a2", "a3"]),
        VendorQueue::new("b.com", ["b1"]),
        VendorQueue::new("c.com", ["c1", "c2"]),
    ];

    // Sequential so the call log is the dispatch order
    scheduler(&client, Arc::new(MemoryCache::new()), &store, 1)
        .run(&queues)
        .await
        .unwrap();

    assert_eq!(
        client.calls(),
        vec!["a1", "b1", "c1", "a2", "c2", "a3"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_fresh_failure_is_retried_once_at_end_of_run() {
    let client = ScriptedClient::with_fallback(Scripted::Fail("HTTP 503"));
    let store = MemoryProgressStore::new();
    let queues = vec![VendorQueue::new("a.com", ["bad", "other"])];
    client.script("other", [Scripted::Ok(Quality::Full)]);

    let summary = scheduler(&client, Arc::new(MemoryCache::new()), &store, 2)
        .run(&queues)
        .await
        .unwrap();

    assert_eq!(client.calls_for("bad"), 2);
    // The retry comes after every fresh URL
    assert_eq!(client.calls().last().map(String::as_str), Some("bad"));

    let a = summary.vendor("a.com").unwrap();
    assert_eq!((a.scraped, a.failed, a.skipped), (1, 1, 0));

    let progress = store.latest().unwrap();
    assert!(progress.is_failed("a.com", "bad"));
    assert_eq!(progress.stats.total_failed, 1);
    assert_eq!(progress.cursor("a.com"), 2);
}

#[tokio::test]
async fn test_end_of_run_retry_success_flips_counts() {
    let client = ScriptedClient::new();
    client.script("flaky", [Scripted::Fail("timeout"), Scripted::Ok(Quality::Partial)]);
    let store = MemoryProgressStore::new();

    let summary = scheduler(&client, Arc::new(MemoryCache::new()), &store, 2)
        .run(&[VendorQueue::new("a.com", ["flaky"])])
        .await
        .unwrap();

    assert_eq!(client.calls_for("flaky"), 2);
    let a = summary.vendor("a.com").unwrap();
    assert_eq!((a.scraped, a.failed), (1, 0));

    let progress = store.latest().unwrap();
    assert!(progress.is_completed("a.com", "flaky"));
    assert!(!progress.is_failed("a.com", "flaky"));
    assert_eq!(progress.stats.total_scraped, 1);
    assert_eq!(progress.stats.total_failed, 0);
}

#[tokio::test]
async fn test_fresh_failure_is_classified_at_its_own_checkpoint() {
    let client = ScriptedClient::with_fallback(Scripted::Fail("boom"));
    let store = MemoryProgressStore::new();

    scheduler(&client, Arc::new(MemoryCache::new()), &store, 1)
        .run(&[VendorQueue::new("a.com", ["bad"])])
        .await
        .unwrap();

    let checkpoints = store.checkpoints();
    let first = &checkpoints[0];
    assert!(first.is_failed("a.com", "bad"));
    assert_eq!(first.cursor("a.com"), 1);
}

#[tokio::test]
async fn test_carryover_failures_go_first_and_fail_at_most_once_more() {
    let mut previous = ProgressState::new();
    previous.mark_failed("a.com", "old");
    previous.stats.total_failed = 1;

    let client = ScriptedClient::new();
    client.script("old", [Scripted::Fail("still down")]);
    let store = MemoryProgressStore::with_state(previous);

    let summary = scheduler(&client, Arc::new(MemoryCache::new()), &store, 1)
        .run(&[VendorQueue::new("a.com", ["old", "new"])])
        .await
        .unwrap();

    // Retry queue first, then the cursor; the queued copy of "old" is already classified
    assert_eq!(client.calls(), vec!["old".to_string(), "new".to_string()]);
    assert_eq!(client.calls_for("old"), 1);

    let a = summary.vendor("a.com").unwrap();
    assert_eq!((a.scraped, a.failed), (1, 1));

    let progress = store.latest().unwrap();
    assert!(progress.is_failed("a.com", "old"));
    assert!(progress.is_completed("a.com", "new"));
    assert_eq!(progress.stats.total_failed, 1);
}

#[tokio::test]
async fn test_failed_url_found_in_cache_moves_to_completed() {
    let mut previous = ProgressState::new();
    previous.mark_failed("a.com", "u");
    previous.stats.total_failed = 1;

    let cache = MemoryCache::new();
    cache.seed(cached("u", Quality::Full));
    let client = ScriptedClient::new();
    let store = MemoryProgressStore::with_state(previous);

    let summary = scheduler(&client, Arc::new(cache), &store, 2)
        .run(&[VendorQueue::new("a.com", ["u"])])
        .await
        .unwrap();

    assert!(client.calls().is_empty());
    assert_eq!(summary.vendor("a.com").unwrap().skipped, 1);

    let progress = store.latest().unwrap();
    assert!(progress.is_completed("a.com", "u"));
    assert!(!progress.is_failed("a.com", "u"));
    assert_eq!(progress.stats.total_failed, 0);
    assert_eq!(progress.stats.total_cached, 1);
}

#[tokio::test]
async fn test_completed_urls_are_never_scraped_again() {
    let client = ScriptedClient::new();
    let store = MemoryProgressStore::new();
    let cache = Arc::new(MemoryCache::new());
    let queues = vec![
        VendorQueue::new("a.com", ["a1", "a2"]),
        VendorQueue::new("b.com", ["b1"]),
    ];

    scheduler(&client, cache.clone(), &store, 2)
        .run(&queues)
        .await
        .unwrap();
    assert_eq!(client.calls().len(), 3);

    let second = ScriptedClient::new();
    let summary = scheduler(&second, cache, &store, 2)
        .run(&queues)
        .await
        .unwrap();

    assert!(second.calls().is_empty());
    assert_eq!(summary.scrape_calls, 0);
    assert_eq!(summary.total_skipped(), 0);
}

#[tokio::test]
async fn test_cursors_never_decrease_across_checkpoints() {
    let client = ScriptedClient::new();
    client.script("a2", [Scripted::Fail("x"), Scripted::Fail("x")]);
    client.script("b2", [Scripted::Fail("x"), Scripted::Ok(Quality::AiOnly)]);
    let cache = MemoryCache::new();
    cache.seed(cached("a3", Quality::Full));
    let store = MemoryProgressStore::new();

    let queues = vec![
        VendorQueue::new("a.com", ["a1", "a2", "a3", "a4"]),
        VendorQueue::new("b.com", ["b1", "b2"]),
        VendorQueue::new("c.com", ["c1", "c2", "c3"]),
    ];
    scheduler(&client, Arc::new(cache), &store, 2)
        .run(&queues)
        .await
        .unwrap();

    let checkpoints = store.checkpoints();
    assert!(checkpoints.len() > 3);
    for pair in checkpoints.windows(2) {
        for vendor in ["a.com", "b.com", "c.com"] {
            assert!(pair[1].cursor(vendor) >= pair[0].cursor(vendor));
        }
    }
    for checkpoint in &checkpoints {
        for (vendor, failed) in &checkpoint.failed {
            for url in failed {
                assert!(!checkpoint.is_completed(vendor, url));
            }
        }
    }

    let last = checkpoints.last().unwrap();
    assert_eq!(last.cursor("a.com"), 4);
    assert_eq!(last.cursor("b.com"), 2);
    assert_eq!(last.cursor("c.com"), 3);
}

#[tokio::test]
async fn test_restart_from_any_checkpoint_redoes_at_most_one_batch() {
    let queues = vec![
        VendorQueue::new("a.com", ["a1", "a2", "a3"]),
        VendorQueue::new("b.com", ["b1", "b2"]),
        VendorQueue::new("c.com", ["c1"]),
    ];
    let max_parallel = 2;

    let client = ScriptedClient::new();
    let store = MemoryProgressStore::new();
    scheduler(&client, Arc::new(MemoryCache::new()), &store, max_parallel)
        .run(&queues)
        .await
        .unwrap();
    let checkpoints = store.checkpoints();

    for snapshot in checkpoints.iter().take(checkpoints.len() - 1) {
        // Empty cache so every redo shows up as a scrape call
        let resumed_client = ScriptedClient::new();
        let resumed_store = MemoryProgressStore::with_state(snapshot.clone());
        scheduler(
            &resumed_client,
            Arc::new(MemoryCache::new()),
            &resumed_store,
            max_parallel,
        )
        .run(&queues)
        .await
        .unwrap();

        for url in resumed_client.calls() {
            let vendor = queues
                .iter()
                .find(|q| q.urls.iter().any(|u| *u == url))
                .map(|q| q.vendor.clone())
                .unwrap();
            assert!(!snapshot.is_completed(&vendor, &url), "{} re-scraped", url);
        }

        let resumed = resumed_store.latest().unwrap();
        for q in &queues {
            assert!(resumed.cursor(&q.vendor) >= snapshot.cursor(&q.vendor));
            assert_eq!(resumed.completed_count(&q.vendor), q.len());
        }
    }
}

#[tokio::test]
async fn test_unseen_vendors_in_progress_are_left_untouched() {
    let mut previous = ProgressState::new();
    previous.mark_completed("gone.com", "g1");
    previous.mark_failed("gone.com", "g2");
    previous.stats.total_failed = 1;

    let client = ScriptedClient::new();
    let store = MemoryProgressStore::with_state(previous);
    scheduler(&client, Arc::new(MemoryCache::new()), &store, 2)
        .run(&[VendorQueue::new("a.com", ["a1"])])
        .await
        .unwrap();

    assert_eq!(client.calls(), vec!["a1".to_string()]);
    let progress = store.latest().unwrap();
    assert!(progress.is_completed("gone.com", "g1"));
    assert!(progress.is_failed("gone.com", "g2"));
}
