// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{config, Scripted, ScriptedClient};
use harvestrs::domain::models::quality::Quality;
use harvestrs::domain::models::vendor_queue::VendorQueue;
use harvestrs::domain::repositories::progress_repository::ProgressRepository;
use harvestrs::domain::services::cache_gateway::CacheGateway;
use harvestrs::infrastructure::cache::memory_cache::MemoryCache;
use harvestrs::infrastructure::storage::FileProgressStore;
use harvestrs::queue::rate_limiter::RateLimiter;
use harvestrs::queue::scheduler::RoundRobinScheduler;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn file_scheduler(
    client: &ScriptedClient,
    cache: &MemoryCache,
    path: &Path,
) -> RoundRobinScheduler<FileProgressStore> {
    RoundRobinScheduler::new(
        Arc::new(client.clone()),
        CacheGateway::new(Arc::new(cache.clone()), Duration::from_secs(1)),
        Arc::new(FileProgressStore::new(path)),
        RateLimiter::disabled(),
        config(2),
    )
}

fn queues() -> Vec<VendorQueue> {
    vec![
        VendorQueue::new("a.com", ["https://a.com/1", "https://a.com/2"]),
        VendorQueue::new("b.com", ["https://b.com/1"]),
    ]
}

#[tokio::test]
async fn test_progress_document_survives_between_runs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data").join("progress.json");
    let cache = MemoryCache::new();

    let client = ScriptedClient::new();
    client.script("https://b.com/1", [Scripted::Fail("HTTP 500"), Scripted::Fail("HTTP 500")]);
    file_scheduler(&client, &cache, &path)
        .run(&queues())
        .await
        .unwrap();

    let stored = FileProgressStore::new(&path).load().await.unwrap();
    assert_eq!(stored.completed_count("a.com"), 2);
    assert!(stored.is_failed("b.com", "https://b.com/1"));
    assert_eq!(stored.stats.total_scraped, 2);
    assert_eq!(stored.stats.total_failed, 1);

    // Next invocation only touches the carried-over failure
    let second = ScriptedClient::new();
    let summary = file_scheduler(&second, &cache, &path)
        .run(&queues())
        .await
        .unwrap();

    assert_eq!(second.calls(), vec!["https://b.com/1".to_string()]);
    assert_eq!(summary.vendor("b.com").unwrap().scraped, 1);

    let stored = FileProgressStore::new(&path).load().await.unwrap();
    assert!(stored.is_completed("b.com", "https://b.com/1"));
    assert!(stored.failed_urls("b.com").is_empty());
    assert_eq!(stored.stats.total_scraped, 3);
    assert_eq!(stored.stats.total_failed, 0);
}

#[tokio::test]
async fn test_corrupt_progress_document_starts_fresh() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("progress.json");
    tokio::fs::write(&path, b"{\"completed\": {\"a.com\": [\"https://a.c")
        .await
        .unwrap();

    let client = ScriptedClient::new();
    client.script("https://a.com/1", [Scripted::Ok(Quality::Partial)]);
    let summary = file_scheduler(&client, &MemoryCache::new(), &path)
        .run(&queues())
        .await
        .unwrap();

    assert_eq!(summary.scrape_calls, 3);
    assert!(dir.path().join("progress.json.corrupt").exists());

    let stored = FileProgressStore::new(&path).load().await.unwrap();
    assert_eq!(stored.completed_count("a.com"), 2);
    assert_eq!(stored.completed_count("b.com"), 1);
}
