// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use harvestrs::domain::models::cache_record::{CacheRecord, UpsertOutcome};
use harvestrs::domain::models::quality::Quality;
use harvestrs::domain::models::scrape_result::{ProductPayload, ScrapeOptions, ScrapeResult};
use harvestrs::domain::repositories::cache_repository::CacheRepository;
use harvestrs::domain::services::cache_gateway::CacheGateway;
use harvestrs::engines::traits::ScrapeClient;
use harvestrs::infrastructure::cache::memory_cache::MemoryCache;
use harvestrs::infrastructure::storage::MemoryProgressStore;
use harvestrs::queue::rate_limiter::RateLimiter;
use harvestrs::queue::scheduler::{RoundRobinScheduler, SchedulerConfig};
use harvestrs::utils::errors::CacheError;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// 预设的单次抓取结果
#[derive(Debug, Clone)]
pub enum Scripted {
    Ok(Quality),
    Fail(&'static str),
}

/// 按URL脚本化的抓取客户端
///
/// 每个URL按顺序消费脚本，脚本耗尽后按 `fallback` 返回。
#[derive(Clone)]
pub struct ScriptedClient {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    fallback: Scripted,
}

#[allow(dead_code)]
impl ScriptedClient {
    pub fn new() -> Self {
        Self::with_fallback(Scripted::Ok(Quality::Full))
    }

    pub fn with_fallback(fallback: Scripted) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fallback,
        }
    }

    pub fn script(&self, url: &str, outcomes: impl IntoIterator<Item = Scripted>) -> &Self {
        self.scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .extend(outcomes);
        self
    }

    /// 调用记录（按发出顺序）
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl ScrapeClient for ScriptedClient {
    async fn scrape(&self, url: &str, _options: ScrapeOptions) -> ScrapeResult {
        self.calls.lock().push(url.to_string());
        let next = self
            .scripts
            .lock()
            .get_mut(url)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        match next {
            Scripted::Ok(quality) => ScrapeResult::from_payload(url, quality, payload(url)),
            Scripted::Fail(reason) => ScrapeResult::failure(url, reason),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// 存在性检查总是未命中的缓存（模拟另一个写入者抢先写入）
#[derive(Clone)]
pub struct BlindCache(pub MemoryCache);

#[async_trait]
impl CacheRepository for BlindCache {
    async fn exists(&self, _url: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn quality(&self, url: &str) -> Result<Option<Quality>, CacheError> {
        self.0.quality(url).await
    }

    async fn get(&self, url: &str) -> Result<Option<CacheRecord>, CacheError> {
        self.0.get(url).await
    }

    async fn upsert_if_not_worse(&self, record: CacheRecord) -> Result<UpsertOutcome, CacheError> {
        self.0.upsert_if_not_worse(record).await
    }
}

pub fn payload(url: &str) -> ProductPayload {
    ProductPayload {
        name: Some(format!("Product {}", url)),
        brand: Some("Acme".to_string()),
        ..Default::default()
    }
}

pub fn named(name: &str) -> ProductPayload {
    ProductPayload {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

pub fn cached(url: &str, quality: Quality) -> CacheRecord {
    CacheRecord::new(url, quality, payload(url))
}

pub fn config(max_parallel: usize) -> SchedulerConfig {
    SchedulerConfig {
        max_parallel,
        retry_cooldown: Duration::ZERO,
        scrape_options: ScrapeOptions::default(),
    }
}

/// 用内存实现组装调度器
pub fn scheduler(
    client: &ScriptedClient,
    cache: Arc<dyn CacheRepository>,
    store: &MemoryProgressStore,
    max_parallel: usize,
) -> RoundRobinScheduler<MemoryProgressStore> {
    RoundRobinScheduler::new(
        Arc::new(client.clone()),
        CacheGateway::new(cache, Duration::from_secs(1)),
        Arc::new(store.clone()),
        RateLimiter::disabled(),
        config(max_parallel),
    )
}
