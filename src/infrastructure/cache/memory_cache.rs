// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::cache_record::{CacheRecord, UpsertOutcome};
use crate::domain::models::quality::Quality;
use crate::domain::repositories::cache_repository::CacheRepository;
use crate::utils::errors::CacheError;

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub lookups: u64,
    pub hits: u64,
    pub stores: u64,
    pub kept: u64,
}

/// 内存缓存
///
/// 单进程使用或测试使用。条件写入在 DashMap 分片锁内完成，
/// 同键并发写入按质量序号裁决。
#[derive(Clone, Default)]
pub struct MemoryCache {
    records: Arc<DashMap<String, CacheRecord>>,
    stats: Arc<Mutex<CacheStats>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入记录，绕过质量规则
    pub fn seed(&self, record: CacheRecord) {
        self.records.insert(record.url.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }
}

#[async_trait]
impl CacheRepository for MemoryCache {
    async fn exists(&self, url: &str) -> Result<bool, CacheError> {
        let found = self.records.contains_key(url);
        let mut stats = self.stats.lock();
        stats.lookups += 1;
        if found {
            stats.hits += 1;
        }
        Ok(found)
    }

    async fn quality(&self, url: &str) -> Result<Option<Quality>, CacheError> {
        Ok(self.records.get(url).map(|r| r.quality))
    }

    async fn get(&self, url: &str) -> Result<Option<CacheRecord>, CacheError> {
        Ok(self.records.get(url).map(|r| r.clone()))
    }

    async fn upsert_if_not_worse(&self, record: CacheRecord) -> Result<UpsertOutcome, CacheError> {
        let outcome = match self.records.entry(record.url.clone()) {
            Entry::Occupied(mut existing) => {
                if record.quality.may_replace(Some(existing.get().quality)) {
                    existing.insert(record);
                    UpsertOutcome::Replaced
                } else {
                    debug!(
                        "Keeping {} data for {}, rejected {}",
                        existing.get().quality,
                        record.url,
                        record.quality
                    );
                    UpsertOutcome::Kept
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                UpsertOutcome::Replaced
            }
        };

        let mut stats = self.stats.lock();
        match outcome {
            UpsertOutcome::Replaced => stats.stores += 1,
            UpsertOutcome::Kept => stats.kept += 1,
            UpsertOutcome::Failed => {}
        }
        Ok(outcome)
    }
}
