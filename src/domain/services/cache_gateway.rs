// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::models::cache_record::{CacheRecord, UpsertOutcome};
use crate::domain::models::quality::Quality;
use crate::domain::models::scrape_result::ProductPayload;
use crate::domain::repositories::cache_repository::CacheRepository;
use crate::utils::errors::CacheError;

/// 缓存网关
///
/// 调度器访问共享缓存的唯一入口：
/// - `exists` 查询失败时按"未缓存"处理（宁可多抓一次，也不静默跳过）；
/// - `upsert` 执行质量序号合并，质量只升不降。
#[derive(Clone)]
pub struct CacheGateway {
    store: Arc<dyn CacheRepository>,
    timeout: Duration,
}

impl CacheGateway {
    /// 创建新的缓存网关
    ///
    /// # 参数
    ///
    /// * `store` - 缓存存储
    /// * `timeout` - 单次缓存操作超时
    pub fn new(store: Arc<dyn CacheRepository>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// 检查URL是否已缓存
    ///
    /// 允许假阴性，不允许假阳性。
    pub async fn exists(&self, url: &str) -> bool {
        match self.bounded(self.store.exists(url)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(url, "Cache lookup failed, treating as not cached: {}", e);
                false
            }
        }
    }

    /// 按质量序号条件写入
    ///
    /// # 返回值
    ///
    /// * `Replaced` - 首次写入或新质量不低于已有质量
    /// * `Kept` - 已有数据更优，保留旧数据（对调度器同样是成功）
    /// * `Failed` - 存储错误、超时，或质量不可写入
    pub async fn upsert(&self, url: &str, quality: Quality, payload: ProductPayload) -> UpsertOutcome {
        if !quality.is_usable() {
            warn!(url, %quality, "Refusing to cache unusable scrape result");
            return UpsertOutcome::Failed;
        }

        match self.bounded(self.store.quality(url)).await {
            Ok(existing) if !quality.may_replace(existing) => {
                debug!(
                    url,
                    new = %quality,
                    existing = ?existing,
                    "Existing cache entry outranks new result, keeping it"
                );
                return UpsertOutcome::Kept;
            }
            Ok(_) => {}
            Err(e) => {
                // The conditional write below still enforces the rank rule
                debug!(url, "Cache quality read failed: {}", e);
            }
        }

        let record = CacheRecord::new(url, quality, payload);
        match self.bounded(self.store.upsert_if_not_worse(record)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url, "Cache write failed: {}", e);
                UpsertOutcome::Failed
            }
        }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match timeout(self.timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        }
    }
}

#[cfg(test)]
#[path = "cache_gateway_test.rs"]
mod tests;
