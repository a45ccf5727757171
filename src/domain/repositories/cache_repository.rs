// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

use crate::domain::models::cache_record::{CacheRecord, UpsertOutcome};
use crate::domain::models::quality::Quality;
use crate::utils::errors::CacheError;

/// 缓存仓库特质
///
/// 共享缓存存储的最小接口。实现必须保证同一键的并发条件写入
/// 按相同的质量序号规则裁决（事务性读改写或原子条件更新）。
#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// 检查URL是否已有缓存记录
    async fn exists(&self, url: &str) -> Result<bool, CacheError>;

    /// 读取已存质量
    async fn quality(&self, url: &str) -> Result<Option<Quality>, CacheError>;

    /// 读取完整记录
    async fn get(&self, url: &str) -> Result<Option<CacheRecord>, CacheError>;

    /// 条件写入：新质量序号不低于已存序号时写入，否则不做任何修改
    async fn upsert_if_not_worse(&self, record: CacheRecord) -> Result<UpsertOutcome, CacheError>;
}
