// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};

use crate::domain::models::cache_record::{CacheRecord, UpsertOutcome};
use crate::domain::models::quality::Quality;
use crate::domain::repositories::cache_repository::CacheRepository;
use crate::utils::errors::CacheError;

/// 条件写入脚本
///
/// 在Redis服务端原子执行读改写，多进程并发写同一键时按质量序号裁决。
const UPSERT_IF_NOT_WORSE: &str = r#"
local current = redis.call('HGET', KEYS[1], 'rank')
if current and tonumber(current) > tonumber(ARGV[1]) then
    return 0
end
redis.call('HSET', KEYS[1], 'rank', ARGV[1], 'quality', ARGV[2], 'record', ARGV[3])
return 1
"#;

/// Redis缓存
///
/// 每个URL对应一个哈希：`rank`、`quality`、`record`（JSON）。
#[derive(Clone)]
pub struct RedisCache {
    connection: MultiplexedConnection,
    key_prefix: String,
    script: Script,
}

impl RedisCache {
    /// 创建新的Redis缓存实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    /// * `key_prefix` - 键前缀
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisCache)` - 缓存实例
    /// * `Err(CacheError)` - 连接失败
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            connection,
            key_prefix: key_prefix.into(),
            script: Script::new(UPSERT_IF_NOT_WORSE),
        })
    }

    fn key(&self, url: &str) -> String {
        format!("{}{}", self.key_prefix, url)
    }
}

#[async_trait]
impl CacheRepository for RedisCache {
    async fn exists(&self, url: &str) -> Result<bool, CacheError> {
        let mut con = self.connection.clone();
        let found: bool = con.exists(self.key(url)).await?;
        Ok(found)
    }

    async fn quality(&self, url: &str) -> Result<Option<Quality>, CacheError> {
        let mut con = self.connection.clone();
        let label: Option<String> = con.hget(self.key(url), "quality").await?;
        Ok(label.as_deref().map(Quality::from_label))
    }

    async fn get(&self, url: &str) -> Result<Option<CacheRecord>, CacheError> {
        let mut con = self.connection.clone();
        let raw: Option<String> = con.hget(self.key(url), "record").await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn upsert_if_not_worse(&self, record: CacheRecord) -> Result<UpsertOutcome, CacheError> {
        let mut con = self.connection.clone();
        let encoded = serde_json::to_string(&record)?;

        let written: i32 = self
            .script
            .key(self.key(&record.url))
            .arg(record.quality.rank())
            .arg(record.quality.as_str())
            .arg(encoded)
            .invoke_async(&mut con)
            .await?;

        outcome_from_script(written)
    }
}

/// 脚本返回值：1 已写入，0 保留旧数据
fn outcome_from_script(written: i32) -> Result<UpsertOutcome, CacheError> {
    match written {
        1 => Ok(UpsertOutcome::Replaced),
        0 => Ok(UpsertOutcome::Kept),
        other => Err(CacheError::Other(format!(
            "unexpected upsert script result {}",
            other
        ))),
    }
}
