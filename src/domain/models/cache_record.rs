// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::quality::Quality;
use crate::domain::models::scrape_result::ProductPayload;

/// 缓存记录
///
/// 以URL为键，由共享缓存服务持有。质量只升不降。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub url: String,
    pub quality: Quality,
    /// 跨厂商归并用的身份键
    pub identity_key: Option<String>,
    pub payload: ProductPayload,
    pub updated_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(url: impl Into<String>, quality: Quality, payload: ProductPayload) -> Self {
        Self {
            url: url.into(),
            quality,
            identity_key: payload.identity_key(),
            payload,
            updated_at: Utc::now(),
        }
    }
}

/// 条件写入的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// 新数据已写入（首次写入或质量不低于已有数据）
    Replaced,
    /// 已有数据质量更高，保留旧数据
    Kept,
    /// 存储错误或超时
    Failed,
}

impl UpsertOutcome {
    /// 调度器视角下是否成功
    ///
    /// 保留更优旧数据同样算成功，避免该URL被无限重试。
    pub fn is_success(self) -> bool {
        matches!(self, UpsertOutcome::Replaced | UpsertOutcome::Kept)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UpsertOutcome::Replaced => "replaced",
            UpsertOutcome::Kept => "kept",
            UpsertOutcome::Failed => "failed",
        }
    }
}
