// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 抓取质量等级
///
/// 由抓取服务给出，调度器只消费该标签并据此决定缓存覆盖顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// 所有字段齐全
    Full,
    /// 部分字段
    Partial,
    /// 仅AI兜底提取
    AiOnly,
    /// 抓取失败或结果不可用
    Failed,
    /// 未识别的标签
    #[serde(other)]
    Unknown,
}

impl Quality {
    /// 质量标签对应的序号
    ///
    /// 固定顺序 `failed=0 < ai_only=1 < partial=2 < full=3`，未知标签为 -1。
    pub fn rank(self) -> i32 {
        match self {
            Quality::Full => 3,
            Quality::Partial => 2,
            Quality::AiOnly => 1,
            Quality::Failed => 0,
            Quality::Unknown => -1,
        }
    }

    /// 解析质量标签，大小写不敏感
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "full" => Quality::Full,
            "partial" => Quality::Partial,
            "ai_only" | "ai-only" | "aionly" => Quality::AiOnly,
            "failed" => Quality::Failed,
            _ => Quality::Unknown,
        }
    }

    /// 标签字符串
    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Full => "full",
            Quality::Partial => "partial",
            Quality::AiOnly => "ai_only",
            Quality::Failed => "failed",
            Quality::Unknown => "unknown",
        }
    }

    /// 该质量是否可以写入缓存
    pub fn is_usable(self) -> bool {
        self.rank() > Quality::Failed.rank()
    }

    /// 新质量是否允许覆盖已存质量
    ///
    /// 相同等级允许覆盖，保证后写入的同级数据生效。
    pub fn may_replace(self, existing: Option<Quality>) -> bool {
        match existing {
            Some(existing) => self.rank() >= existing.rank(),
            None => true,
        }
    }
}

/// 按标签计算序号
pub fn rank(label: &str) -> i32 {
    Quality::from_label(label).rank()
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
