// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 汇总计数器
///
/// 单写者（调度器控制任务）持有，无需原子类型。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// 成功抓取并写入缓存的URL数
    pub total_scraped: u64,
    /// 当前处于失败状态的URL数
    pub total_failed: u64,
    /// 因已缓存而跳过的URL数
    pub total_cached: u64,
    /// 首次运行开始时间
    pub started_at: DateTime<Utc>,
    /// 最近一次检查点时间
    pub last_updated: DateTime<Utc>,
}

impl Default for RunStats {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            total_scraped: 0,
            total_failed: 0,
            total_cached: 0,
            started_at: now,
            last_updated: now,
        }
    }
}

/// 可恢复的持久化进度
///
/// 调度器独占。静止状态下一个 (vendor, URL) 至多属于 completed 与 failed 之一；
/// cursor 单调不减，只越过已归类的URL。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default)]
    pub completed: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub failed: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub cursor: BTreeMap<String, usize>,
    #[serde(default)]
    pub stats: RunStats,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, vendor: &str, url: &str) -> bool {
        self.completed
            .get(vendor)
            .is_some_and(|set| set.contains(url))
    }

    pub fn is_failed(&self, vendor: &str, url: &str) -> bool {
        self.failed.get(vendor).is_some_and(|set| set.contains(url))
    }

    /// URL 是否已归类（完成或失败）
    pub fn is_classified(&self, vendor: &str, url: &str) -> bool {
        self.is_completed(vendor, url) || self.is_failed(vendor, url)
    }

    /// 标记为完成
    ///
    /// 同时从失败集合中移除，返回该URL此前是否处于失败状态。
    pub fn mark_completed(&mut self, vendor: &str, url: &str) -> bool {
        let was_failed = self.remove_failed(vendor, url);
        self.completed
            .entry(vendor.to_string())
            .or_default()
            .insert(url.to_string());
        was_failed
    }

    /// 标记为失败，返回是否为新增失败
    ///
    /// 已完成的URL不会被降级为失败。
    pub fn mark_failed(&mut self, vendor: &str, url: &str) -> bool {
        if self.is_completed(vendor, url) {
            return false;
        }
        self.failed
            .entry(vendor.to_string())
            .or_default()
            .insert(url.to_string())
    }

    fn remove_failed(&mut self, vendor: &str, url: &str) -> bool {
        let Some(set) = self.failed.get_mut(vendor) else {
            return false;
        };
        let removed = set.remove(url);
        if set.is_empty() {
            self.failed.remove(vendor);
        }
        removed
    }

    /// 厂商的持久化失败URL（按字典序）
    pub fn failed_urls(&self, vendor: &str) -> Vec<String> {
        self.failed
            .get(vendor)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn completed_count(&self, vendor: &str) -> usize {
        self.completed.get(vendor).map_or(0, BTreeSet::len)
    }

    pub fn failed_count(&self, vendor: &str) -> usize {
        self.failed.get(vendor).map_or(0, BTreeSet::len)
    }

    pub fn cursor(&self, vendor: &str) -> usize {
        self.cursor.get(vendor).copied().unwrap_or(0)
    }

    /// 推进游标，只增不减
    pub fn advance_cursor(&mut self, vendor: &str, next_index: usize) {
        let entry = self.cursor.entry(vendor.to_string()).or_insert(0);
        if next_index > *entry {
            *entry = next_index;
        }
    }

    /// 修复静止不变量
    ///
    /// 既完成又失败的URL以完成为准；计数器与失败集合对齐。
    pub fn normalize(&mut self) -> usize {
        let mut repaired = 0;
        for (vendor, done) in &self.completed {
            if let Some(failed) = self.failed.get_mut(vendor) {
                let before = failed.len();
                failed.retain(|url| !done.contains(url));
                repaired += before - failed.len();
            }
        }
        self.failed.retain(|_, set| !set.is_empty());

        let failed_total: usize = self.failed.values().map(BTreeSet::len).sum();
        self.stats.total_failed = failed_total as u64;
        repaired
    }

    /// 忘记某个厂商的全部进度
    pub fn reset_vendor(&mut self, vendor: &str) {
        self.completed.remove(vendor);
        if let Some(failed) = self.failed.remove(vendor) {
            self.stats.total_failed = self
                .stats
                .total_failed
                .saturating_sub(failed.len() as u64);
        }
        self.cursor.remove(vendor);
    }

    /// 出现在进度中的所有厂商
    pub fn vendors(&self) -> BTreeSet<String> {
        self.completed
            .keys()
            .chain(self.failed.keys())
            .chain(self.cursor.keys())
            .cloned()
            .collect()
    }

    pub fn touch(&mut self) {
        self.stats.last_updated = Utc::now();
    }
}
