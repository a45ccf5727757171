// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::{HashSet, VecDeque};

use crate::domain::models::progress::ProgressState;
use crate::domain::models::vendor_queue::VendorQueue;

/// 工作项来源
///
/// 决定失败后的去向：
/// - `Fresh` 失败后写入失败集合并进入本次运行末尾的一次性重试；
/// - `Carryover`（上次运行遗留的失败）与 `FinalRetry` 失败即为本次运行的最终结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOrigin {
    Fresh,
    Carryover,
    FinalRetry,
}

/// 一个待处理的 (vendor, URL)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub vendor: String,
    pub url: String,
    pub origin: WorkOrigin,
    /// 在厂商队列中的位置（仅 Fresh 有）
    pub queue_index: Option<usize>,
}

impl WorkItem {
    pub fn final_retry(mut self) -> Self {
        self.origin = WorkOrigin::FinalRetry;
        self
    }
}

/// 单个厂商的调度通道
///
/// 持有重试队列和游标。重试队列优先于游标尚未到达的URL。
#[derive(Debug)]
pub struct VendorLane {
    queue: VendorQueue,
    retry: VecDeque<String>,
    next_index: usize,
}

impl VendorLane {
    /// 根据持久化进度建立通道
    ///
    /// 重试队列来自上次运行的 `failed[vendor]`。
    pub fn new(queue: VendorQueue, progress: &ProgressState) -> Self {
        let retry = progress.failed_urls(&queue.vendor).into_iter().collect();
        let next_index = progress.cursor(&queue.vendor).min(queue.len());
        Self {
            queue,
            retry,
            next_index,
        }
    }

    pub fn vendor(&self) -> &str {
        &self.queue.vendor
    }

    pub fn retry_len(&self) -> usize {
        self.retry.len()
    }

    /// 游标之后仍未归类的不同URL数量
    ///
    /// 重复出现的URL只会被处理一次，也只计一次。
    pub fn pending_fresh(&self, progress: &ProgressState) -> usize {
        self.queue.urls[self.next_index..]
            .iter()
            .filter(|url| !progress.is_classified(&self.queue.vendor, url))
            .map(String::as_str)
            .collect::<HashSet<_>>()
            .len()
    }

    /// 从重试队列中移除（已被其他路径完成）
    pub fn forget_retry(&mut self, url: &str) {
        self.retry.retain(|u| u != url);
    }

    /// 取出该厂商的下一个工作项
    ///
    /// 先取重试队列；否则推进游标，跳过已完成或已失败的URL。
    /// 跳过的URL已经归类，持久化游标随之前移。
    pub fn next_item(&mut self, progress: &mut ProgressState) -> Option<WorkItem> {
        while let Some(url) = self.retry.pop_front() {
            if progress.is_completed(&self.queue.vendor, &url) {
                continue;
            }
            return Some(WorkItem {
                vendor: self.queue.vendor.clone(),
                url,
                origin: WorkOrigin::Carryover,
                queue_index: None,
            });
        }

        while self.next_index < self.queue.len() {
            let index = self.next_index;
            self.next_index += 1;
            let url = &self.queue.urls[index];

            if progress.is_classified(&self.queue.vendor, url) {
                progress.advance_cursor(&self.queue.vendor, index + 1);
                continue;
            }

            return Some(WorkItem {
                vendor: self.queue.vendor.clone(),
                url: url.clone(),
                origin: WorkOrigin::Fresh,
                queue_index: Some(index),
            });
        }

        None
    }
}

/// 构建一轮工作
///
/// 按输入顺序每个有待处理工作的厂商恰好一项。返回空表示全部耗尽。
pub fn build_round(lanes: &mut [VendorLane], progress: &mut ProgressState) -> Vec<WorkItem> {
    lanes
        .iter_mut()
        .filter_map(|lane| lane.next_item(progress))
        .collect()
}
