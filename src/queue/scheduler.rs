// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::models::cache_record::UpsertOutcome;
use crate::domain::models::progress::ProgressState;
use crate::domain::models::run_summary::{RunSummary, VendorSummary};
use crate::domain::models::scrape_result::ScrapeOptions;
use crate::domain::models::vendor_queue::VendorQueue;
use crate::domain::repositories::progress_repository::ProgressRepository;
use crate::domain::services::cache_gateway::CacheGateway;
use crate::engines::traits::ScrapeClient;
use crate::infrastructure::metrics;
use crate::queue::lane::{build_round, VendorLane, WorkItem, WorkOrigin};
use crate::queue::rate_limiter::RateLimiter;
use crate::utils::errors::ProgressStoreError;

/// 调度器配置
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// 同时在途的远程调用上限
    pub max_parallel: usize,
    /// 末尾重试前的冷却时间
    pub retry_cooldown: Duration,
    /// 抓取选项
    pub scrape_options: ScrapeOptions,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            retry_cooldown: Duration::from_secs(30),
            scrape_options: ScrapeOptions {
                skip_ai_fallback: true,
            },
        }
    }
}

/// 单个未缓存工作项的处理结果
#[derive(Debug)]
enum Attempt {
    /// 抓取成功且缓存写入成功（含保留更优旧数据）
    Stored(UpsertOutcome),
    /// 抓取失败或缓存写入失败
    Failed(String),
}

/// 一次运行的可变状态
///
/// 只在控制任务上、批次汇合之后修改，不需要锁。
struct RunState {
    progress: ProgressState,
    lanes: Vec<VendorLane>,
    lane_index: HashMap<String, usize>,
    summaries: Vec<VendorSummary>,
    final_retry: Vec<WorkItem>,
    scrape_calls: u64,
    planned: u64,
    processed: u64,
    batches: u64,
}

impl RunState {
    fn summary_mut(&mut self, vendor: &str) -> &mut VendorSummary {
        let idx = self.lane_index[vendor];
        &mut self.summaries[idx]
    }

    fn percent(&self) -> f64 {
        if self.planned == 0 {
            return 100.0;
        }
        (self.processed as f64 / self.planned as f64 * 100.0).min(100.0)
    }
}

/// 轮询调度器
///
/// 编排核心：每个厂商一个游标，每轮每个厂商至多一项，按并发上限分批，
/// 每批结束写检查点，最后对本次运行的新失败做一次重试。
pub struct RoundRobinScheduler<P: ProgressRepository + 'static> {
    client: Arc<dyn ScrapeClient>,
    cache: CacheGateway,
    progress_store: Arc<P>,
    rate_limiter: RateLimiter,
    config: SchedulerConfig,
}

impl<P: ProgressRepository + 'static> RoundRobinScheduler<P> {
    /// 创建新的调度器实例
    ///
    /// # 参数
    ///
    /// * `client` - 抓取客户端
    /// * `cache` - 缓存网关
    /// * `progress_store` - 进度存储
    /// * `rate_limiter` - 批次间限速器
    /// * `config` - 调度配置
    pub fn new(
        client: Arc<dyn ScrapeClient>,
        cache: CacheGateway,
        progress_store: Arc<P>,
        rate_limiter: RateLimiter,
        config: SchedulerConfig,
    ) -> Self {
        let config = SchedulerConfig {
            max_parallel: config.max_parallel.max(1),
            ..config
        };
        Self {
            client,
            cache,
            progress_store,
            rate_limiter,
            config,
        }
    }

    /// 运行直到所有厂商队列耗尽
    ///
    /// # 参数
    ///
    /// * `queues` - 按轮询顺序排列的厂商队列
    ///
    /// # 返回值
    ///
    /// * `Ok(RunSummary)` - 本次运行汇总
    /// * `Err(ProgressStoreError)` - 无法读取进度文档
    #[instrument(skip(self, queues), fields(run_id = %Uuid::new_v4(), vendors = queues.len()))]
    pub async fn run(&self, queues: &[VendorQueue]) -> Result<RunSummary, ProgressStoreError> {
        let started = Instant::now();
        let mut state = self.start(queues).await?;

        info!(
            "Starting run: {} URLs pending across {} vendors (client={}, max_parallel={})",
            state.planned,
            state.lanes.len(),
            self.client.name(),
            self.config.max_parallel
        );

        loop {
            let round = build_round(&mut state.lanes, &mut state.progress);
            if round.is_empty() {
                break;
            }
            debug!("Round with {} work items", round.len());

            let mut round = round.into_iter().peekable();
            while round.peek().is_some() {
                let batch: Vec<WorkItem> = round.by_ref().take(self.config.max_parallel).collect();
                if state.batches > 0 {
                    self.rate_limiter.delay().await;
                }
                self.process_batch(&mut state, batch).await;
            }
        }

        self.final_retry_pass(&mut state).await;
        self.checkpoint(&mut state.progress).await;

        let summary = RunSummary {
            vendors: state.summaries,
            scrape_calls: state.scrape_calls,
            elapsed: started.elapsed(),
        };
        info!(
            "Run finished in {:.1}s: scraped {}, failed {}, skipped {} ({} scrape calls)",
            summary.elapsed.as_secs_f64(),
            summary.total_scraped(),
            summary.total_failed(),
            summary.total_skipped(),
            summary.scrape_calls
        );
        for vendor in &summary.vendors {
            info!(
                vendor = %vendor.vendor,
                scraped = vendor.scraped,
                failed = vendor.failed,
                skipped = vendor.skipped,
                "Vendor summary"
            );
        }
        Ok(summary)
    }

    async fn start(&self, queues: &[VendorQueue]) -> Result<RunState, ProgressStoreError> {
        let mut progress = self.progress_store.load().await?;
        let repaired = progress.normalize();
        if repaired > 0 {
            warn!("Repaired {} URLs recorded as both completed and failed", repaired);
        }

        let lanes: Vec<VendorLane> = queues
            .iter()
            .cloned()
            .map(|q| VendorLane::new(q, &progress))
            .collect();

        let planned = lanes
            .iter()
            .map(|l| (l.retry_len() + l.pending_fresh(&progress)) as u64)
            .sum();

        let lane_index = lanes
            .iter()
            .enumerate()
            .map(|(i, l)| (l.vendor().to_string(), i))
            .collect();
        let summaries = lanes.iter().map(|l| VendorSummary::new(l.vendor())).collect();

        Ok(RunState {
            progress,
            lanes,
            lane_index,
            summaries,
            final_retry: Vec::new(),
            scrape_calls: 0,
            planned,
            processed: 0,
            batches: 0,
        })
    }

    /// 处理一批工作项
    ///
    /// 批内并发查缓存、并发抓取；全部完成后才在控制任务上更新进度并写检查点。
    async fn process_batch(&self, state: &mut RunState, batch: Vec<WorkItem>) {
        state.batches += 1;

        let cached = join_all(batch.iter().map(|item| self.cache.exists(&item.url))).await;

        let mut to_scrape = Vec::with_capacity(batch.len());
        for (item, is_cached) in batch.into_iter().zip(cached) {
            if is_cached {
                self.settle_cached(state, &item);
            } else {
                to_scrape.push(item);
            }
        }

        if !to_scrape.is_empty() {
            state.scrape_calls += to_scrape.len() as u64;
            let attempts = join_all(to_scrape.iter().map(|item| self.attempt(item))).await;
            for (item, attempt) in to_scrape.into_iter().zip(attempts) {
                match attempt {
                    Attempt::Stored(outcome) => self.settle_success(state, &item, outcome),
                    Attempt::Failed(reason) => self.settle_failure(state, item, &reason),
                }
            }
        }

        self.checkpoint(&mut state.progress).await;
        self.report_progress(state);
    }

    /// 抓取并写缓存
    async fn attempt(&self, item: &WorkItem) -> Attempt {
        let result = self
            .client
            .scrape(&item.url, self.config.scrape_options)
            .await;

        if !result.success {
            metrics::record_scrape(&item.vendor, "failed");
            return Attempt::Failed(
                result
                    .error
                    .unwrap_or_else(|| format!("scrape returned {}", result.quality)),
            );
        }
        metrics::record_scrape(&item.vendor, "success");

        let Some(payload) = result.payload else {
            return Attempt::Failed("scrape succeeded without payload".to_string());
        };

        let outcome = self.cache.upsert(&item.url, result.quality, payload).await;
        metrics::record_upsert(outcome.as_str());
        if outcome.is_success() {
            Attempt::Stored(outcome)
        } else {
            // Storage error: treat as not done so the URL is retried
            Attempt::Failed("cache write failed".to_string())
        }
    }

    fn settle_cached(&self, state: &mut RunState, item: &WorkItem) {
        debug!(url = %item.url, vendor = %item.vendor, "Already cached, skipping");
        metrics::record_cache_hit(&item.vendor);

        let was_failed = self.complete(state, item);
        state.progress.stats.total_cached += 1;
        if was_failed {
            state.progress.stats.total_failed = state.progress.stats.total_failed.saturating_sub(1);
        }

        let summary = state.summary_mut(&item.vendor);
        summary.skipped += 1;
        if item.origin == WorkOrigin::FinalRetry {
            summary.failed = summary.failed.saturating_sub(1);
        }
    }

    fn settle_success(&self, state: &mut RunState, item: &WorkItem, outcome: UpsertOutcome) {
        if outcome == UpsertOutcome::Kept {
            debug!(url = %item.url, "Kept existing higher-quality cache entry");
        }

        let was_failed = self.complete(state, item);
        state.progress.stats.total_scraped += 1;
        if was_failed {
            state.progress.stats.total_failed = state.progress.stats.total_failed.saturating_sub(1);
        }

        let summary = state.summary_mut(&item.vendor);
        summary.scraped += 1;
        if item.origin == WorkOrigin::FinalRetry {
            summary.failed = summary.failed.saturating_sub(1);
        }
    }

    fn settle_failure(&self, state: &mut RunState, item: WorkItem, reason: &str) {
        if state.progress.mark_failed(&item.vendor, &item.url) {
            state.progress.stats.total_failed += 1;
        }
        if let Some(index) = item.queue_index {
            state.progress.advance_cursor(&item.vendor, index + 1);
        }

        match item.origin {
            WorkOrigin::Fresh => {
                debug!(url = %item.url, "First failure, queued for end-of-run retry: {}", reason);
                state.processed += 1;
                state.summary_mut(&item.vendor).failed += 1;
                state.final_retry.push(item.final_retry());
            }
            WorkOrigin::Carryover => {
                warn!(url = %item.url, "Carried-over failure failed again: {}", reason);
                state.processed += 1;
                state.summary_mut(&item.vendor).failed += 1;
            }
            WorkOrigin::FinalRetry => {
                warn!(url = %item.url, "Final retry failed, persisting for next run: {}", reason);
            }
        }
    }

    /// 标记完成，返回此前是否处于失败状态
    fn complete(&self, state: &mut RunState, item: &WorkItem) -> bool {
        let was_failed = state.progress.mark_completed(&item.vendor, &item.url);
        if let Some(index) = item.queue_index {
            state.progress.advance_cursor(&item.vendor, index + 1);
        }
        if let Some(&idx) = state.lane_index.get(&item.vendor) {
            state.lanes[idx].forget_retry(&item.url);
        }
        if item.origin != WorkOrigin::FinalRetry {
            state.processed += 1;
        }
        was_failed
    }

    /// 末尾一次性重试本次运行首次失败的URL
    async fn final_retry_pass(&self, state: &mut RunState) {
        if state.final_retry.is_empty() {
            return;
        }

        let pending = std::mem::take(&mut state.final_retry);
        info!(
            "Retrying {} URLs that failed this run after {}s cooldown",
            pending.len(),
            self.config.retry_cooldown.as_secs()
        );
        sleep(self.config.retry_cooldown).await;

        let mut pending = pending.into_iter().peekable();
        let mut first = true;
        while pending.peek().is_some() {
            let batch: Vec<WorkItem> = pending.by_ref().take(self.config.max_parallel).collect();
            if !first {
                self.rate_limiter.delay().await;
            }
            first = false;
            self.process_batch(state, batch).await;
        }
    }

    /// 写检查点
    ///
    /// 写入失败只记录日志，视为未发生；下次运行最多重做一批。
    async fn checkpoint(&self, progress: &mut ProgressState) {
        progress.touch();
        if let Err(e) = self.progress_store.checkpoint(progress).await {
            error!("Failed to write progress checkpoint: {}", e);
            metrics::record_checkpoint_failure();
        }
    }

    fn report_progress(&self, state: &RunState) {
        let percent = state.percent();
        metrics::set_progress_percent(percent);

        let scraped: u64 = state.summaries.iter().map(|s| s.scraped).sum();
        let failed: u64 = state.summaries.iter().map(|s| s.failed).sum();
        let skipped: u64 = state.summaries.iter().map(|s| s.skipped).sum();
        info!(
            "Progress {:.1}% ({}/{}) | scraped {} | failed {} | skipped {}",
            percent, state.processed, state.planned, scraped, failed, skipped
        );
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
