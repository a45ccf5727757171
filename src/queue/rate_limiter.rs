// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// 批次间限速器
///
/// 每批结束后等待 `base + uniform(0, jitter)`，避免对厂商源站突发请求。
/// 批内请求并发发出，限速只作用于下一批。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    /// 基础延迟
    base: Duration,
    /// 抖动上限
    jitter: Duration,
}

impl RateLimiter {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    /// 不等待的限速器
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// 计算下一次等待时长
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.base;
        }
        let jitter_ms = rand::random_range(0..=self.jitter.as_millis() as u64);
        self.base + Duration::from_millis(jitter_ms)
    }

    /// 等待直到可以发出下一批
    pub async fn delay(&self) {
        let wait = self.next_delay();
        if wait.is_zero() {
            return;
        }
        debug!("Rate limiter waiting {}ms before next batch", wait.as_millis());
        sleep(wait).await;
    }
}
