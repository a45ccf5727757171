// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::scrape_result::{ScrapeOptions, ScrapeResult};

/// 引擎错误类型
///
/// 仅在抓取客户端内部使用，越过客户端边界前统一转换为失败结果。
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 非2xx状态码
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// 响应格式无效
    #[error("Malformed response: {0}")]
    Malformed(String),
    /// 服务端返回错误字段
    #[error("Scrape service error: {0}")]
    Rejected(String),
}

impl EngineError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::RequestFailed(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            EngineError::Timeout => true,
            EngineError::Status { status, .. } => *status == 429 || *status >= 500,
            EngineError::Malformed(_) | EngineError::Rejected(_) => false,
        }
    }
}

/// 抓取客户端特质
///
/// 对调度器而言是幂等的远程调用，可以安全重试。实现从不向外返回错误：
/// 网络错误、超时、格式错误、非2xx都变成 `success=false` 的结果。
#[async_trait]
pub trait ScrapeClient: Send + Sync {
    /// 执行抓取
    async fn scrape(&self, url: &str, options: ScrapeOptions) -> ScrapeResult;

    /// 客户端名称
    fn name(&self) -> &'static str;
}
