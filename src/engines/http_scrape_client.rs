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
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::domain::models::quality::Quality;
use crate::domain::models::scrape_result::{ProductPayload, ScrapeOptions, ScrapeResult};
use crate::engines::traits::{EngineError, ScrapeClient};

/// 抓取请求体
#[derive(Debug, Serialize)]
struct ScrapeRequestBody<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    skip_ai_fallback: bool,
}

/// 抓取响应体
///
/// 产品字段与状态字段平铺在同一个对象中。
#[derive(Debug, Deserialize)]
struct ScrapeResponseBody {
    #[serde(flatten)]
    payload: ProductPayload,
    scrape_status: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// 抓取服务HTTP客户端
///
/// 基于reqwest，向抓取服务 `POST {url, skip_ai_fallback}`。
pub struct HttpScrapeClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpScrapeClient {
    /// 创建新的抓取客户端
    ///
    /// # 参数
    ///
    /// * `endpoint` - 抓取服务地址
    /// * `api_key` - 可选的Bearer令牌
    /// * `timeout` - 单次调用超时
    ///
    /// # 返回值
    ///
    /// * `Ok(HttpScrapeClient)` - 客户端实例
    /// * `Err(EngineError)` - 构建HTTP客户端失败
    pub fn new(
        endpoint: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; harvestrs/1.0)")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    async fn call(&self, url: &str, options: ScrapeOptions) -> Result<ScrapeResult, EngineError> {
        let body = ScrapeRequestBody {
            url,
            skip_ai_fallback: options.skip_ai_fallback,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(timeout_aware)?;
        let status = response.status();
        let text = response.text().await.map_err(timeout_aware)?;

        if !status.is_success() {
            return Err(EngineError::Status {
                status: status.as_u16(),
                body: truncate(&text, 200),
            });
        }

        let parsed: ScrapeResponseBody =
            serde_json::from_str(&text).map_err(|e| EngineError::Malformed(e.to_string()))?;

        if let Some(error) = parsed.error.as_ref().filter(|e| is_truthy(e)) {
            let message = match error {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(EngineError::Rejected(message));
        }

        let quality = parsed
            .scrape_status
            .as_deref()
            .map(Quality::from_label)
            .unwrap_or(Quality::Unknown);

        Ok(ScrapeResult::from_payload(url, quality, parsed.payload))
    }
}

#[async_trait]
impl ScrapeClient for HttpScrapeClient {
    async fn scrape(&self, url: &str, options: ScrapeOptions) -> ScrapeResult {
        let start = Instant::now();
        match self.call(url, options).await {
            Ok(result) => {
                debug!(
                    url,
                    quality = %result.quality,
                    fields = result.fields_found,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Scrape finished"
                );
                result
            }
            Err(e) => {
                warn!(url, retryable = e.is_retryable(), "Scrape failed: {}", e);
                ScrapeResult::failure(url, e.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn timeout_aware(e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::Timeout
    } else {
        EngineError::RequestFailed(e)
    }
}

/// 判断JSON值是否为真
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
#[path = "http_scrape_client_test.rs"]
mod tests;
