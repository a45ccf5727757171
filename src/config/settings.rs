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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::utils::errors::SetupError;

/// 应用程序配置设置
///
/// 包含抓取服务、缓存、调度、进度文件、输入、指标和日志等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 抓取服务配置
    pub scraper: ScraperSettings,
    /// 缓存配置
    pub cache: CacheSettings,
    /// 调度配置
    pub scheduler: SchedulerSettings,
    /// 进度文件配置
    pub progress: ProgressSettings,
    /// 输入配置
    pub input: InputSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
    /// 日志配置
    pub telemetry: TelemetrySettings,
}

/// 抓取服务配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperSettings {
    /// 抓取服务端点
    pub endpoint: Option<String>,
    /// Bearer 密钥
    pub api_key: Option<String>,
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
    /// 是否跳过AI兜底层
    pub skip_ai_fallback: bool,
}

/// 缓存后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// 缓存配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// 后端类型 (redis, memory)
    pub backend: CacheBackend,
    /// Redis连接URL (当 backend=redis 时使用)
    pub redis_url: Option<String>,
    /// 键前缀
    pub key_prefix: String,
    /// 单次缓存操作超时时间（秒）
    pub timeout_secs: u64,
}

/// 调度配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// 每批最大并发数
    pub max_parallel: usize,
    /// 批次间基础延迟（毫秒）
    pub delay_base_ms: u64,
    /// 批次间随机抖动上限（毫秒）
    pub delay_jitter_ms: u64,
    /// 末尾重试前的冷却时间（秒）
    pub retry_cooldown_secs: u64,
}

/// 进度文件配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressSettings {
    /// 进度文档路径
    pub path: String,
}

/// 输入配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct InputSettings {
    /// 厂商URL列表文件 (JSON 或 YAML)
    pub vendors_path: String,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 监听地址
    pub listen: String,
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    /// 是否输出JSON格式日志
    pub json: bool,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件和环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("HARVESTRS").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 仅包含默认值的配置
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            // Scraper
            .set_default("scraper.timeout_secs", 60)?
            .set_default("scraper.skip_ai_fallback", true)?
            // Cache
            .set_default("cache.backend", "redis")?
            .set_default("cache.key_prefix", "harvest:cache:")?
            .set_default("cache.timeout_secs", 5)?
            // Scheduler
            .set_default("scheduler.max_parallel", 4)?
            .set_default("scheduler.delay_base_ms", 2000)?
            .set_default("scheduler.delay_jitter_ms", 1500)?
            .set_default("scheduler.retry_cooldown_secs", 30)?
            // Files
            .set_default("progress.path", "./data/progress.json")?
            .set_default("input.vendors_path", "./data/vendors.json")?
            // Observability
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen", "0.0.0.0:9000")?
            .set_default("telemetry.json", false)
    }

    /// 校验配置
    ///
    /// 在调度开始前发现缺失或无效的配置项。
    pub fn validate(&self) -> Result<(), SetupError> {
        self.scrape_endpoint()?;

        if self.scraper.timeout_secs == 0 {
            return Err(SetupError::InvalidSetting {
                key: "scraper.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.cache.backend == CacheBackend::Redis {
            match self.cache.redis_url.as_deref() {
                Some(url) if !url.trim().is_empty() => {}
                _ => return Err(SetupError::MissingSetting("cache.redis_url")),
            }
        }

        if self.cache.timeout_secs == 0 {
            return Err(SetupError::InvalidSetting {
                key: "cache.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.scheduler.max_parallel == 0 {
            return Err(SetupError::InvalidSetting {
                key: "scheduler.max_parallel",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.progress.path.trim().is_empty() {
            return Err(SetupError::MissingSetting("progress.path"));
        }

        if self.metrics.enabled {
            self.metrics_addr()?;
        }

        Ok(())
    }

    /// 解析抓取服务端点
    pub fn scrape_endpoint(&self) -> Result<Url, SetupError> {
        let raw = self
            .scraper
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SetupError::MissingSetting("scraper.endpoint"))?;

        Url::parse(raw).map_err(|e| SetupError::InvalidSetting {
            key: "scraper.endpoint",
            reason: e.to_string(),
        })
    }

    /// 解析指标监听地址
    pub fn metrics_addr(&self) -> Result<SocketAddr, SetupError> {
        self.metrics
            .listen
            .parse()
            .map_err(|e: std::net::AddrParseError| SetupError::InvalidSetting {
                key: "metrics.listen",
                reason: e.to_string(),
            })
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper.timeout_secs)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache.timeout_secs)
    }

    pub fn delay_base(&self) -> Duration {
        Duration::from_millis(self.scheduler.delay_base_ms)
    }

    pub fn delay_jitter(&self) -> Duration {
        Duration::from_millis(self.scheduler.delay_jitter_ms)
    }

    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_secs(self.scheduler.retry_cooldown_secs)
    }

    pub fn progress_path(&self) -> PathBuf {
        PathBuf::from(&self.progress.path)
    }

    pub fn vendors_path(&self) -> PathBuf {
        PathBuf::from(&self.input.vendors_path)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
