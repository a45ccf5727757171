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

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use harvestrs::config::settings::{CacheBackend, Settings};
use harvestrs::domain::models::scrape_result::ScrapeOptions;
use harvestrs::domain::repositories::cache_repository::CacheRepository;
use harvestrs::domain::repositories::progress_repository::ProgressRepository;
use harvestrs::domain::services::cache_gateway::CacheGateway;
use harvestrs::engines::http_scrape_client::HttpScrapeClient;
use harvestrs::infrastructure::cache::memory_cache::MemoryCache;
use harvestrs::infrastructure::cache::redis_cache::RedisCache;
use harvestrs::infrastructure::input::{filter_vendors, load_vendor_queues};
use harvestrs::infrastructure::metrics;
use harvestrs::infrastructure::storage::FileProgressStore;
use harvestrs::queue::rate_limiter::RateLimiter;
use harvestrs::queue::scheduler::{RoundRobinScheduler, SchedulerConfig};
use harvestrs::utils::errors::SetupError;
use harvestrs::utils::telemetry;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "harvestrs")]
#[command(about = "Round-robin bulk product scraper with resumable progress")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every pending URL, round-robin across vendors
    Run {
        /// Parallelism mode
        #[arg(short, long, value_enum, default_value_t = Mode::Parallel)]
        mode: Mode,

        /// Only process these vendors (repeatable)
        #[arg(short, long = "vendor")]
        vendors: Vec<String>,

        /// Enable the expensive AI fallback tier
        #[arg(long)]
        ai_fallback: bool,

        /// Override scheduler.max_parallel
        #[arg(long)]
        max_parallel: Option<usize>,
    },

    /// Show the stored progress document
    Status,

    /// Forget stored progress so vendors are processed again
    Reset {
        /// Vendors to reset (all when omitted)
        #[arg(short, long = "vendor")]
        vendors: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Sequential,
    Parallel,
}

/// 主函数
///
/// 解析命令行、加载配置并执行子命令
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::new().context("Failed to load configuration")?;
    telemetry::init_telemetry(settings.telemetry.json);

    match cli.command {
        Commands::Run {
            mode,
            vendors,
            ai_fallback,
            max_parallel,
        } => run(settings, mode, vendors, ai_fallback, max_parallel).await,
        Commands::Status => status(&settings).await,
        Commands::Reset { vendors } => reset(&settings, &vendors).await,
    }
}

async fn run(
    settings: Settings,
    mode: Mode,
    vendors: Vec<String>,
    ai_fallback: bool,
    max_parallel: Option<usize>,
) -> Result<()> {
    settings.validate().context("Invalid configuration")?;
    info!("Starting harvestrs...");

    if settings.metrics.enabled {
        metrics::init_metrics(settings.metrics_addr()?);
    }

    // 1. Vendor input
    let vendors_path = settings.vendors_path();
    let queues = load_vendor_queues(&vendors_path)
        .await
        .with_context(|| format!("Failed to load vendor input {}", vendors_path.display()))?;
    let queues = filter_vendors(queues, &vendors);
    if queues.is_empty() {
        warn!("No vendors selected, nothing to do");
        return Ok(());
    }
    info!("Loaded {} vendor queues", queues.len());

    // 2. Cache
    let cache: Arc<dyn CacheRepository> = match settings.cache.backend {
        CacheBackend::Redis => {
            let url = settings
                .cache
                .redis_url
                .as_deref()
                .ok_or(SetupError::MissingSetting("cache.redis_url"))?;
            let redis = RedisCache::connect(url, settings.cache.key_prefix.clone())
                .await
                .map_err(|e| SetupError::Cache(e.to_string()))?;
            info!("Redis cache connected");
            Arc::new(redis)
        }
        CacheBackend::Memory => {
            warn!("Using in-memory cache, results are not shared across runs");
            Arc::new(MemoryCache::new())
        }
    };
    let gateway = CacheGateway::new(cache, settings.cache_timeout());

    // 3. Scrape client
    let client = HttpScrapeClient::new(
        settings.scrape_endpoint()?,
        settings.scraper.api_key.clone(),
        settings.scrape_timeout(),
    )
    .context("Failed to build scrape client")?;

    // 4. Scheduler
    let max_parallel = match mode {
        Mode::Sequential => 1,
        Mode::Parallel => max_parallel.unwrap_or(settings.scheduler.max_parallel),
    };
    let config = SchedulerConfig {
        max_parallel,
        retry_cooldown: settings.retry_cooldown(),
        scrape_options: ScrapeOptions {
            skip_ai_fallback: settings.scraper.skip_ai_fallback && !ai_fallback,
        },
    };
    let scheduler = RoundRobinScheduler::new(
        Arc::new(client),
        gateway,
        Arc::new(FileProgressStore::new(settings.progress_path())),
        RateLimiter::new(settings.delay_base(), settings.delay_jitter()),
        config,
    );

    let summary = scheduler
        .run(&queues)
        .await
        .context("Failed to read progress document")?;

    println!("{}", summary.render());
    Ok(())
}

async fn status(settings: &Settings) -> Result<()> {
    let store = FileProgressStore::new(settings.progress_path());
    let progress = store.load().await.context("Failed to read progress document")?;

    println!("Progress file: {}", store.path().display());
    println!(
        "{:<32}  {:>9}  {:>7}  {:>7}",
        "VENDOR", "COMPLETED", "FAILED", "CURSOR"
    );
    for vendor in progress.vendors() {
        println!(
            "{:<32}  {:>9}  {:>7}  {:>7}",
            vendor,
            progress.completed_count(&vendor),
            progress.failed_count(&vendor),
            progress.cursor(&vendor)
        );
    }
    println!();
    println!("Total scraped: {}", progress.stats.total_scraped);
    println!("Total cached:  {}", progress.stats.total_cached);
    println!("Total failed:  {}", progress.stats.total_failed);
    println!("Started:       {}", progress.stats.started_at.to_rfc3339());
    println!("Last updated:  {}", progress.stats.last_updated.to_rfc3339());
    Ok(())
}

async fn reset(settings: &Settings, vendors: &[String]) -> Result<()> {
    let store = FileProgressStore::new(settings.progress_path());
    let mut progress = store.load().await.context("Failed to read progress document")?;

    let targets: Vec<String> = if vendors.is_empty() {
        progress.vendors().into_iter().collect()
    } else {
        vendors.to_vec()
    };
    for vendor in &targets {
        progress.reset_vendor(vendor);
        info!(vendor = %vendor, "Progress reset");
    }

    progress.touch();
    store
        .checkpoint(&progress)
        .await
        .context("Failed to write progress document")?;
    println!("Reset {} vendors", targets.len());
    Ok(())
}
