// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 启动Prometheus指标导出器
pub fn init_metrics(addr: SocketAddr) {
    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    info!("Metrics exporter listening on {}", addr);
}

pub fn record_scrape(vendor: &str, outcome: &'static str) {
    counter!("harvest_scrape_total", "vendor" => vendor.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_cache_hit(vendor: &str) {
    counter!("harvest_cache_hits_total", "vendor" => vendor.to_string()).increment(1);
}

pub fn record_upsert(outcome: &'static str) {
    counter!("harvest_upsert_total", "outcome" => outcome).increment(1);
}

pub fn record_checkpoint_failure() {
    counter!("harvest_checkpoint_failures_total").increment(1);
}

pub fn set_progress_percent(percent: f64) {
    gauge!("harvest_progress_percent").set(percent);
}
