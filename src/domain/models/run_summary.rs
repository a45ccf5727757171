// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;
use std::time::Duration;

/// 单个厂商本次运行的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VendorSummary {
    pub vendor: String,
    /// 成功抓取（含保留更优旧数据）
    pub scraped: u64,
    /// 最终失败，下次运行优先重试
    pub failed: u64,
    /// 已缓存而跳过
    pub skipped: u64,
}

impl VendorSummary {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            ..Default::default()
        }
    }

    pub fn processed(&self) -> u64 {
        self.scraped + self.failed + self.skipped
    }
}

/// 本次运行汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// 按输入顺序排列的厂商统计
    pub vendors: Vec<VendorSummary>,
    /// 实际发出的抓取调用数
    pub scrape_calls: u64,
    /// 运行耗时
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn vendor(&self, vendor: &str) -> Option<&VendorSummary> {
        self.vendors.iter().find(|v| v.vendor == vendor)
    }

    pub fn total_scraped(&self) -> u64 {
        self.vendors.iter().map(|v| v.scraped).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.vendors.iter().map(|v| v.failed).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.vendors.iter().map(|v| v.skipped).sum()
    }

    /// 渲染为人类可读的表格
    pub fn render(&self) -> String {
        let width = self
            .vendors
            .iter()
            .map(|v| v.vendor.len())
            .max()
            .unwrap_or(0)
            .max("TOTAL".len());

        let mut out = format!(
            "{:<width$}  {:>8}  {:>8}  {:>8}\n",
            "VENDOR",
            "SCRAPED",
            "FAILED",
            "SKIPPED",
            width = width
        );
        for v in &self.vendors {
            out.push_str(&format!(
                "{:<width$}  {:>8}  {:>8}  {:>8}\n",
                v.vendor,
                v.scraped,
                v.failed,
                v.skipped,
                width = width
            ));
        }
        out.push_str(&format!(
            "{:<width$}  {:>8}  {:>8}  {:>8}\n",
            "TOTAL",
            self.total_scraped(),
            self.total_failed(),
            self.total_skipped(),
            width = width
        ));
        out
    }
}
