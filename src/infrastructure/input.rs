// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::domain::models::vendor_queue::VendorQueue;
use crate::utils::errors::SetupError;

#[derive(Debug, Deserialize)]
struct VendorEntry {
    vendor: String,
    #[serde(default)]
    urls: Vec<String>,
}

/// 读取厂商队列文件
///
/// 支持JSON与YAML（按扩展名判断），文件中的顺序即轮询顺序。
///
/// # 参数
///
/// * `path` - 输入文件路径
///
/// # 返回值
///
/// * `Ok(Vec<VendorQueue>)` - 按文件顺序排列的厂商队列
/// * `Err(SetupError)` - 文件缺失或格式无效
pub async fn load_vendor_queues(path: &Path) -> Result<Vec<VendorQueue>, SetupError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SetupError::MissingInput(path.to_path_buf()))
        }
        Err(e) => return Err(SetupError::Io(e)),
    };

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let entries: Vec<VendorEntry> = if is_yaml {
        serde_yaml::from_str(&raw).map_err(|e| invalid(path, e.to_string()))?
    } else {
        serde_json::from_str(&raw).map_err(|e| invalid(path, e.to_string()))?
    };

    let queues = validate(path, entries)?;
    info!(
        "Loaded {} vendors with {} URLs from {}",
        queues.len(),
        queues.iter().map(VendorQueue::len).sum::<usize>(),
        path.display()
    );
    Ok(queues)
}

fn validate(path: &Path, entries: Vec<VendorEntry>) -> Result<Vec<VendorQueue>, SetupError> {
    let mut seen = HashSet::new();
    let mut queues = Vec::with_capacity(entries.len());

    for entry in entries {
        let vendor = entry.vendor.trim().to_string();
        if vendor.is_empty() {
            return Err(invalid(path, "vendor name must not be empty".to_string()));
        }
        if !seen.insert(vendor.clone()) {
            return Err(invalid(path, format!("duplicate vendor {}", vendor)));
        }
        let urls = entry
            .urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        queues.push(VendorQueue::new(vendor, urls));
    }

    Ok(queues)
}

fn invalid(path: &Path, reason: String) -> SetupError {
    SetupError::InvalidInput {
        path: path.to_path_buf(),
        reason,
    }
}

/// 按厂商过滤，保留输入顺序
pub fn filter_vendors(queues: Vec<VendorQueue>, only: &[String]) -> Vec<VendorQueue> {
    if only.is_empty() {
        return queues;
    }
    queues
        .into_iter()
        .filter(|q| only.iter().any(|v| v == &q.vendor))
        .collect()
}
