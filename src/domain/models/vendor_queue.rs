// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;

/// 厂商URL队列
///
/// 外部提供的有序URL序列，调度器从不修改。
#[derive(Debug, Clone, PartialEq)]
pub struct VendorQueue {
    /// 厂商域名
    pub vendor: String,
    /// 按发现顺序排列的URL
    pub urls: Arc<[String]>,
}

impl VendorQueue {
    pub fn new<I, S>(vendor: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vendor: vendor.into(),
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.urls.get(index).map(String::as_str)
    }
}
