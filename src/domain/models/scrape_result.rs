// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::models::quality::Quality;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// 产品元数据
///
/// 抓取服务返回的结构化字段，全部可选，消费方必须显式处理缺失。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPayload {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model_number: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
    pub specifications: Option<serde_json::Value>,
}

impl ProductPayload {
    /// 统计非空字段数量
    pub fn fields_found(&self) -> u32 {
        let text_fields = [
            &self.name,
            &self.brand,
            &self.model_number,
            &self.category,
            &self.description,
            &self.currency,
            &self.image_url,
        ];

        let mut count = text_fields
            .iter()
            .filter(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()))
            .count() as u32;

        if self.price.is_some() {
            count += 1;
        }
        if self
            .specifications
            .as_ref()
            .is_some_and(|v| !v.is_null() && v.as_object().map_or(true, |o| !o.is_empty()))
        {
            count += 1;
        }
        count
    }

    /// 派生身份键
    ///
    /// 用于跨厂商、跨URL归并同一产品。优先使用品牌+型号，否则使用名称；
    /// 都缺失时返回None。
    pub fn identity_key(&self) -> Option<String> {
        let brand = self.brand.as_deref().map(normalize).unwrap_or_default();
        let model = self.model_number.as_deref().map(normalize).unwrap_or_default();

        let basis = if !model.is_empty() {
            format!("{}|{}", brand, model)
        } else {
            let name = self.name.as_deref().map(normalize).unwrap_or_default();
            if name.is_empty() {
                return None;
            }
            format!("name|{}", name)
        };

        let digest = Sha256::digest(basis.as_bytes());
        Some(hex::encode(&digest[..16]))
    }
}

fn normalize(value: &str) -> String {
    NON_ALNUM
        .replace_all(&value.to_lowercase(), "")
        .into_owned()
}

/// 抓取选项
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrapeOptions {
    /// 是否跳过昂贵的AI兜底层
    pub skip_ai_fallback: bool,
}

/// 单次抓取结果
///
/// 临时对象，只用于驱动进度更新和缓存写入，本身从不持久化。
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeResult {
    pub url: String,
    pub success: bool,
    pub quality: Quality,
    pub fields_found: u32,
    pub error: Option<String>,
    pub payload: Option<ProductPayload>,
}

impl ScrapeResult {
    /// 构造失败结果
    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            quality: Quality::Failed,
            fields_found: 0,
            error: Some(error.into()),
            payload: None,
        }
    }

    /// 根据服务返回的质量标签和字段构造结果
    ///
    /// 传输成功但结果不可用（无字段、失败或未知标签）同样视为失败，
    /// 使其进入相同的重试与持久化路径。
    pub fn from_payload(url: impl Into<String>, quality: Quality, payload: ProductPayload) -> Self {
        let url = url.into();
        let fields_found = payload.fields_found();

        if !quality.is_usable() {
            return Self {
                fields_found,
                ..Self::failure(url, format!("unusable scrape status: {}", quality))
            };
        }
        if fields_found == 0 {
            return Self::failure(url, "no product fields extracted");
        }

        Self {
            url,
            success: true,
            quality,
            fields_found,
            error: None,
            payload: Some(payload),
        }
    }
}
