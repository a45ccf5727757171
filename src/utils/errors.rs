// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::PathBuf;
use thiserror::Error;

/// 启动错误类型
///
/// 调度开始前的致命错误，命令行以非零状态退出。
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    #[error("缺少配置项: {0}")]
    MissingSetting(&'static str),

    #[error("无效配置 {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("输入文件不存在: {0}")]
    MissingInput(PathBuf),

    #[error("无效输入 {path}: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("读取输入失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("缓存初始化失败: {0}")]
    Cache(String),
}

/// 进度存储错误类型
#[derive(Error, Debug)]
pub enum ProgressStoreError {
    #[error("进度文件IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("进度文件序列化错误: {0}")]
    Serde(#[from] serde_json::Error),
}

/// 缓存错误类型
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis错误: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("缓存序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("缓存操作超时")]
    Timeout,

    #[error("缓存错误: {0}")]
    Other(String),
}
