// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，负责与外部系统的交互。
///
/// 包含的子模块：
/// - 缓存（cache）：Redis和内存缓存实现
/// - 输入（input）：厂商URL列表的加载
/// - 指标（metrics）：Prometheus 指标
/// - 存储（storage）：进度文档的原子写入
pub mod cache;
pub mod input;
pub mod metrics;
pub mod storage;
