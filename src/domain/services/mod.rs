// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 缓存网关（cache_gateway）：带超时的存在性检查和按质量合并的写入
pub mod cache_gateway;
