// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 缓存模块
///
/// 提供共享缓存存储的实现
/// 包括Redis缓存和内存缓存
pub mod memory_cache;
pub mod redis_cache;
