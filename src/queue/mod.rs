// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 提供轮询调度功能
/// 负责厂商通道、批次划分、限速和重试
pub mod lane;
pub mod rate_limiter;
pub mod scheduler;
