// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：质量等级、进度文档、抓取结果和缓存记录
/// - 仓库接口（repositories）：缓存和进度存储的抽象接口
/// - 服务（services）：缓存网关等领域服务
///
/// 领域层不依赖于任何外部实现。
pub mod models;
pub mod repositories;
pub mod services;
