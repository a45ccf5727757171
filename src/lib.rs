// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 实现远程抓取服务客户端
pub mod engines;

/// 基础设施模块
///
/// 提供外部服务集成，如缓存、进度文件、指标等
pub mod infrastructure;

/// 队列模块
///
/// 实现轮询调度功能
pub mod queue;

/// 工具模块
///
/// 提供错误类型和日志初始化
pub mod utils;
