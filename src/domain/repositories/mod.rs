// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 仓库接口定义了数据持久化的抽象契约，具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 缓存仓库（cache_repository）：按URL存储产品数据，质量只升不降
/// - 进度仓库（progress_repository）：读取和写入进度检查点
pub mod cache_repository;
pub mod progress_repository;
