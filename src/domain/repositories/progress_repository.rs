// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

use crate::domain::models::progress::ProgressState;
use crate::utils::errors::ProgressStoreError;

/// 进度仓库特质
///
/// 启动时整体读取，每个检查点整体重写。
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// 读取进度，不存在时返回空进度
    async fn load(&self) -> Result<ProgressState, ProgressStoreError>;

    /// 原子地写入完整进度
    async fn checkpoint(&self, state: &ProgressState) -> Result<(), ProgressStoreError>;
}
