// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::domain::models::progress::ProgressState;
use crate::domain::repositories::progress_repository::ProgressRepository;
use crate::utils::errors::ProgressStoreError;

/// 本地文件进度存储
///
/// JSON文档，先写临时文件并 fsync，再原子重命名覆盖，避免半写损坏。
pub struct FileProgressStore {
    path: PathBuf,
}

impl FileProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling("tmp")
    }

    fn quarantine_path(&self) -> PathBuf {
        self.sibling("corrupt")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "progress.json".into());
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ProgressRepository for FileProgressStore {
    async fn load(&self) -> Result<ProgressState, ProgressStoreError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No progress document at {}, starting fresh", self.path.display());
                return Ok(ProgressState::new());
            }
            Err(e) => return Err(ProgressStoreError::Io(e)),
        };

        match serde_json::from_slice::<ProgressState>(&raw) {
            Ok(mut state) => {
                let repaired = state.normalize();
                if repaired > 0 {
                    warn!("Repaired {} URLs recorded as both completed and failed", repaired);
                }
                Ok(state)
            }
            Err(e) => {
                // Unreadable document: move it aside and re-run everything
                let quarantine = self.quarantine_path();
                warn!(
                    "Progress document {} is unreadable ({}), moving it to {} and starting fresh",
                    self.path.display(),
                    e,
                    quarantine.display()
                );
                fs::rename(&self.path, &quarantine).await?;
                Ok(ProgressState::new())
            }
        }
    }

    async fn checkpoint(&self, state: &ProgressState) -> Result<(), ProgressStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let encoded = serde_json::to_vec_pretty(state)?;
        let temp_path = self.temp_path();

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&encoded).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        self.sync_parent_dir().await?;
        Ok(())
    }
}

impl FileProgressStore {
    /// 持久化重命名本身：同步父目录项
    #[cfg(unix)]
    async fn sync_parent_dir(&self) -> Result<(), ProgressStoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::File::open(dir).await?.sync_all().await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn sync_parent_dir(&self) -> Result<(), ProgressStoreError> {
        Ok(())
    }
}

/// 内存进度存储
///
/// 保留每一次检查点的快照，便于测试检查单调性和崩溃恢复。
#[derive(Clone, Default)]
pub struct MemoryProgressStore {
    current: Arc<Mutex<Option<ProgressState>>>,
    history: Arc<Mutex<Vec<ProgressState>>>,
    fail_checkpoints: Arc<Mutex<bool>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有进度初始化（模拟上一次运行留下的文档）
    pub fn with_state(state: ProgressState) -> Self {
        let store = Self::default();
        *store.current.lock() = Some(state);
        store
    }

    /// 所有检查点快照
    pub fn checkpoints(&self) -> Vec<ProgressState> {
        self.history.lock().clone()
    }

    pub fn latest(&self) -> Option<ProgressState> {
        self.current.lock().clone()
    }

    /// 让后续检查点写入失败
    pub fn set_fail_checkpoints(&self, fail: bool) {
        *self.fail_checkpoints.lock() = fail;
    }
}

#[async_trait]
impl ProgressRepository for MemoryProgressStore {
    async fn load(&self) -> Result<ProgressState, ProgressStoreError> {
        Ok(self.current.lock().clone().unwrap_or_default())
    }

    async fn checkpoint(&self, state: &ProgressState) -> Result<(), ProgressStoreError> {
        if *self.fail_checkpoints.lock() {
            return Err(ProgressStoreError::Io(std::io::Error::other(
                "simulated checkpoint failure",
            )));
        }
        *self.current.lock() = Some(state.clone());
        self.history.lock().push(state.clone());
        Ok(())
    }
}
