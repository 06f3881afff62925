//! 批次暂存与回滚
//!
//! 一个上传批次要么全部落盘，要么一个都不留下。

use crate::store::AssetStore;
use bytes::Bytes;
use medo_core::{MedoError, Result};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

/// 一次已登记的写入
struct StagedWrite {
    storage_name: String,
    // 尚未被等待的写入任务
    task: Option<JoinHandle<Result<String>>>,
}

impl StagedWrite {
    /// 等待写入任务结束；已经等待过时返回 `None`
    async fn wait(&mut self) -> Option<std::result::Result<Result<String>, JoinError>> {
        let task = self.task.as_mut()?;
        let outcome = task.await;
        self.task = None;
        Some(outcome)
    }
}

/// 暂存中的批次
///
/// 未调用 [`StagedBatch::commit`] 就被丢弃时（例如请求被取消），
/// 已写入的文件会在后台被删除。每次写入先登记、再作为独立任务执行，
/// 回滚时会等仍在进行的写入结束后再删除。
pub struct StagedBatch {
    store: Arc<dyn AssetStore>,
    written: Vec<StagedWrite>,
    committed: bool,
}

impl StagedBatch {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self {
            store,
            written: Vec::new(),
            committed: false,
        }
    }

    /// 写入一个文件并登记，以便失败时回滚
    pub async fn put(&mut self, storage_name: &str, data: Bytes) -> Result<String> {
        let store = self.store.clone();
        let name = storage_name.to_string();
        let task = tokio::spawn(async move { store.put(&name, data).await });

        let index = self.written.len();
        self.written.push(StagedWrite {
            storage_name: storage_name.to_string(),
            task: Some(task),
        });

        let outcome = self.written[index].wait().await;
        match outcome {
            Some(Ok(Ok(path))) => Ok(path),
            Some(Ok(Err(e))) => {
                // 写入失败时存储已清理半成品，同名文件不属于本批次
                self.written.truncate(index);
                Err(e)
            }
            Some(Err(e)) => Err(MedoError::StorageWrite(format!("{}: {}", storage_name, e))),
            None => Err(MedoError::Internal(format!("写入任务已结束: {}", storage_name))),
        }
    }

    /// 已登记的文件数
    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    /// 提交批次，返回已写入的存储名
    pub fn commit(mut self) -> Vec<String> {
        self.committed = true;
        std::mem::take(&mut self.written)
            .into_iter()
            .map(|write| write.storage_name)
            .collect()
    }

    /// 删除本批次已写入的全部文件，返回成功删除的数量
    pub async fn rollback(mut self) -> usize {
        self.committed = true;
        let written = std::mem::take(&mut self.written);
        let total = written.len();
        let removed = remove_all(self.store.as_ref(), written).await;

        if removed == total {
            info!("批次回滚完成: 删除 {} 个文件", removed);
        } else {
            warn!("批次回滚不完整: {}/{} 个文件已删除", removed, total);
        }
        removed
    }
}

async fn remove_all(store: &dyn AssetStore, written: Vec<StagedWrite>) -> usize {
    let mut removed = 0;
    for mut write in written {
        if let Some(Ok(Err(_))) = write.wait().await {
            // 写入本身失败，没有留下文件
            removed += 1;
            continue;
        }
        match store.delete(&write.storage_name).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("回滚删除失败 {}: {}", write.storage_name, e),
        }
    }
    removed
}

impl Drop for StagedBatch {
    fn drop(&mut self) {
        if self.committed || self.written.is_empty() {
            return;
        }

        let written = std::mem::take(&mut self.written);
        let store = self.store.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("批次未提交即被丢弃，后台回滚 {} 个文件", written.len());
                handle.spawn(async move {
                    remove_all(store.as_ref(), written).await;
                });
            }
            Err(_) => {
                let names: Vec<_> = written.iter().map(|w| w.storage_name.as_str()).collect();
                warn!("批次未提交且没有运行时，无法回滚: {:?}", names);
            }
        }
    }
}
