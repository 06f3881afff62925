//! 上传批次处理流水线
//!
//! 对一个批次依次执行验证、命名和落盘。任何一个文件被拒绝或写入失败，
//! 整个批次回滚，调用方只会看到完整成功或单一的拒绝原因。

use crate::validator::{UploadValidator, Verdict};
use chrono::Utc;
use medo_core::{MedoError, Result, StoredAsset, UploadCandidate, UploadState};
use medo_storage::{AssetStore, StagedBatch, StorageNamer};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 批次处理结果
pub type BatchResult = Result<Vec<StoredAsset>>;

/// 上传流水线
#[derive(Clone)]
pub struct IngestionPipeline {
    validator: UploadValidator,
    namer: StorageNamer,
    store: Arc<dyn AssetStore>,
}

impl IngestionPipeline {
    pub fn new(validator: UploadValidator, store: Arc<dyn AssetStore>) -> Self {
        Self {
            validator,
            namer: StorageNamer::new(),
            store,
        }
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// 处理一个上传批次
    pub async fn ingest(&self, batch: Vec<UploadCandidate>) -> BatchResult {
        let mut state = UploadState::Received;
        debug!("上传批次 {}: {} 个文件", state, batch.len());

        state = UploadState::Validating;
        if let Err(reason) = self.validator.check_batch(batch.len()) {
            warn!("上传批次 {}: {}", UploadState::Rejected, reason);
            return Err(reason.into());
        }

        let mut staged = StagedBatch::new(self.store.clone());
        let mut assets = Vec::with_capacity(batch.len());

        for candidate in batch {
            match self.stage_one(&mut staged, candidate).await {
                Ok(asset) => assets.push(asset),
                Err(e) => {
                    warn!(
                        "上传批次 {} -> {}: {}，回滚 {} 个已写入文件",
                        state,
                        UploadState::Rejected,
                        e,
                        staged.len()
                    );
                    staged.rollback().await;
                    return Err(e);
                }
            }
        }

        staged.commit();
        state = UploadState::Stored;
        info!(
            "上传批次 {}: {} 个文件写入 {} 存储",
            state,
            assets.len(),
            self.store.backend()
        );

        Ok(assets)
    }

    async fn stage_one(
        &self,
        staged: &mut StagedBatch,
        candidate: UploadCandidate,
    ) -> Result<StoredAsset> {
        let extension = match self.validator.validate(&candidate) {
            Verdict::Accepted { extension } => extension,
            Verdict::Rejected(reason) => return Err(MedoError::Rejected(reason)),
        };

        let assigned = self.namer.assign_name(&extension);
        let checksum = format!("{:x}", Sha256::digest(&candidate.content));
        let storage_path = staged
            .put(&assigned.storage_name, candidate.content)
            .await?;

        debug!(
            "文件 {:?} 存储为 {}",
            candidate.original_name, assigned.storage_name
        );

        Ok(StoredAsset {
            id: assigned.id,
            storage_name: assigned.storage_name,
            mime_type: candidate.declared_mime_type,
            size_bytes: candidate.size_bytes,
            storage_path,
            checksum,
            stored_at: Utc::now(),
        })
    }
}
