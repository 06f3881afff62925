//! 影像存储管理

use async_trait::async_trait;
use bytes::Bytes;
use medo_core::{MedoError, Result};
use object_store::{path::Path as ObjectPath, ObjectStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// 资产存储后端
///
/// 所有写入都以存储名为键，存储名由 [`crate::StorageNamer`] 生成。
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// 写入文件，返回存储路径
    async fn put(&self, storage_name: &str, data: Bytes) -> Result<String>;

    /// 删除文件，文件不存在时视为成功
    async fn delete(&self, storage_name: &str) -> Result<()>;

    /// 文件是否存在
    async fn exists(&self, storage_name: &str) -> Result<bool>;

    /// 后端名称，用于日志
    fn backend(&self) -> &'static str;
}

/// 存储名只允许字母、数字、`-` 和 `.`，且不能以 `.` 开头
fn ensure_safe_name(storage_name: &str) -> Result<()> {
    let valid = !storage_name.is_empty()
        && !storage_name.starts_with('.')
        && storage_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');

    if valid {
        Ok(())
    } else {
        Err(MedoError::Storage(format!("非法存储名: {}", storage_name)))
    }
}

/// 本地文件系统存储
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    base_path: PathBuf,
}

impl LocalAssetStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// 创建存储并确保根目录存在
    pub async fn open(base_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::new(base_path);
        tokio::fs::create_dir_all(&store.base_path).await?;
        Ok(store)
    }

    fn full_path(&self, storage_name: &str) -> Result<PathBuf> {
        ensure_safe_name(storage_name)?;
        Ok(self.base_path.join(storage_name))
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn put(&self, storage_name: &str, data: Bytes) -> Result<String> {
        let full_path = self.full_path(storage_name)?;

        // create_new 保证不会覆盖已有文件
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .await
            .map_err(|e| MedoError::StorageWrite(format!("{}: {}", full_path.display(), e)))?;

        let written = async {
            file.write_all(&data).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(&full_path).await {
                warn!("清理未写完的文件失败 {}: {}", full_path.display(), cleanup);
            }
            return Err(MedoError::StorageWrite(format!("{}: {}", full_path.display(), e)));
        }

        debug!("文件已写入: {} ({} bytes)", full_path.display(), data.len());
        Ok(full_path.to_string_lossy().to_string())
    }

    async fn delete(&self, storage_name: &str) -> Result<()> {
        let full_path = self.full_path(storage_name)?;
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MedoError::Storage(format!("{}: {}", full_path.display(), e))),
        }
    }

    async fn exists(&self, storage_name: &str) -> Result<bool> {
        let full_path = self.full_path(storage_name)?;
        Ok(tokio::fs::try_exists(&full_path).await?)
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

/// 基于 object_store 的存储（内存、本地或云对象存储）
#[derive(Debug, Clone)]
pub struct ObjectAssetStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl ObjectAssetStore {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    /// 内存存储，进程退出即丢失
    pub fn in_memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()), "uploads")
    }

    fn object_path(&self, storage_name: &str) -> Result<ObjectPath> {
        ensure_safe_name(storage_name)?;
        if self.prefix.is_empty() {
            Ok(ObjectPath::from(storage_name))
        } else {
            Ok(ObjectPath::from(format!("{}/{}", self.prefix, storage_name)))
        }
    }
}

#[async_trait]
impl AssetStore for ObjectAssetStore {
    async fn put(&self, storage_name: &str, data: Bytes) -> Result<String> {
        let path = self.object_path(storage_name)?;
        self.store
            .put(&path, data)
            .await
            .map_err(|e| MedoError::StorageWrite(format!("{}: {}", path, e)))?;

        Ok(path.to_string())
    }

    async fn delete(&self, storage_name: &str) -> Result<()> {
        let path = self.object_path(storage_name)?;
        match self.store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(MedoError::Storage(format!("{}: {}", path, e))),
        }
    }

    async fn exists(&self, storage_name: &str) -> Result<bool> {
        let path = self.object_path(storage_name)?;
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(MedoError::Storage(format!("{}: {}", path, e))),
        }
    }

    fn backend(&self) -> &'static str {
        "object_store"
    }
}
