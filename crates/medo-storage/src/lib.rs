//! # Medo存储模块
//!
//! 负责上传影像的命名、落盘和批次回滚。

pub mod naming;
pub mod staging;
pub mod store;

pub use naming::{AssignedName, StorageNamer};
pub use staging::StagedBatch;
pub use store::{AssetStore, LocalAssetStore, ObjectAssetStore};
