//! 存储命名
//!
//! 存储名只由随机标识和解析出的扩展名组成，从不读取原始文件名，
//! 以避免路径穿越和文件名冲突。

use uuid::Uuid;

/// 分配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedName {
    pub id: Uuid,
    pub storage_name: String,
}

/// 存储命名器
///
/// 无内部状态，可以在任意多个任务中并发使用。
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageNamer;

impl StorageNamer {
    pub fn new() -> Self {
        Self
    }

    /// 为解析出的扩展名分配一个唯一的存储名
    pub fn assign_name(&self, extension: &str) -> AssignedName {
        // UUID v4 的 122 位随机数来自操作系统的 CSPRNG
        let id = Uuid::new_v4();
        let extension = extension.trim_start_matches('.');
        let storage_name = if extension.is_empty() {
            id.to_string()
        } else {
            format!("{}.{}", id, extension)
        };

        AssignedName { id, storage_name }
    }
}
