//! 错误定义模块

use thiserror::Error;

/// 上传批次被拒绝的原因
///
/// 这些消息会原样返回给调用方，因此保持为面向用户的英文文本。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("Too many files. At most {max} files can be uploaded at once.")]
    TooManyFiles { max: usize },

    #[error("File too large. Maximum size is {} per file.", human_size(.max_bytes))]
    FileTooLarge { max_bytes: u64 },

    #[error("Unsupported file type. Allowed: PNG, JPEG, DICOM (.dcm)")]
    UnsupportedFileType,
}

/// 以MB/KB/字节显示大小限制
fn human_size(bytes: &u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    let bytes = *bytes;
    if bytes >= MB && bytes % MB == 0 {
        format!("{} MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Medo系统统一错误类型
#[derive(Error, Debug)]
pub enum MedoError {
    #[error("{0}")]
    Rejected(#[from] RejectionReason),

    #[error("存储写入失败: {0}")]
    StorageWrite(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("请求格式错误: {0}")]
    MalformedRequest(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl MedoError {
    /// 是否为用户可修正的错误（4xx）
    pub fn is_client_error(&self) -> bool {
        matches!(self, MedoError::Rejected(_) | MedoError::MalformedRequest(_))
    }

    /// 可以安全返回给调用方的消息，不包含内部路径等信息
    pub fn public_message(&self) -> String {
        match self {
            MedoError::Rejected(reason) => reason.to_string(),
            MedoError::MalformedRequest(_) => "Malformed upload request.".to_string(),
            _ => "Upload failed. Please try again later.".to_string(),
        }
    }
}

/// Medo系统统一结果类型
pub type Result<T> = std::result::Result<T, MedoError>;
