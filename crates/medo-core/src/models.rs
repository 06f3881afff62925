//! 核心数据模型定义

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 待上传文件（由传输层按请求构造，不持久化）
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub original_name: String,      // 客户端提供的原始文件名
    pub declared_mime_type: String, // 客户端声明的MIME类型
    pub size_bytes: u64,            // 客户端发送的字节数
    pub content: Bytes,
}

impl UploadCandidate {
    pub fn new(
        original_name: impl Into<String>,
        declared_mime_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        let content = content.into();
        Self {
            original_name: original_name.into(),
            declared_mime_type: declared_mime_type.into(),
            size_bytes: content.len() as u64,
            content,
        }
    }
}

/// 已存储的影像资产
///
/// 每个被接受的文件恰好创建一次，创建后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredAsset {
    pub id: Uuid,
    pub storage_name: String, // id + 扩展名，与原始文件名无关
    pub mime_type: String,
    pub size_bytes: u64,
    pub storage_path: String,
    pub checksum: String, // SHA-256 十六进制
    pub stored_at: DateTime<Utc>,
}

/// 单次上传请求的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadState {
    Received,
    Validating,
    Stored,   // 终态，外部分析流程可从此处接手
    Rejected, // 终态，附带拒绝原因
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Received => write!(f, "received"),
            UploadState::Validating => write!(f, "validating"),
            UploadState::Stored => write!(f, "stored"),
            UploadState::Rejected => write!(f, "rejected"),
        }
    }
}

/// 临床报告
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClinicalReport {
    pub findings_raw: String,        // 原始输入，可能为空
    pub findings: String,            // 原始输入或默认的正常所见
    pub findings_translated: String, // 经过规则翻译后的所见
    pub impression: String,
    pub recommendations: Vec<String>,
    pub patient_explanation: String,
}
