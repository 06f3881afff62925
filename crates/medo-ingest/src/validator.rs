//! 上传文件验证模块
//!
//! 按固定顺序执行一组纯函数检查，第一个失败的检查决定拒绝原因。

use medo_core::utils::{has_extension, normalize_mime_type};
use medo_core::{RejectionReason, UploadCandidate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// MIME类型到规范扩展名的映射
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpeg"),
    ("application/dicom", "dcm"),
];

/// 没有规范扩展名时使用的通用二进制扩展名
const FALLBACK_EXTENSION: &str = "bin";

/// 上传策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    /// 单次上传最多文件数
    pub max_files: usize,
    /// 单个文件最大字节数
    pub max_file_size: u64,
    /// 允许的MIME类型
    pub allowed_mime_types: Vec<String>,
    /// 不论声明类型都接受的DICOM扩展名
    pub dicom_extension: String,
    /// 携带文件的multipart字段名
    pub field_name: String,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_file_size: 25 * 1024 * 1024,
            allowed_mime_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "application/dicom".to_string(),
                "application/dicom+json".to_string(),
            ],
            dicom_extension: "dcm".to_string(),
            field_name: "images".to_string(),
        }
    }
}

/// 单个文件的验证结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { extension: String },
    Rejected(RejectionReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }
}

/// 验证阶段
struct Stage {
    name: &'static str,
    check: fn(&UploadPolicy, &UploadCandidate) -> Result<(), RejectionReason>,
}

const STAGES: &[Stage] = &[
    Stage {
        name: "size",
        check: check_size,
    },
    Stage {
        name: "type",
        check: check_type,
    },
];

fn check_size(policy: &UploadPolicy, candidate: &UploadCandidate) -> Result<(), RejectionReason> {
    if candidate.size_bytes > policy.max_file_size {
        Err(RejectionReason::FileTooLarge {
            max_bytes: policy.max_file_size,
        })
    } else {
        Ok(())
    }
}

fn check_type(policy: &UploadPolicy, candidate: &UploadCandidate) -> Result<(), RejectionReason> {
    if is_allowed_type(policy, &candidate.declared_mime_type)
        || has_extension(&candidate.original_name, &policy.dicom_extension)
    {
        Ok(())
    } else {
        Err(RejectionReason::UnsupportedFileType)
    }
}

fn is_allowed_type(policy: &UploadPolicy, declared: &str) -> bool {
    let declared = normalize_mime_type(declared);
    policy
        .allowed_mime_types
        .iter()
        .any(|allowed| normalize_mime_type(allowed) == declared)
}

/// 上传验证器
#[derive(Debug, Clone)]
pub struct UploadValidator {
    policy: UploadPolicy,
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(UploadPolicy::default())
    }
}

impl UploadValidator {
    pub fn new(policy: UploadPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// 检查批次大小，必须在任何单文件检查之前执行
    pub fn check_batch(&self, count: usize) -> Result<(), RejectionReason> {
        if count > self.policy.max_files {
            Err(RejectionReason::TooManyFiles {
                max: self.policy.max_files,
            })
        } else {
            Ok(())
        }
    }

    /// 验证单个文件
    pub fn validate(&self, candidate: &UploadCandidate) -> Verdict {
        for stage in STAGES {
            if let Err(reason) = (stage.check)(&self.policy, candidate) {
                debug!(
                    "文件 {:?} 未通过 {} 检查: {}",
                    candidate.original_name, stage.name, reason
                );
                return Verdict::Rejected(reason);
            }
        }

        Verdict::Accepted {
            extension: self.resolve_extension(candidate),
        }
    }

    /// 根据声明的MIME类型解析扩展名
    fn resolve_extension(&self, candidate: &UploadCandidate) -> String {
        let declared = normalize_mime_type(&candidate.declared_mime_type);

        // 声明类型不在允许列表中，说明是靠 .dcm 文件名兜底接受的
        if !is_allowed_type(&self.policy, &declared) {
            return self
                .policy
                .dicom_extension
                .trim_start_matches('.')
                .to_ascii_lowercase();
        }

        MIME_EXTENSIONS
            .iter()
            .find(|(mime, _)| *mime == declared)
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
    }
}
