//! 配置管理
//!
//! 默认值 < 配置文件 < `MEDO__` 前缀的环境变量 < 命令行参数。

use anyhow::{bail, Context, Result};
use ::config::{Config, Environment, File};
use medo_ingest::UploadPolicy;
use medo_report::{ReportTemplate, RuleSet, RuleSpec};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 服务完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedoConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 存储配置
    pub storage: StorageConfig,
    /// 上传策略
    pub upload: UploadPolicy,
    /// 报告模板
    pub report: ReportTemplate,
    /// 翻译规则
    pub translation: TranslationConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Memory,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 存储后端
    pub backend: StorageBackend,
    /// 本地存储根目录
    pub root_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root_path: "./uploads".to_string(),
        }
    }
}

/// 翻译规则配置，顺序即优先级
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub rules: Vec<RuleSpec>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            rules: RuleSet::default_specs(),
        }
    }
}

impl MedoConfig {
    /// 加载配置，未指定文件时只使用默认值和环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(Environment::with_prefix("MEDO").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: MedoConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        match config_path {
            Some(path) => info!("配置加载完成: {}", path),
            None => info!("配置加载完成: 默认值与环境变量"),
        }
        Ok(config)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("Server port cannot be 0");
        }
        if self.upload.max_files == 0 {
            bail!("upload.max_files must be at least 1");
        }
        if self.upload.max_file_size == 0 {
            bail!("upload.max_file_size must be at least 1 byte");
        }
        if self.upload.allowed_mime_types.is_empty() {
            bail!("upload.allowed_mime_types cannot be empty");
        }
        if self.upload.field_name.trim().is_empty() {
            bail!("upload.field_name cannot be empty");
        }
        if self.storage.backend == StorageBackend::Local && self.storage.root_path.trim().is_empty() {
            bail!("storage.root_path cannot be empty for the local backend");
        }

        RuleSet::from_specs(&self.translation.rules).context("Invalid translation rules")?;

        Ok(())
    }
}
