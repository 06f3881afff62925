//! Medo Care 服务器主程序

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use medo_ingest::{IngestionPipeline, UploadValidator};
use medo_report::{ReportComposer, ReportTranslator, RuleSet};
use medo_storage::{AssetStore, LocalAssetStore, ObjectAssetStore};
use medo_web::{AppState, WebServer};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{MedoConfig, StorageBackend};

/// Medo Care 服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "medo-server")]
#[command(about = "Medo Care 影像上传与报告翻译服务")]
struct Args {
    /// 监听主机
    #[arg(long)]
    host: Option<String>,

    /// 服务器端口
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// 上传文件存储目录
    #[arg(short, long)]
    storage_dir: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别（RUST_LOG 优先）
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("启动Medo Care服务器...");

    let mut config = MedoConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(storage_dir) = args.storage_dir {
        config.storage.root_path = storage_dir;
    }
    config.validate()?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;

    info!("Medo Care服务器配置:");
    info!("  监听地址: {}", addr);
    info!("  存储后端: {:?}", config.storage.backend);
    info!("  存储目录: {}", config.storage.root_path);
    info!(
        "  上传限制: {} 个文件, 每个 {} 字节",
        config.upload.max_files, config.upload.max_file_size
    );

    let state = build_state(&config).await?;
    WebServer::new(addr, state).run().await?;

    Ok(())
}

/// 按配置组装上传流水线和报告组装器
async fn build_state(config: &MedoConfig) -> Result<AppState> {
    let store: Arc<dyn AssetStore> = match config.storage.backend {
        StorageBackend::Local => Arc::new(
            LocalAssetStore::open(&config.storage.root_path)
                .await
                .with_context(|| format!("Failed to open storage at {}", config.storage.root_path))?,
        ),
        StorageBackend::Memory => {
            warn!("使用内存存储，进程退出后上传文件将丢失");
            Arc::new(ObjectAssetStore::in_memory())
        }
    };

    let rules = RuleSet::from_specs(&config.translation.rules)?;
    for violation in rules.check_idempotent() {
        warn!(
            "翻译规则不满足幂等: 模式 {:?} 会匹配输出 {:?}",
            violation.pattern, violation.matched_replacement
        );
    }
    info!("已加载 {} 条翻译规则", rules.len());

    let pipeline = IngestionPipeline::new(UploadValidator::new(config.upload.clone()), store);
    let composer = ReportComposer::new(
        ReportTranslator::new(Arc::new(rules)),
        config.report.clone(),
    );

    Ok(AppState::new(pipeline, composer))
}
