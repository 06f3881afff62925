//! Web服务器

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue},
    routing::{get, post},
    Router,
};
use medo_core::Result;
use medo_ingest::IngestionPipeline;
use medo_report::ReportComposer;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{api_root, generate_report, health, upload_images};

/// multipart 边界和表单字段的额外开销
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// 安全响应头，处理器已设置时不覆盖
fn security_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ),
    ]
}

/// 请求间共享的只读状态
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub composer: Arc<ReportComposer>,
}

impl AppState {
    pub fn new(pipeline: IngestionPipeline, composer: ReportComposer) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            composer: Arc::new(composer),
        }
    }
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        let app = create_app(state);

        Self { addr, app }
    }

    pub async fn run(self) -> Result<()> {
        info!("Web服务启动: http://{}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Web服务已停止");
        Ok(())
    }
}

/// 构建路由
pub fn create_app(state: AppState) -> Router {
    let policy = state.pipeline.validator().policy();
    // 多留一个文件的余量，让超出数量的批次仍能得到 TooManyFiles 而不是请求体过大
    let body_limit = (policy.max_files + 1)
        .saturating_mul(usize::try_from(policy.max_file_size).unwrap_or(usize::MAX))
        .saturating_add(MULTIPART_OVERHEAD);

    let mut app = Router::new()
        // 根路径
        .route("/", get(api_root))
        // 健康检查
        .route("/health", get(health))
        // 影像上传
        .route(
            "/upload",
            post(upload_images).layer(DefaultBodyLimit::max(body_limit)),
        )
        // 报告生成
        .route("/report", post(generate_report))
        .with_state(state)
        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(CompressionLayer::new()),
        );

    for (name, value) in security_headers() {
        app = app.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    app
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("监听退出信号失败: {}", e);
        std::future::pending::<()>().await;
    }
    info!("收到退出信号，正在关闭");
}
