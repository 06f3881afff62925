//! HTTP处理器

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        FromRequest, Multipart, Request, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    Form,
};
use bytes::BytesMut;
use medo_core::{ClinicalReport, MedoError, RejectionReason, Result, StoredAsset, UploadCandidate};
use medo_ingest::UploadPolicy;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::server::AppState;

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "Medo Care API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "upload": "/upload",
            "report": "/report"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 上传成功响应
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub files: Vec<UploadedFile>,
}

/// 单个已存储文件的描述
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
}

impl From<&StoredAsset> for UploadedFile {
    fn from(asset: &StoredAsset) -> Self {
        Self {
            filename: asset.storage_name.clone(),
            mimetype: asset.mime_type.clone(),
            size: asset.size_bytes,
        }
    }
}

/// 影像上传处理器
pub async fn upload_images(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let wants_json = accepts_json(&headers);

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            let err = MedoError::MalformedRequest(rejection.body_text());
            return ApiFailure::new(err, wants_json).into_response();
        }
    };

    let batch = match read_candidates(multipart, state.pipeline.validator().policy()).await {
        Ok(batch) => batch,
        Err(e) => return ApiFailure::new(e, wants_json).into_response(),
    };

    match state.pipeline.ingest(batch).await {
        Ok(assets) => {
            info!("上传完成: {} 个文件", assets.len());
            Json(UploadResponse {
                message: "Upload received".to_string(),
                files: assets.iter().map(UploadedFile::from).collect(),
            })
            .into_response()
        }
        Err(e) => ApiFailure::new(e, wants_json).into_response(),
    }
}

/// 读取multipart中的文件部分
///
/// 超过批次上限或单文件大小上限后不再缓存内容，只累计字节数，
/// 由验证器给出对应的拒绝原因。
async fn read_candidates(
    mut multipart: Multipart,
    policy: &UploadPolicy,
) -> Result<Vec<UploadCandidate>> {
    let mut batch = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, policy))?
    {
        if field.name() != Some(policy.field_name.as_str()) {
            debug!("忽略multipart字段: {:?}", field.name());
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let declared_mime_type = field.content_type().unwrap_or_default().to_string();
        let buffer = batch.len() < policy.max_files;

        let mut size_bytes = 0u64;
        let mut content = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, policy))?
        {
            size_bytes += chunk.len() as u64;
            if buffer && size_bytes <= policy.max_file_size {
                content.extend_from_slice(&chunk);
            }
        }

        batch.push(UploadCandidate {
            original_name,
            declared_mime_type,
            size_bytes,
            content: content.freeze(),
        });
    }

    Ok(batch)
}

/// 请求体超出路由上限只可能是某个文件过大
fn multipart_error(err: MultipartError, policy: &UploadPolicy) -> MedoError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RejectionReason::FileTooLarge {
            max_bytes: policy.max_file_size,
        }
        .into()
    } else {
        MedoError::MalformedRequest(err.body_text())
    }
}

/// 报告请求
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub findings_text: Option<String>,
}

/// 报告响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: ReportBody,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    pub findings: String,
    pub impression: String,
    pub recommendations: Vec<String>,
    pub patient_explanation: String,
}

impl From<ClinicalReport> for ReportBody {
    fn from(report: ClinicalReport) -> Self {
        Self {
            findings: report.findings,
            impression: report.impression,
            recommendations: report.recommendations,
            patient_explanation: report.patient_explanation,
        }
    }
}

/// 报告生成处理器，没有失败路径
pub async fn generate_report(
    State(state): State<AppState>,
    request: Request,
) -> Json<ReportResponse> {
    let request = read_report_request(request).await;

    let report = state.composer.compose(request.findings_text.as_deref());
    Json(ReportResponse {
        report: report.into(),
    })
}

/// 解析JSON或表单请求体，无法解析时按无所见处理
async fn read_report_request(request: Request) -> ReportRequest {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    let parsed = if is_form {
        Form::<ReportRequest>::from_request(request, &())
            .await
            .map(|Form(request)| request)
            .map_err(|rejection| rejection.body_text())
    } else {
        Json::<ReportRequest>::from_request(request, &())
            .await
            .map(|Json(request)| request)
            .map_err(|rejection| rejection.body_text())
    };

    parsed.unwrap_or_else(|reason| {
        debug!("报告请求体无法解析，按无所见处理: {}", reason);
        ReportRequest::default()
    })
}

/// 请求是否偏好JSON响应
fn accepts_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false)
}

/// 上传失败响应：按 Accept 头返回JSON或纯文本
pub struct ApiFailure {
    error: MedoError,
    wants_json: bool,
}

impl ApiFailure {
    pub fn new(error: MedoError, wants_json: bool) -> Self {
        Self { error, wants_json }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = if self.error.is_client_error() {
            warn!("上传被拒绝: {}", self.error);
            StatusCode::BAD_REQUEST
        } else {
            error!("上传失败: {}", self.error);
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let message = self.error.public_message();
        if self.wants_json {
            (status, Json(json!({ "error": message }))).into_response()
        } else {
            (status, message).into_response()
        }
    }
}
