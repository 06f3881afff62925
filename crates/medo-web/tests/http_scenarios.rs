//! 上传与报告接口的端到端测试

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use medo_ingest::{IngestionPipeline, UploadPolicy, UploadValidator};
use medo_report::ReportComposer;
use medo_storage::LocalAssetStore;
use medo_web::{create_app, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "medo-test-boundary";

struct Part<'a> {
    field: &'a str,
    filename: &'a str,
    mime: &'a str,
    data: Vec<u8>,
}

fn image<'a>(filename: &'a str, mime: &'a str, data: &[u8]) -> Part<'a> {
    Part {
        field: "images",
        filename,
        mime,
        data: data.to_vec(),
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.field, part.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.mime).as_bytes());
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>], accept_json: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if accept_json {
        builder = builder.header(header::ACCEPT, "application/json");
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

fn report_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/report")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn app_with_policy(policy: UploadPolicy) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalAssetStore::open(dir.path()).await.unwrap();
    let pipeline = IngestionPipeline::new(UploadValidator::new(policy), Arc::new(store));
    let state = AppState::new(pipeline, ReportComposer::default());
    (create_app(state), dir)
}

async fn app() -> (Router, tempfile::TempDir) {
    app_with_policy(UploadPolicy::default()).await
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn stored_files(dir: &tempfile::TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";

#[tokio::test]
async fn test_upload_two_pngs() {
    let (app, dir) = app().await;

    let request = upload_request(
        &[image("a.png", "image/png", PNG), image("b.png", "image/png", PNG)],
        true,
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["message"], "Upload received");

    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_ne!(files[0]["filename"], files[1]["filename"]);
    for file in files {
        assert!(file["filename"].as_str().unwrap().ends_with(".png"));
        assert_eq!(file["mimetype"], "image/png");
        assert_eq!(file["size"], PNG.len());
    }
    assert_eq!(stored_files(&dir), 2);
}

#[tokio::test]
async fn test_upload_dcm_with_generic_type() {
    let (app, dir) = app().await;

    let request = upload_request(
        &[image("scan.dcm", "application/octet-stream", b"DICM")],
        true,
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let filename = body["files"][0]["filename"].as_str().unwrap();
    assert!(filename.ends_with(".dcm"));
    assert!(!filename.contains("scan"));
    assert_eq!(stored_files(&dir), 1);
}

#[tokio::test]
async fn test_upload_txt_rejected_as_json() {
    let (app, dir) = app().await;

    let request = upload_request(&[image("notes.txt", "text/plain", b"hello")], true);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Unsupported file type"));
    assert_eq!(stored_files(&dir), 0);
}

#[tokio::test]
async fn test_upload_txt_rejected_as_plain_text() {
    let (app, dir) = app().await;

    let request = upload_request(&[image("notes.txt", "text/plain", b"hello")], false);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    assert!(body_text(response).await.contains("Unsupported file type"));
    assert_eq!(stored_files(&dir), 0);
}

#[tokio::test]
async fn test_upload_mixed_batch_leaves_nothing_behind() {
    let (app, dir) = app().await;

    let request = upload_request(
        &[
            image("a.png", "image/png", PNG),
            image("b.jpg", "image/jpeg", b"\xff\xd8\xff"),
            image("notes.txt", "text/plain", b"hello"),
        ],
        true,
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stored_files(&dir), 0);
}

#[tokio::test]
async fn test_upload_six_files_rejected() {
    let (app, dir) = app().await;

    let parts: Vec<_> = (0..6).map(|_| image("a.png", "image/png", PNG)).collect();
    let response = app.oneshot(upload_request(&parts, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Too many files"));
    assert_eq!(stored_files(&dir), 0);
}

#[tokio::test]
async fn test_upload_oversized_file_rejected() {
    let policy = UploadPolicy {
        max_file_size: 1024,
        ..UploadPolicy::default()
    };
    let (app, dir) = app_with_policy(policy).await;

    let request = upload_request(
        &[
            image("a.png", "image/png", PNG),
            image("big.png", "image/png", &vec![0u8; 2048]),
        ],
        true,
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("File too large"));
    assert_eq!(stored_files(&dir), 0);
}

#[tokio::test]
async fn test_upload_past_body_limit_is_too_large() {
    let policy = UploadPolicy {
        max_file_size: 1024,
        ..UploadPolicy::default()
    };
    let (app, dir) = app_with_policy(policy).await;

    let request = upload_request(
        &[image("huge.png", "image/png", &vec![0u8; 2 * 1024 * 1024])],
        true,
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "File too large. Maximum size is 1 KB per file."
    );
    assert_eq!(stored_files(&dir), 0);
}

#[tokio::test]
async fn test_upload_ignores_other_fields() {
    let (app, dir) = app().await;

    let request = upload_request(
        &[
            Part {
                field: "notes",
                filename: "notes.txt",
                mime: "text/plain",
                data: b"ignored".to_vec(),
            },
            image("a.png", "image/png", PNG),
        ],
        true,
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["files"].as_array().unwrap().len(), 1);
    assert_eq!(stored_files(&dir), 1);
}

#[tokio::test]
async fn test_upload_without_multipart_is_malformed() {
    let (app, _dir) = app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::ACCEPT, "application/json")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Malformed upload request.");
}

#[tokio::test]
async fn test_report_specific_finding() {
    let (app, _dir) = app().await;

    let request = report_request(json!({
        "findingsText": "Right lower lobe consolidation with air bronchograms"
    }));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body["report"]["patientExplanation"],
        "There is likely pneumonia in the lower part of your right lung."
    );
    assert_eq!(
        body["report"]["findings"],
        "Right lower lobe consolidation with air bronchograms"
    );
}

#[tokio::test]
async fn test_report_general_finding() {
    let (app, _dir) = app().await;

    let response = app
        .oneshot(report_request(json!({ "findingsText": "consolidation" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["report"]["patientExplanation"]
        .as_str()
        .unwrap()
        .contains("a dense area in the lung, often due to infection (like pneumonia)"));
}

#[tokio::test]
async fn test_report_empty_finding_uses_defaults() {
    let (app, _dir) = app().await;

    let response = app
        .oneshot(report_request(json!({ "findingsText": "" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let report = &body["report"];
    assert_eq!(report["findings"], "No acute cardiopulmonary abnormality identified.");
    assert_eq!(report["patientExplanation"], "Your lungs look okay overall.");
    assert_eq!(
        report["impression"],
        "Imaging features are most compatible with community-acquired pneumonia."
    );
    assert_eq!(report["recommendations"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_report_without_body_still_succeeds() {
    let (app, _dir) = app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/report")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["report"]["patientExplanation"], "Your lungs look okay overall.");
}

#[tokio::test]
async fn test_health_reports_status() {
    let (app, _dir) = app().await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_report_from_form_body() {
    let (app, _dir) = app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/report")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("findingsText=consolidation"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["report"]["findings"], "consolidation");
    assert!(body["report"]["patientExplanation"]
        .as_str()
        .unwrap()
        .contains("a dense area in the lung"));
}

#[tokio::test]
async fn test_report_whitespace_finding_kept() {
    let (app, _dir) = app().await;

    let response = app
        .oneshot(report_request(json!({ "findingsText": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["report"]["findings"], "   ");
    assert_eq!(body["report"]["patientExplanation"], "   ");
}

#[tokio::test]
async fn test_security_headers_present() {
    let (app, _dir) = app().await;

    let request = upload_request(&[image("notes.txt", "text/plain", b"hello")], true);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
    assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
    assert_eq!(headers[header::X_DNS_PREFETCH_CONTROL], "off");
    assert_eq!(headers["x-permitted-cross-domain-policies"], "none");
    assert!(headers.get(header::CONTENT_SECURITY_POLICY).is_none());
}

#[tokio::test]
async fn test_responses_gzip_on_request() {
    let (app, _dir) = app().await;

    let request = Request::builder()
        .uri("/")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(body_json(response).await["service"], "Medo Care API");
}
