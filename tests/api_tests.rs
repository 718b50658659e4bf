//! HTTP API routes, driven in-process through `tower::ServiceExt`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use tower::ServiceExt;

use mime_sleuth::web::server::{
    api_routes, AppState, ClassifyResponse, DetectorInfo, ErrorResponse, NegotiateResponse,
};
use mime_sleuth::MimeSleuth;

const BOUNDARY: &str = "api-test-boundary";

fn app() -> axum::Router {
    api_routes(Arc::new(AppState {
        sleuth: MimeSleuth::new().expect("default detectors"),
    }))
}

fn upload(filename: Option<&str>, content: &[u8]) -> Request<Body> {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"file\"; filename=\"{name}\""),
        None => "form-data; name=\"file\"".to_string(),
    };
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/classify")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_classify_upload() {
    let response = app()
        .oneshot(upload(
            Some("image.png"),
            b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: ClassifyResponse = json_body(response).await;
    assert_eq!(body.filename.as_deref(), Some("image.png"));
    assert_eq!(body.most_specific.as_deref(), Some("image/png"));
    let png = body.types.iter().find(|t| t.mime_type == "image/png").unwrap();
    assert!(png.specificity >= 2);
}

#[tokio::test]
async fn test_classify_upload_without_name() {
    let response = app().oneshot(upload(None, b"%PDF-1.5\n")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: ClassifyResponse = json_body(response).await;
    assert!(body.filename.is_none());
    assert!(body.types.iter().any(|t| t.mime_type == "application/pdf"));
}

#[tokio::test]
async fn test_classify_rejects_traversal_name() {
    let response = app()
        .oneshot(upload(Some("../../etc/passwd"), b"root:x:0:0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.error_type, "invalid_filename");
    assert!(body.details.is_none());
}

#[tokio::test]
async fn test_classify_without_file_field() {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/classify")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.error_type, "missing_input");
}

fn negotiate_request(accept: Option<&str>, provided: &str) -> Request<Body> {
    let mut builder = Request::builder().uri(format!("/api/negotiate?provided={provided}"));
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_negotiate_with_accept_header() {
    let response = app()
        .oneshot(negotiate_request(
            Some("text/*;q=0.5, application/json"),
            "text/html,application/json",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: NegotiateResponse = json_body(response).await;
    assert_eq!(body.selected, "application/json");
}

#[tokio::test]
async fn test_negotiate_without_accept_takes_first() {
    let response = app()
        .oneshot(negotiate_request(None, "text/csv,text/plain"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: NegotiateResponse = json_body(response).await;
    assert_eq!(body.selected, "text/csv");
}

#[tokio::test]
async fn test_negotiate_invalid_quality() {
    let response = app()
        .oneshot(negotiate_request(Some("text/html;q=abc"), "text/html,text/plain"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.error_type, "invalid_quality");
}

#[tokio::test]
async fn test_negotiate_nothing_provided() {
    let response = app()
        .oneshot(negotiate_request(Some("*/*"), ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.error_type, "nothing_provided");
}

#[tokio::test]
async fn test_list_detectors() {
    let request = Request::builder()
        .uri("/api/detectors")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let detectors: Vec<DetectorInfo> = json_body(response).await;
    assert!(detectors.iter().any(|d| d.name.contains("magic")));
    assert!(detectors.iter().any(|d| d.name.contains("extension")));
}
