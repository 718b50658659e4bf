use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::cli::ServeArgs;
use crate::core::result_set::MimeTypeSet;
use crate::core::types::MimeError;
use crate::matching::negotiation::negotiate;
use crate::registry::{MimeSleuth, SleuthConfig};
use crate::utils::validation::{validate_upload, ValidationError, MAX_UPLOAD_SIZE};

/// Security configuration constants to prevent `DoS` attacks
pub const MAX_MULTIPART_FIELDS: usize = 10;

/// Shared application state
pub struct AppState {
    pub sleuth: MimeSleuth,
}

/// Enhanced error response
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

/// One detected type in an API response
#[derive(Serialize, Deserialize, Debug)]
pub struct TypeInfo {
    #[serde(rename = "type")]
    pub mime_type: String,
    pub specificity: u32,
    pub encoding: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ClassifyResponse {
    pub types: Vec<TypeInfo>,
    pub most_specific: Option<String>,
    pub filename: Option<String>,
    pub processing_time_ms: u64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NegotiateResponse {
    pub selected: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DetectorInfo {
    pub name: String,
    pub description: String,
}

#[derive(Deserialize)]
struct NegotiateParams {
    provided: String,
}

/// Create a safe error response that prevents information disclosure
/// while logging detailed errors server-side for debugging
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    if let Some(internal_msg) = internal_error {
        tracing::error!("Internal error ({}): {}", error_type, internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None,
    }
}

fn error_response(status: StatusCode, error_type: &str, message: &str) -> Response {
    (
        status,
        Json(create_safe_error_response(error_type, message, None)),
    )
        .into_response()
}

/// Run the web server
///
/// # Errors
///
/// Returns an error if the tokio runtime cannot be created or the server fails to start.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args).await })
}

/// API routes without the network-facing middleware
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/classify", post(classify_handler))
        .route("/api/negotiate", get(negotiate_handler))
        .route("/api/detectors", get(detectors_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 1024 * 1024))
}

/// Create the application router with all routes and middleware configured.
///
/// # Errors
///
/// Returns an error if the detectors cannot be built from `config`.
pub fn create_router(config: &SleuthConfig) -> anyhow::Result<Router> {
    let sleuth = MimeSleuth::with_config(config)?;
    let state = Arc::new(AppState { sleuth });

    // Configure IP-based rate limiting
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10) // 10 requests per second per IP
        .burst_size(50) // Allow bursts of 50 requests
        .finish()
        .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?;

    let app = api_routes(state).layer(
        ServiceBuilder::new()
            // Security headers for browser protection
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-frame-options"),
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("referrer-policy"),
                HeaderValue::from_static("no-referrer"),
            ))
            // IP-based rate limiting to prevent abuse
            .layer(GovernorLayer {
                config: Arc::new(governor_conf),
            })
            // Request timeout to prevent slow client attacks
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(30),
            ))
            // Limit concurrent requests to prevent DOS
            .layer(ConcurrencyLimitLayer::new(100)),
    );

    Ok(app)
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => SleuthConfig::load_from_file(path)?,
        None => SleuthConfig::default(),
    };
    let app = create_router(&config)?;

    let addr = format!("{}:{}", args.address, args.port);
    println!("Starting mime-sleuth API at http://{addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn type_infos(result: &MimeTypeSet) -> Vec<TypeInfo> {
    result
        .detected()
        .map(|d| TypeInfo {
            mime_type: d.mime_type.to_string(),
            specificity: d.mime_type.specificity(),
            encoding: d.encoding.clone(),
        })
        .collect()
}

/// Uploaded file and its validated name
struct Upload {
    filename: Option<String>,
    content: Vec<u8>,
}

async fn extract_upload(multipart: &mut Multipart) -> Result<Upload, Response> {
    let mut fields_received = 0usize;
    loop {
        if fields_received >= MAX_MULTIPART_FIELDS {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "field_limit_exceeded",
                "Too many form fields",
            ));
        }

        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_multipart",
                    "Failed to parse upload",
                ))
            }
        };
        fields_received += 1;
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(ToString::to_string);
        let Ok(bytes) = field.bytes().await else {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "invalid_multipart",
                "Failed to read uploaded file",
            ));
        };

        return match validate_upload(filename.as_deref(), &bytes) {
            Ok(filename) => Ok(Upload {
                filename,
                content: bytes.to_vec(),
            }),
            Err(ValidationError::UploadTooLarge(_)) => Err(error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "file_too_large",
                "File size exceeds limit",
            )),
            Err(ValidationError::FilenameTooLong) => Err(error_response(
                StatusCode::BAD_REQUEST,
                "filename_too_long",
                "Filename exceeds maximum length limit",
            )),
            Err(_) => Err(error_response(
                StatusCode::BAD_REQUEST,
                "invalid_filename",
                "Filename contains invalid or dangerous characters",
            )),
        };
    }

    Err(error_response(
        StatusCode::BAD_REQUEST,
        "missing_input",
        "No file received. Please upload a 'file' field.",
    ))
}

/// API endpoint for classifying an uploaded file
async fn classify_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let start_time = std::time::Instant::now();

    let upload = match extract_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    let result = state
        .sleuth
        .classify_upload(upload.filename.as_deref(), &upload.content);

    #[allow(clippy::cast_possible_truncation)] // Processing time won't exceed u64
    let processing_time_ms = start_time.elapsed().as_millis() as u64;

    Json(ClassifyResponse {
        types: type_infos(&result),
        most_specific: result.most_specific().map(ToString::to_string),
        filename: upload.filename,
        processing_time_ms,
    })
    .into_response()
}

/// API endpoint negotiating against the request's Accept header
async fn negotiate_handler(
    Query(params): Query<NegotiateParams>,
    headers: HeaderMap,
) -> Response {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("*/*");

    match negotiate(accept, &params.provided) {
        Ok(selected) => Json(NegotiateResponse {
            selected: selected.to_string(),
        })
        .into_response(),
        Err(MimeError::InvalidQuality(_)) => error_response(
            StatusCode::BAD_REQUEST,
            "invalid_quality",
            "Accept header contains an invalid quality value",
        ),
        Err(MimeError::NothingProvided) => error_response(
            StatusCode::BAD_REQUEST,
            "nothing_provided",
            "At least one provided type is required",
        ),
        Err(_) => error_response(
            StatusCode::BAD_REQUEST,
            "invalid_mime_type",
            "Malformed MIME type",
        ),
    }
}

async fn detectors_handler(State(state): State<Arc<AppState>>) -> Json<Vec<DetectorInfo>> {
    Json(
        state
            .sleuth
            .detectors()
            .iter()
            .map(|d| DetectorInfo {
                name: d.name().to_string(),
                description: d.description().to_string(),
            })
            .collect(),
    )
}
