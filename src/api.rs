use serde::Serialize;

use crate::models::ImagePayload;
use crate::services::encoder::mime_from_file_name;

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// Message returned for every failed analysis; details stay in the logs.
pub const ANALYSIS_FAILED: &str = "Image analysis failed";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Turn an uploaded file into a payload, rejecting anything that is not an image.
///
/// Browsers sometimes omit the part's content type, in which case it is
/// guessed from the file name. Empty files are left for the encoder to reject.
pub fn upload_to_payload(
    content_type: Option<&str>,
    file_name: Option<&str>,
    bytes: Vec<u8>,
) -> Result<ImagePayload, String> {
    let mime_type = match content_type {
        Some(ct) if ct.starts_with("image/") => ct.to_string(),
        Some(ct) if ct != "application/octet-stream" => {
            return Err(format!("Unsupported file type: {}", ct))
        }
        _ => file_name
            .and_then(mime_from_file_name)
            .ok_or_else(|| "Uploaded file is not an image".to_string())?
            .to_string(),
    };

    Ok(ImagePayload::new(bytes, mime_type))
}

#[cfg(feature = "http-server")]
pub mod server {
    use super::*;
    use axum::{
        extract::{
            multipart::{MultipartError, MultipartRejection},
            DefaultBodyLimit, Multipart, State,
        },
        http::{header, Method, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceBuilder;
    use tower_http::cors::{Any, CorsLayer};

    use crate::handlers::AnalysisPipeline;

    pub struct AppState {
        pub pipeline: AnalysisPipeline,
    }

    pub fn create_router(pipeline: AnalysisPipeline, max_upload_bytes: usize) -> Router {
        let state = Arc::new(AppState { pipeline });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        Router::new()
            .route("/", get(root_handler))
            .route("/analyze", post(analyze_handler).options(preflight_handler))
            .route("/health", get(health_check))
            .layer(
                ServiceBuilder::new()
                    .layer(cors)
                    .layer(DefaultBodyLimit::max(max_upload_bytes)),
            )
            .with_state(state)
    }

    fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
        (status, Json(ErrorBody::new(message))).into_response()
    }

    async fn analyze_handler(
        State(state): State<Arc<AppState>>,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Response {
        let mut multipart = match multipart {
            Ok(m) => m,
            Err(e) => {
                log::warn!("⚠️ Rejected non-multipart upload: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "No image file provided");
            }
        };

        let payload = match read_image_field(&mut multipart).await {
            Ok(payload) => payload,
            Err((status, message)) => {
                log::warn!("⚠️ Bad upload ({}): {}", status, message);
                return error_response(status, message);
            }
        };

        log::info!(
            "📸 Analyzing upload: {} bytes ({})",
            payload.bytes.len(),
            payload.mime_type
        );

        // Dropping this handler (client went away) cancels the model call.
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        match state.pipeline.run(payload, &cancel).await {
            Ok(result) => {
                log::info!("✅ Responding with {} result", result.kind());
                (StatusCode::OK, Json(result)).into_response()
            }
            Err(e) => {
                log::error!("❌ Analysis error ({}): {}", e.kind(), e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, ANALYSIS_FAILED)
            }
        }
    }

    async fn read_image_field(
        multipart: &mut Multipart,
    ) -> Result<ImagePayload, (StatusCode, String)> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_failure("Malformed multipart body", e))?
        {
            if field.name() != Some(IMAGE_FIELD) {
                continue;
            }

            let content_type = field.content_type().map(str::to_string);
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_failure("Failed to read image", e))?;

            return upload_to_payload(
                content_type.as_deref(),
                file_name.as_deref(),
                bytes.to_vec(),
            )
            .map_err(|message| (StatusCode::BAD_REQUEST, message));
        }

        Err((StatusCode::BAD_REQUEST, "No image file provided".to_string()))
    }

    /// Oversized bodies surface as 413, everything else as 400.
    fn multipart_failure(context: &str, err: MultipartError) -> (StatusCode, String) {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Image is too large".to_string())
            }
            _ => (StatusCode::BAD_REQUEST, format!("{}: {}", context, err)),
        }
    }

    async fn preflight_handler() -> StatusCode {
        StatusCode::NO_CONTENT
    }

    async fn root_handler() -> &'static str {
        "food-lens - POST an image to /analyze as multipart field 'image'"
    }

    async fn health_check() -> &'static str {
        "OK"
    }

}
