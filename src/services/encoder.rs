use base64::{engine::general_purpose, Engine};
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::models::{EncodedImage, ImagePayload};

const IMAGE_MIME_PREFIX: &str = "image/";

/// Base64-encode an image for inline transport to the model.
pub fn encode(payload: &ImagePayload) -> Result<EncodedImage> {
    if payload.bytes.is_empty() {
        return Err(AnalysisError::Encoding("image is empty".to_string()));
    }
    if !payload.mime_type.starts_with(IMAGE_MIME_PREFIX) {
        return Err(AnalysisError::Encoding(format!(
            "unsupported content type: {}",
            payload.mime_type
        )));
    }

    let data = general_purpose::STANDARD.encode(&payload.bytes);

    log::debug!("📊 Image size: {} bytes", payload.bytes.len());
    log::debug!("🔄 Base64 encoded size: {} bytes", data.len());

    Ok(EncodedImage {
        data,
        mime_type: payload.mime_type.clone(),
    })
}

/// Guess an image MIME type from a file name's extension.
pub fn mime_from_file_name(name: &str) -> Option<&'static str> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

impl ImagePayload {
    /// Read an image file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mime_type = path
            .to_str()
            .and_then(mime_from_file_name)
            .ok_or_else(|| {
                AnalysisError::Encoding(format!("not a recognised image file: {}", path.display()))
            })?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AnalysisError::Encoding(format!("failed to read {}: {}", path.display(), e))
        })?;

        Ok(Self::new(bytes, mime_type))
    }
}
