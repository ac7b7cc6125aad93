use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{AnalysisError, Result};
use crate::models::EncodedImage;

/// A multimodal model that turns a prompt plus one image into text.
#[async_trait::async_trait]
pub trait ModelGateway: Send + Sync {
    /// Fails with [`AnalysisError::Configuration`] when no credential is set.
    fn ensure_configured(&self) -> Result<()>;

    /// One call to the model. Never retried.
    async fn generate(
        &self,
        prompt: &str,
        image: &EncodedImage,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// Drive `request` to completion unless `cancel` fires first.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    request: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            log::warn!("🛑 Model call cancelled by caller");
            Err(AnalysisError::Cancelled)
        }
        result = request => result,
    }
}

/// Credential check shared by the concrete gateways.
pub(crate) fn require_api_key<'a>(api_key: Option<&'a str>, provider: &str) -> Result<&'a str> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(AnalysisError::Configuration(format!(
            "{} API key not configured",
            provider
        ))),
    }
}
