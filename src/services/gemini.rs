use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::gateway::{cancellable, require_api_key, ModelGateway};
use crate::config::GatewayConfig;
use crate::error::{AnalysisError, Result};
use crate::models::EncodedImage;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Google Gemini `generateContent` client.
pub struct GeminiGateway {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn send(&self, api_key: &str, prompt: &str, image: &EncodedImage) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                ],
            }],
        };

        log::info!("🤖 Sending request to Gemini with model: {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("❌ Gemini API error response: {}", error_text);
            return Err(AnalysisError::Gateway(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let response_text = response.text().await?;
        log::debug!("📄 Raw Gemini response size: {} bytes", response_text.len());

        extract_text(&response_text)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::Gateway(format!("unreadable Gemini response: {}", e)))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AnalysisError::Gateway("Gemini returned no text".to_string()));
    }
    Ok(text)
}

#[async_trait::async_trait]
impl ModelGateway for GeminiGateway {
    fn ensure_configured(&self) -> Result<()> {
        require_api_key(self.api_key.as_deref(), "Gemini").map(|_| ())
    }

    async fn generate(
        &self,
        prompt: &str,
        image: &EncodedImage,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let api_key = require_api_key(self.api_key.as_deref(), "Gemini")?;
        cancellable(cancel, self.send(api_key, prompt, image)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use crate::services::gateway::testing::silent_endpoint;
    use std::time::Duration;

    fn image() -> EncodedImage {
        EncodedImage {
            data: "aGVsbG8=".to_string(),
            mime_type: "image/jpeg".to_string(),
        }
    }

    #[test]
    fn test_request_shape() {
        let image = image();
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "describe" },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                ],
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "aGVsbG8=");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"isFood\":"},{"text":" true}"}],"role":"model"}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "{\"isFood\": true}");
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(extract_text(body), Err(AnalysisError::Gateway(_))));
    }

    #[test]
    fn test_extract_text_unreadable() {
        assert!(matches!(extract_text("<html>"), Err(AnalysisError::Gateway(_))));
    }

    #[test]
    fn test_endpoint() {
        let config = GatewayConfig::new(Provider::Gemini, Some("test_key".to_string()));
        let gateway = GeminiGateway::new(&config).unwrap();
        assert_eq!(
            gateway.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let config = GatewayConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..GatewayConfig::new(Provider::Gemini, None)
        };
        let gateway = GeminiGateway::new(&config).unwrap();

        assert!(matches!(gateway.ensure_configured(), Err(AnalysisError::Configuration(_))));
        let result = gateway
            .generate("prompt", &image(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AnalysisError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_gateway_error() {
        let config = GatewayConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..GatewayConfig::new(Provider::Gemini, Some("test_key".to_string()))
        };
        let gateway = GeminiGateway::new(&config).unwrap();

        let result = gateway
            .generate("prompt", &image(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AnalysisError::Gateway(_))));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out_as_gateway_error() {
        let config = GatewayConfig {
            base_url: silent_endpoint().await,
            timeout: Duration::from_millis(200),
            ..GatewayConfig::new(Provider::Gemini, Some("test_key".to_string()))
        };
        let gateway = GeminiGateway::new(&config).unwrap();

        let result = gateway
            .generate("prompt", &image(), &CancellationToken::new())
            .await;

        match result {
            Err(AnalysisError::Gateway(message)) => {
                assert!(message.contains("timed out"), "{}", message)
            }
            other => panic!("expected a gateway timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_in_flight_request() {
        let config = GatewayConfig {
            base_url: silent_endpoint().await,
            ..GatewayConfig::new(Provider::Gemini, Some("test_key".to_string()))
        };
        let gateway = GeminiGateway::new(&config).unwrap();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let result = gateway.generate("prompt", &image(), &cancel).await;
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }
}
