use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::gateway::{cancellable, require_api_key, ModelGateway};
use crate::config::GatewayConfig;
use crate::error::{AnalysisError, Result};
use crate::models::EncodedImage;

const MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        #[serde(rename = "type")]
        content_type: String,
        text: String,
    },
    ImageUrl {
        #[serde(rename = "type")]
        content_type: String,
        image_url: ImageData,
    },
}

#[derive(Debug, Serialize)]
struct ImageData {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: Option<String>,
}

/// OpenRouter (OpenAI-compatible) chat completions client.
pub struct OpenRouterGateway {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterGateway {
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

    fn build_request(&self, prompt: &str, image: &EncodedImage) -> ChatRequest {
        let data_url = format!("data:{};base64,{}", image.mime_type, image.data);
        log::debug!(
            "🖼️ Image data URL created: {}... (first 100 chars)",
            data_url.chars().take(100).collect::<String>()
        );

        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        content_type: "text".to_string(),
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        content_type: "image_url".to_string(),
                        image_url: ImageData { url: data_url },
                    },
                ],
            }],
            max_tokens: MAX_TOKENS,
        }
    }

    async fn send(&self, api_key: &str, request: ChatRequest) -> Result<String> {
        log::info!("🤖 Sending request to OpenRouter with model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("X-Title", "food-lens")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 OpenRouter response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("❌ OpenRouter API error response: {}", error_text);
            return Err(AnalysisError::Gateway(format!(
                "OpenRouter API error ({}): {}",
                status, error_text
            )));
        }

        let response_text = response.text().await?;
        log::debug!("📄 Raw OpenRouter response size: {} bytes", response_text.len());

        extract_content(&response_text)
    }
}

fn extract_content(body: &str) -> Result<String> {
    let chat_response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::Gateway(format!("unreadable OpenRouter response: {}", e)))?;

    let content = chat_response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(AnalysisError::Gateway("OpenRouter returned no content".to_string()));
    }
    Ok(content)
}

#[async_trait::async_trait]
impl ModelGateway for OpenRouterGateway {
    fn ensure_configured(&self) -> Result<()> {
        require_api_key(self.api_key.as_deref(), "OpenRouter").map(|_| ())
    }

    async fn generate(
        &self,
        prompt: &str,
        image: &EncodedImage,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let api_key = require_api_key(self.api_key.as_deref(), "OpenRouter")?;
        let request = self.build_request(prompt, image);
        cancellable(cancel, self.send(api_key, request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;

    fn gateway() -> OpenRouterGateway {
        let config = GatewayConfig::new(Provider::OpenRouter, Some("test_key".to_string()));
        OpenRouterGateway::new(&config).unwrap()
    }

    #[test]
    fn test_request_carries_data_url() {
        let image = EncodedImage {
            data: "iVBORw==".to_string(),
            mime_type: "image/png".to_string(),
        };
        let request = gateway().build_request("what is this?", &image);

        let json = serde_json::to_value(&request).unwrap();
        let content = &json["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "what is this?");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,iVBORw==");
        assert_eq!(json["model"], "google/gemini-2.0-flash-exp:free");
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"isFood\": false}"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "{\"isFood\": false}");
    }

    #[test]
    fn test_extract_content_empty_choices() {
        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(AnalysisError::Gateway(_))
        ));
        assert!(matches!(
            extract_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(AnalysisError::Gateway(_))
        ));
    }

    #[test]
    fn test_unconfigured() {
        let config = GatewayConfig::new(Provider::OpenRouter, None);
        let gateway = OpenRouterGateway::new(&config).unwrap();
        assert!(matches!(gateway.ensure_configured(), Err(AnalysisError::Configuration(_))));
    }

    #[test]
    fn test_request_with_multibyte_mime_type() {
        // Debug arguments are only evaluated when the level is enabled
        log::set_max_level(log::LevelFilter::Debug);

        // 'é' is two bytes, so byte 100 of the data URL falls inside a character
        let image = EncodedImage {
            data: "iVBORw==".to_string(),
            mime_type: format!("image/{}", "é".repeat(60)),
        };
        let request = gateway().build_request("what is this?", &image);

        let json = serde_json::to_value(&request).unwrap();
        let url = json["messages"][0]["content"][1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/é"));
        assert!(url.ends_with(";base64,iVBORw=="));
    }
}
