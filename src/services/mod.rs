pub mod encoder;
pub mod gateway;
pub mod gemini; // Google Gemini generateContent
pub mod openrouter; // OpenRouter chat completions
pub mod response_parser;

use std::sync::Arc;

pub use encoder::encode;
pub use gateway::ModelGateway;
pub use gemini::GeminiGateway;
pub use openrouter::OpenRouterGateway;
pub use response_parser::extract_json;

use crate::config::{GatewayConfig, Provider};
use crate::error::Result;

/// Build the gateway for the configured provider.
pub fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn ModelGateway>> {
    let gateway: Arc<dyn ModelGateway> = match config.provider {
        Provider::Gemini => Arc::new(GeminiGateway::new(config)?),
        Provider::OpenRouter => Arc::new(OpenRouterGateway::new(config)?),
    };
    Ok(gateway)
}
