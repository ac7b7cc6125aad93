use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{AnalysisError, Result};
use crate::models::{EncodedImage, HaikuResult, NotFood};
use crate::services::{extract_json, ModelGateway};

const HAIKU_PROMPT: &str = "\
この画像を見て、その内容にちなんだ俳句を詠んでください。

次のJSON形式で回答してください：
{
  \"haiku\": [\"上の句（5音）\", \"中の句（7音）\", \"下の句（5音）\"],
  \"description\": \"画像の簡潔な説明（50文字程度）\",
  \"isFood\": false
}

俳句の条件：
- 伝統的な5・7・5の音律を守る
- 画像の内容や雰囲気を表現する
- 自然に入れられるなら季語を使う
- 美しい日本語で詩的に表現する

例（猫が写っている場合）：
{
  \"haiku\": [\"ひなたぼこ\", \"猫のまどろみ\", \"春近し\"],
  \"description\": \"陽だまりで眠る猫の穏やかな表情\",
  \"isFood\": false
}";

/// Compose a 5-7-5 haiku about the image.
pub async fn generate_haiku(
    gateway: &dyn ModelGateway,
    image: &EncodedImage,
    cancel: &CancellationToken,
) -> Result<HaikuResult> {
    let text = gateway.generate(HAIKU_PROMPT, image, cancel).await?;
    log::debug!("💬 Haiku response: {}", text);

    let result = parse_haiku(&text)?;
    log::info!("🌸 Haiku composed: {}", result.haiku.join(" / "));
    Ok(result)
}

fn parse_haiku(text: &str) -> Result<HaikuResult> {
    let object = extract_json(text)?;

    let verses = match object.get("haiku") {
        Some(Value::Array(verses)) => verses,
        _ => {
            return Err(AnalysisError::Validation(
                "haiku must be an array of three lines".to_string(),
            ))
        }
    };

    let lines: Vec<String> = verses
        .iter()
        .map(|v| v.as_str().map(|s| s.trim().to_string()))
        .collect::<Option<_>>()
        .ok_or_else(|| AnalysisError::Validation("haiku lines must be strings".to_string()))?;

    let haiku: [String; 3] = lines.try_into().map_err(|lines: Vec<String>| {
        AnalysisError::Validation(format!("haiku must have exactly 3 lines, got {}", lines.len()))
    })?;

    let description = object
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(HaikuResult {
        haiku,
        description,
        is_food: NotFood,
    })
}
