use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{AnalysisError, Result};
use crate::models::{ClassificationVerdict, EncodedImage};
use crate::services::{extract_json, ModelGateway};

const CLASSIFICATION_PROMPT: &str = "\
この画像に食べ物（料理、食材、飲み物など）が写っているかどうかを判定してください。

次のJSON形式だけで回答してください：
{
  \"isFood\": true または false,
  \"confidence\": 0から100の整数
}

食べ物と判定するもの：
- 料理、食材、飲み物、お菓子、果物、野菜など口にできるもの
- レストランのメニュー、弁当、おつまみ

食べ物と判定しないもの：
- 人物、動物、風景、建物、日用品など食べられないもの
- 食器だけが写っていて食べ物がない場合";

/// Ask the model whether the image shows food.
pub async fn classify(
    gateway: &dyn ModelGateway,
    image: &EncodedImage,
    cancel: &CancellationToken,
) -> Result<ClassificationVerdict> {
    let text = gateway.generate(CLASSIFICATION_PROMPT, image, cancel).await?;
    log::debug!("💬 Classification response: {}", text);

    let verdict = parse_verdict(&text)?;
    log::info!(
        "🔎 Classified image: is_food={}, confidence={}",
        verdict.is_food,
        verdict.confidence
    );
    Ok(verdict)
}

fn parse_verdict(text: &str) -> Result<ClassificationVerdict> {
    let object = extract_json(text)?;

    let is_food = match object.get("isFood") {
        Some(Value::Bool(b)) => *b,
        other => {
            return Err(AnalysisError::Classification(format!(
                "isFood must be a boolean, got {}",
                describe(other)
            )))
        }
    };

    let confidence = match object.get("confidence").and_then(Value::as_f64) {
        Some(c) if !(0.0..=100.0).contains(&c) => {
            return Err(AnalysisError::Classification(format!(
                "confidence {} is outside 0-100",
                c
            )))
        }
        // Rounding would move values across the routing threshold
        Some(c) if c.fract() != 0.0 => {
            return Err(AnalysisError::Classification(format!(
                "confidence {} is not a whole number",
                c
            )))
        }
        Some(c) => c as u8,
        None => {
            return Err(AnalysisError::Classification(format!(
                "confidence must be a number, got {}",
                describe(object.get("confidence"))
            )))
        }
    };

    Ok(ClassificationVerdict { is_food, confidence })
}

fn describe(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "nothing".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateway::testing::ScriptedGateway;

    #[test]
    fn test_parse_verdict() {
        let verdict =
            parse_verdict("```json\n{\"isFood\": true, \"confidence\": 85}\n```").unwrap();
        assert_eq!(
            verdict,
            ClassificationVerdict {
                is_food: true,
                confidence: 85
            }
        );
    }

    #[test]
    fn test_fractional_confidence_is_rejected() {
        for text in [
            r#"{"isFood": true, "confidence": 60.4}"#,
            r#"{"isFood": false, "confidence": 59.6}"#,
        ] {
            assert!(matches!(parse_verdict(text), Err(AnalysisError::Classification(_))));
        }

        let verdict = parse_verdict(r#"{"isFood": true, "confidence": 61.0}"#).unwrap();
        assert_eq!(verdict.confidence, 61);
    }

    #[test]
    fn test_confidence_bounds() {
        assert_eq!(parse_verdict(r#"{"isFood": true, "confidence": 0}"#).unwrap().confidence, 0);
        assert_eq!(
            parse_verdict(r#"{"isFood": true, "confidence": 100}"#).unwrap().confidence,
            100
        );

        for text in [
            r#"{"isFood": true, "confidence": 101}"#,
            r#"{"isFood": true, "confidence": -1}"#,
        ] {
            assert!(matches!(parse_verdict(text), Err(AnalysisError::Classification(_))));
        }
    }

    #[test]
    fn test_non_numeric_confidence() {
        for text in [
            r#"{"isFood": true, "confidence": "85"}"#,
            r#"{"isFood": true, "confidence": null}"#,
            r#"{"isFood": true}"#,
        ] {
            assert!(matches!(parse_verdict(text), Err(AnalysisError::Classification(_))));
        }
    }

    #[test]
    fn test_non_boolean_is_food() {
        for text in [
            r#"{"isFood": "true", "confidence": 90}"#,
            r#"{"isFood": 1, "confidence": 90}"#,
            r#"{"confidence": 90}"#,
        ] {
            assert!(matches!(parse_verdict(text), Err(AnalysisError::Classification(_))));
        }
    }

    #[test]
    fn test_unparseable_response() {
        assert!(matches!(
            parse_verdict("This looks like a cat."),
            Err(AnalysisError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_calls_gateway_once() {
        let gateway = ScriptedGateway::replying(&[r#"{"isFood": false, "confidence": 5}"#]);
        let image = EncodedImage {
            data: "AAAA".to_string(),
            mime_type: "image/jpeg".to_string(),
        };

        let verdict = classify(&gateway, &image, &CancellationToken::new()).await.unwrap();

        assert!(!verdict.is_food);
        assert_eq!(gateway.calls(), 1);
        assert!(gateway.prompts()[0].contains("isFood"));
    }
}
