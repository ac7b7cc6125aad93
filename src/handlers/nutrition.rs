use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{AnalysisError, Result};
use crate::models::{EncodedImage, NutritionResult};
use crate::services::response_parser::RawObject;
use crate::services::{extract_json, ModelGateway};

const NUTRITION_PROMPT: &str = "\
この料理の画像を分析し、次の情報をJSONで返してください：

1. 料理名（日本語）
2. 100gあたりの推定栄養価：
   - カロリー (kcal)
   - タンパク質 (g)
   - 炭水化物 (g)
   - 脂質 (g)
   - 食物繊維 (g)
   - 糖質 (g)
   - ナトリウム (mg)
3. 健康的な食生活のためのアドバイス（日本語で200文字程度）

JSONの形式（フィールド名はこの通りにしてください）：
{
  \"foodName\": \"料理名\",
  \"calories\": 数値,
  \"protein\": 数値,
  \"carbs\": 数値,
  \"fat\": 数値,
  \"fiber\": 数値,
  \"sugar\": 数値,
  \"sodium\": 数値,
  \"advice\": \"アドバイス\"
}

複数の料理が写っている場合は、メインの料理だけを分析してください。";

/// Estimate the nutrition of the main dish in the image.
pub async fn analyze_nutrition(
    gateway: &dyn ModelGateway,
    image: &EncodedImage,
    cancel: &CancellationToken,
) -> Result<NutritionResult> {
    let text = gateway.generate(NUTRITION_PROMPT, image, cancel).await?;
    log::debug!("💬 Nutrition response: {}", text);

    let result = parse_nutrition(&text)?;
    log::info!("🍱 Nutrition estimate for '{}': {} kcal", result.food_name, result.calories);
    Ok(result)
}

fn parse_nutrition(text: &str) -> Result<NutritionResult> {
    let object = extract_json(text)?;

    let food_name = match object.get("foodName") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        _ => {
            return Err(AnalysisError::Validation(
                "foodName must be a non-empty string".to_string(),
            ))
        }
    };

    let calories = object
        .get("calories")
        .and_then(Value::as_f64)
        .ok_or_else(|| AnalysisError::Validation("calories must be a number".to_string()))?;

    let advice = match object.get("advice") {
        Some(Value::String(advice)) => advice.clone(),
        _ => {
            log::warn!("⚠️ No advice in nutrition response for '{}'", food_name);
            String::new()
        }
    };

    Ok(NutritionResult {
        protein: nutrient(&object, "protein")?,
        carbs: nutrient(&object, "carbs")?,
        fat: nutrient(&object, "fat")?,
        fiber: nutrient(&object, "fiber")?,
        sugar: nutrient(&object, "sugar")?,
        sodium: nutrient(&object, "sodium")?,
        food_name,
        calories,
        advice,
    })
}

/// Secondary nutrient: a number, or a string like "12.5g". Missing means 0.
fn nutrient(object: &RawObject, field: &str) -> Result<f64> {
    let value = match object.get(field) {
        None | Some(Value::Null) => {
            log::warn!("⚠️ Nutrition response has no '{}', using 0", field);
            return Ok(0.0);
        }
        Some(value) => value,
    };

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    };

    parsed.ok_or_else(|| {
        AnalysisError::Validation(format!("{} must be numeric, got {}", field, value))
    })
}

fn parse_amount(s: &str) -> Option<f64> {
    let s = s.trim();
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(end);

    // Only a unit may follow the number (no "2-3g", "10〜15g" or "12g/100g")
    let ambiguous = unit
        .chars()
        .any(|c| c.is_numeric() || matches!(c, '-' | '~' | '〜' | '～' | '/' | '+' | '.' | ','));
    if number.is_empty() || ambiguous {
        return None;
    }

    let normalized = if number.contains('.') {
        number.replace(',', "")
    } else if number.matches(',').count() == 1 && number.split(',').nth(1)?.len() != 3 {
        // Decimal comma ("4,5 g")
        number.replace(',', ".")
    } else {
        number.replace(',', "")
    };

    normalized.parse::<f64>().ok()
}
