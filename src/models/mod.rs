use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw image as handed over by the caller.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Base64 form of an [`ImagePayload`], shared by every model call in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationVerdict {
    pub is_food: bool,
    pub confidence: u8, // 0-100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionResult {
    pub food_name: String,
    pub calories: f64, // kcal per 100 g
    pub protein: f64,  // g
    pub carbs: f64,    // g
    pub fat: f64,      // g
    pub fiber: f64,    // g
    pub sugar: f64,    // g
    pub sodium: f64,   // mg
    pub advice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HaikuResult {
    /// Upper, middle and lower verse (5-7-5 morae).
    pub haiku: [String; 3],
    pub description: String,
    #[serde(default)]
    pub is_food: NotFood,
}

/// The literal `false` carried by haiku results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotFood;

impl Serialize for NotFood {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(false)
    }
}

impl<'de> Deserialize<'de> for NotFood {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match bool::deserialize(deserializer)? {
            false => Ok(NotFood),
            true => Err(serde::de::Error::custom("haiku results must carry isFood: false")),
        }
    }
}

/// Final outcome of a pipeline run, tagged with an explicit `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnalysisResult {
    Nutrition(NutritionResult),
    Haiku(HaikuResult),
}

impl AnalysisResult {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisResult::Nutrition(_) => "nutrition",
            AnalysisResult::Haiku(_) => "haiku",
        }
    }
}
