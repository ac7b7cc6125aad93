use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::classifier::classify;
use super::haiku::generate_haiku;
use super::nutrition::analyze_nutrition;
use crate::error::Result;
use crate::models::{AnalysisResult, ClassificationVerdict, ImagePayload};
use crate::services::{encode, ModelGateway};

/// Confidence must be strictly above this for an image to count as food.
pub const FOOD_CONFIDENCE_THRESHOLD: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Nutrition,
    Haiku,
}

/// Branch decision taken once the image has been classified.
pub fn route(verdict: ClassificationVerdict) -> Route {
    if verdict.is_food && verdict.confidence > FOOD_CONFIDENCE_THRESHOLD {
        Route::Nutrition
    } else {
        Route::Haiku
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Start,
    Encoded,
    Classified,
    NutritionDone,
    HaikuDone,
    Complete,
    Failed,
}

/// Classify-then-generate pipeline. One instance serves every request.
pub struct AnalysisPipeline {
    gateway: Arc<dyn ModelGateway>,
}

impl AnalysisPipeline {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Analyze raw image bytes from an in-process caller.
    pub async fn submit(&self, bytes: Vec<u8>, mime_type: &str) -> Result<AnalysisResult> {
        self.run(ImagePayload::new(bytes, mime_type), &CancellationToken::new())
            .await
    }

    pub async fn run(
        &self,
        payload: ImagePayload,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        let mut state = PipelineState::Start;

        let result = self.advance(&mut state, &payload, cancel).await;
        match &result {
            Ok(_) => log::info!("✅ Analysis complete"),
            Err(e) => {
                log::error!(
                    "❌ Analysis failed after state {:?} ({}): {}",
                    state,
                    e.kind(),
                    e
                );
                transition(&mut state, PipelineState::Failed);
            }
        }
        result
    }

    async fn advance(
        &self,
        state: &mut PipelineState,
        payload: &ImagePayload,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        // Checked once per run so a missing key never reaches a stage.
        self.gateway.ensure_configured()?;

        let image = encode(payload)?;
        transition(state, PipelineState::Encoded);

        let verdict = classify(self.gateway.as_ref(), &image, cancel).await?;
        transition(state, PipelineState::Classified);

        let result = match route(verdict) {
            Route::Nutrition => {
                let nutrition = analyze_nutrition(self.gateway.as_ref(), &image, cancel).await?;
                transition(state, PipelineState::NutritionDone);
                AnalysisResult::Nutrition(nutrition)
            }
            Route::Haiku => {
                let haiku = generate_haiku(self.gateway.as_ref(), &image, cancel).await?;
                transition(state, PipelineState::HaikuDone);
                AnalysisResult::Haiku(haiku)
            }
        };

        transition(state, PipelineState::Complete);
        Ok(result)
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    log::debug!("🔀 Pipeline {:?} -> {:?}", state, next);
    *state = next;
}
