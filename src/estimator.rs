//! Cost estimation for video and image generation

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::client::ImageRouter;
use crate::error::{ImageRouterError, Result};
use crate::models::{ModelInfo, ModelRegistry};
use crate::types::OutputKind;

/// Projected cost of a generation request, in USD
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    /// Model id the estimate was computed for
    pub model: String,
    /// Kind of generation
    #[serde(rename = "type")]
    pub generation_type: OutputKind,
    /// Video duration (video estimates only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// Number of outputs
    pub count: u32,
    /// Average price of a single output
    pub price_per_unit: f64,
    pub total_min: f64,
    pub total_max: f64,
    pub total_average: f64,
    /// Always `USD`
    pub currency: &'static str,
}

impl CostEstimate {
    /// Estimate a video generation against an already resolved model.
    ///
    /// An explicit duration is used as given; otherwise the model's first
    /// supported duration is taken. When the model lists durations, the
    /// resolved one must be among them.
    pub fn for_video(model: &ModelInfo, seconds: Option<u32>, count: u32) -> Result<Self> {
        check_count(count)?;
        check_capability(model, OutputKind::Video)?;

        let duration = match seconds.or_else(|| model.default_duration()) {
            Some(duration) => duration,
            None => {
                return Err(ImageRouterError::validation(format!(
                    "Model '{}' requires explicit duration (seconds parameter)",
                    model.id
                )))
            }
        };

        if !model.supported_durations.is_empty() && !model.supported_durations.contains(&duration) {
            return Err(ImageRouterError::validation(format!(
                "Duration {}s not supported. Valid options: {:?}",
                duration, model.supported_durations
            )));
        }

        Ok(Self::scaled(model, OutputKind::Video, Some(duration), count))
    }

    /// Estimate an image generation against an already resolved model.
    pub fn for_image(model: &ModelInfo, count: u32) -> Result<Self> {
        check_count(count)?;
        check_capability(model, OutputKind::Image)?;

        Ok(Self::scaled(model, OutputKind::Image, None, count))
    }

    fn scaled(model: &ModelInfo, kind: OutputKind, duration: Option<u32>, count: u32) -> Self {
        let (min, average, max) = model.pricing.estimate();
        let factor = f64::from(count);

        Self {
            model: model.id.clone(),
            generation_type: kind,
            duration_seconds: duration,
            count,
            price_per_unit: average,
            total_min: min * factor,
            total_max: max * factor,
            total_average: average * factor,
            currency: "USD",
        }
    }
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: {}", self.model)?;
        writeln!(f, "Type: {}", self.generation_type)?;
        if let Some(duration) = self.duration_seconds {
            writeln!(f, "Duration: {}s", duration)?;
        }
        writeln!(f, "Count: {}", self.count)?;
        writeln!(f, "Price per unit: ${:.4}", self.price_per_unit)?;
        writeln!(f)?;
        writeln!(f, "Estimated total cost:")?;
        writeln!(f, "  Minimum: ${:.4}", self.total_min)?;
        writeln!(f, "  Average: ${:.4}", self.total_average)?;
        write!(f, "  Maximum: ${:.4}", self.total_max)
    }
}

fn check_count(count: u32) -> Result<()> {
    if count < 1 {
        return Err(ImageRouterError::validation("Count must be at least 1"));
    }
    Ok(())
}

fn check_capability(model: &ModelInfo, kind: OutputKind) -> Result<()> {
    if !model.supports(kind) {
        return Err(ImageRouterError::validation(format!(
            "Model '{}' does not support {} generation",
            model.id, kind
        )));
    }
    Ok(())
}

/// Estimate generation costs before spending anything.
///
/// Only the model catalog is fetched; estimates are computed locally from
/// the cached pricing.
///
/// # Example
///
/// ```no_run
/// use imagerouter::{CostEstimator, ImageRouter};
///
/// # async fn example() -> imagerouter::Result<()> {
/// let mut estimator = CostEstimator::new(ImageRouter::new("ir_xxx")?);
///
/// let estimate = estimator.estimate_video("google/veo-3.1-fast", Some(4), 1).await?;
/// println!("Expected cost: ${:.2}", estimate.total_average);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CostEstimator {
    registry: ModelRegistry,
}

impl CostEstimator {
    pub fn new(client: ImageRouter) -> Self {
        Self::with_registry(ModelRegistry::new(client))
    }

    /// Reuse an existing registry and its cache
    pub fn with_registry(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }

    /// Estimate the cost of `count` videos of `seconds` length
    ///
    /// # Errors
    ///
    /// - `Validation` for a zero count, a non-video model or an unsupported duration
    /// - `ModelNotFound` if the model is not in the catalog
    pub async fn estimate_video(
        &mut self,
        model: &str,
        seconds: Option<u32>,
        count: u32,
    ) -> Result<CostEstimate> {
        check_count(count)?;
        let model = self.registry.get_model(model).await?;
        CostEstimate::for_video(model, seconds, count)
    }

    /// Estimate the cost of `count` images
    ///
    /// `quality` and `size` are accepted for parity with generation requests;
    /// catalog pricing does not vary with them.
    pub async fn estimate_image(
        &mut self,
        model: &str,
        quality: &str,
        size: &str,
        count: u32,
    ) -> Result<CostEstimate> {
        check_count(count)?;
        debug!(model, quality, size, count, "estimating image cost");
        let model = self.registry.get_model(model).await?;
        CostEstimate::for_image(model, count)
    }

    /// Refetch the model catalog
    pub async fn refresh_models(&mut self) -> Result<()> {
        self.registry.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn veo() -> ModelInfo {
        ModelInfo::from_api_data(json!({
            "id": "google/veo-3.1-fast",
            "output": ["video"],
            "pricing": {"type": "calculated", "range": {"min": 0.60, "max": 1.20, "average": 0.90}},
            "seconds": [4, 6, 8]
        }))
    }

    fn gpt_image() -> ModelInfo {
        ModelInfo::from_api_data(json!({
            "id": "openai/gpt-image-1",
            "output": ["image"],
            "pricing": {"type": "calculated", "range": {"min": 0.01, "average": 0.15, "max": 0.30}}
        }))
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_video_totals_scale_with_count() {
        let estimate = CostEstimate::for_video(&veo(), Some(4), 2).unwrap();

        assert_eq!(estimate.duration_seconds, Some(4));
        assert_eq!(estimate.count, 2);
        assert_close(estimate.price_per_unit, 0.90);
        assert_close(estimate.total_min, 1.20);
        assert_close(estimate.total_average, 1.80);
        assert_close(estimate.total_max, 2.40);
        assert_eq!(estimate.currency, "USD");
    }

    #[test]
    fn test_video_duration_resolution() {
        let model = veo();

        let default = CostEstimate::for_video(&model, None, 1).unwrap();
        assert_eq!(default.duration_seconds, Some(4));

        let explicit = CostEstimate::for_video(&model, Some(6), 1).unwrap();
        assert_eq!(explicit.duration_seconds, Some(6));

        let err = CostEstimate::for_video(&model, Some(99), 1).unwrap_err();
        assert!(matches!(err, ImageRouterError::Validation { .. }));
        assert!(err.message().contains("[4, 6, 8]"));
    }

    #[test]
    fn test_video_without_durations_needs_explicit_seconds() {
        let model = ModelInfo::from_api_data(json!({
            "id": "acme/free-length",
            "output": ["video"],
            "pricing": {"type": "fixed", "value": 0.5}
        }));

        let err = CostEstimate::for_video(&model, None, 1).unwrap_err();
        assert!(err.message().contains("requires explicit duration"));

        let estimate = CostEstimate::for_video(&model, Some(37), 3).unwrap();
        assert_eq!(estimate.duration_seconds, Some(37));
        assert_close(estimate.total_min, 1.5);
        assert_close(estimate.total_max, 1.5);
    }

    #[test]
    fn test_zero_count_rejected() {
        assert!(matches!(
            CostEstimate::for_video(&veo(), Some(4), 0),
            Err(ImageRouterError::Validation { .. })
        ));
        let err = CostEstimate::for_image(&gpt_image(), 0).unwrap_err();
        assert!(err.message().contains("at least 1"));
    }

    #[test]
    fn test_capability_mismatch() {
        let err = CostEstimate::for_video(&gpt_image(), Some(4), 1).unwrap_err();
        assert!(matches!(err, ImageRouterError::Validation { .. }));
        assert!(err.message().contains("video"));

        let err = CostEstimate::for_image(&veo(), 1).unwrap_err();
        assert!(err.message().contains("image"));
    }

    #[test]
    fn test_image_estimate() {
        let estimate = CostEstimate::for_image(&gpt_image(), 5).unwrap();

        assert_eq!(estimate.generation_type, OutputKind::Image);
        assert_eq!(estimate.duration_seconds, None);
        assert_close(estimate.total_min, 0.05);
        assert_close(estimate.total_average, 0.75);
        assert_close(estimate.total_max, 1.50);
    }

    #[test]
    fn test_serialized_shape() {
        let video = CostEstimate::for_video(&veo(), Some(8), 1).unwrap();
        let video = serde_json::to_value(video).unwrap();
        assert_eq!(video["type"], "video");
        assert_eq!(video["duration_seconds"], 8);
        assert_eq!(video["currency"], "USD");

        let image = CostEstimate::for_image(&gpt_image(), 1).unwrap();
        let image = serde_json::to_value(image).unwrap();
        assert!(image.get("duration_seconds").is_none());
    }

    #[test]
    fn test_summary_format() {
        let summary = CostEstimate::for_video(&veo(), Some(6), 1).unwrap().to_string();

        assert!(summary.starts_with("Model: google/veo-3.1-fast\nType: video\nDuration: 6s\n"));
        assert!(summary.contains("Price per unit: $0.9000"));
        assert!(summary.ends_with("  Maximum: $1.2000"));
    }
}
