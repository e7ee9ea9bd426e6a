//! Model catalog: pricing normalization, model records and the cached registry

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::client::ImageRouter;
use crate::error::{ImageRouterError, Result};
use crate::types::OutputKind;

// ============ Pricing ============

/// Upstream pricing schema variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingKind {
    /// Single flat price
    Fixed,
    /// Price computed from request parameters, reported as a range
    Calculated,
    /// Price settled after generation, reported as a range
    PostGeneration,
    /// Any other declared type, kept verbatim (`"unknown"` when absent)
    Unknown(String),
}

impl PricingKind {
    fn from_declared(declared: &str) -> Self {
        match declared {
            "fixed" => PricingKind::Fixed,
            "calculated" => PricingKind::Calculated,
            "post_generation" => PricingKind::PostGeneration,
            other => PricingKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PricingKind::Fixed => "fixed",
            PricingKind::Calculated => "calculated",
            PricingKind::PostGeneration => "post_generation",
            PricingKind::Unknown(declared) => declared,
        }
    }
}

impl fmt::Display for PricingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PricingKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Canonical pricing for one model, in USD per generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingInfo {
    #[serde(rename = "type")]
    pub kind: PricingKind,
    pub min: f64,
    pub average: f64,
    pub max: f64,
}

impl PricingInfo {
    /// Normalize a raw `pricing` object.
    ///
    /// `fixed` reads `value`; every other type reads `range.{min,average,max}`.
    /// Missing or malformed numbers become 0, so this never fails.
    pub fn from_api_data(data: &Value) -> Self {
        let declared = data.get("type").and_then(Value::as_str).unwrap_or("unknown");
        let kind = PricingKind::from_declared(declared);

        if kind == PricingKind::Fixed {
            let value = number_or_zero(data.get("value"));
            return Self {
                kind,
                min: value,
                average: value,
                max: value,
            };
        }

        let range = data.get("range");
        let field = |name: &str| number_or_zero(range.and_then(|r| r.get(name)));

        Self {
            kind,
            min: field("min"),
            average: field("average"),
            max: field("max"),
        }
    }

    /// Price estimate as `(min, average, max)`
    pub fn estimate(&self) -> (f64, f64, f64) {
        (self.min, self.average, self.max)
    }
}

/// Accepts JSON numbers and numeric strings, anything else is 0
fn number_or_zero(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Whole seconds from an integer, an integral float or a numeric string
fn duration_seconds(value: &Value) -> Option<u32> {
    let seconds = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    if seconds.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&seconds) {
        return None;
    }
    Some(seconds as u32)
}

// ============ Models ============

/// One entry of the model catalog
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Provider-qualified id, e.g. `google/veo-3.1-fast`
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Provider name
    pub provider: String,
    /// Output kinds the model can produce
    pub output_types: Vec<OutputKind>,
    /// Normalized pricing
    pub pricing: PricingInfo,
    /// Supported video durations in seconds; empty means unconstrained
    pub supported_durations: Vec<u32>,
    /// Supported output sizes
    pub supported_sizes: Vec<String>,
    /// Whether the model accepts input images
    pub supports_edit: bool,
    /// Catalog entry as received
    #[serde(skip)]
    pub raw: Value,
}

impl ModelInfo {
    /// Build a record from one catalog entry, defaulting absent fields.
    pub fn from_api_data(data: Value) -> Self {
        let id = data
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let name = data
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());
        let provider = data
            .get("provider")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let mut output_types = Vec::new();
        for kind in string_list(data.get("output")) {
            if let Ok(kind) = kind.parse::<OutputKind>() {
                if !output_types.contains(&kind) {
                    output_types.push(kind);
                }
            }
        }

        let supported_durations = data
            .get("seconds")
            .and_then(Value::as_array)
            .map(|items| {
                items.iter().filter_map(duration_seconds).collect()
            })
            .unwrap_or_default();

        let supports_edit = data
            .get("supported_params")
            .and_then(|p| p.get("edit"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Self {
            pricing: PricingInfo::from_api_data(data.get("pricing").unwrap_or(&Value::Null)),
            supported_sizes: string_list(data.get("sizes")),
            id,
            name,
            provider,
            output_types,
            supported_durations,
            supports_edit,
            raw: data,
        }
    }

    pub fn supports(&self, kind: OutputKind) -> bool {
        self.output_types.contains(&kind)
    }

    pub fn is_video_model(&self) -> bool {
        self.supports(OutputKind::Video)
    }

    pub fn is_image_model(&self) -> bool {
        self.supports(OutputKind::Image)
    }

    /// First supported duration, used when a video request names none
    pub fn default_duration(&self) -> Option<u32> {
        self.supported_durations.first().copied()
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ============ Registry ============

/// Lazily loaded, explicitly refreshed cache of the model catalog.
///
/// The cache is filled on first access and only rebuilt by [`refresh`].
/// Mutating operations take `&mut self`; share it behind your own lock if
/// several tasks need it.
///
/// [`refresh`]: ModelRegistry::refresh
///
/// # Example
///
/// ```no_run
/// use imagerouter::{ImageRouter, ModelRegistry};
///
/// # async fn example() -> imagerouter::Result<()> {
/// let mut registry = ModelRegistry::new(ImageRouter::new("ir_xxx")?);
///
/// let model = registry.get_model("google/veo-3.1-fast").await?;
/// println!("{} from {}", model.name, model.provider);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    client: ImageRouter,
    models: Option<HashMap<String, ModelInfo>>,
}

impl ModelRegistry {
    pub fn new(client: ImageRouter) -> Self {
        Self {
            client,
            models: None,
        }
    }

    /// Whether the catalog has been fetched at least once
    pub fn is_loaded(&self) -> bool {
        self.models.is_some()
    }

    /// Refetch the whole catalog and replace the cache.
    ///
    /// On failure the previous cache is left untouched.
    pub async fn refresh(&mut self) -> Result<()> {
        debug!("refreshing model catalog");
        let raw_models = self.client.list_models(None).await?;

        let models: HashMap<String, ModelInfo> = raw_models
            .into_iter()
            .map(|(id, data)| (id, ModelInfo::from_api_data(data)))
            .collect();

        info!(count = models.len(), "model catalog loaded");
        self.models = Some(models);
        Ok(())
    }

    async fn ensure_loaded(&mut self) -> Result<&HashMap<String, ModelInfo>> {
        if self.models.is_none() {
            self.refresh().await?;
        }
        Ok(&*self.models.get_or_insert_with(HashMap::new))
    }

    /// Look up a model by id
    ///
    /// # Errors
    ///
    /// Returns `ImageRouterError::ModelNotFound` if the id is not in the catalog.
    pub async fn get_model(&mut self, model_id: &str) -> Result<&ModelInfo> {
        let models = self.ensure_loaded().await?;
        models
            .get(model_id)
            .ok_or_else(|| {
                ImageRouterError::model_not_found(format!("Model '{}' not found", model_id))
            })
    }

    /// Copy of the whole catalog
    pub async fn get_all_models(&mut self) -> Result<HashMap<String, ModelInfo>> {
        Ok(self.ensure_loaded().await?.clone())
    }

    /// Models that can produce `kind`
    pub async fn get_models_of_kind(
        &mut self,
        kind: OutputKind,
    ) -> Result<HashMap<String, ModelInfo>> {
        let models = self.ensure_loaded().await?;
        Ok(models
            .iter()
            .filter(|(_, model)| model.supports(kind))
            .map(|(id, model)| (id.clone(), model.clone()))
            .collect())
    }

    pub async fn get_video_models(&mut self) -> Result<HashMap<String, ModelInfo>> {
        self.get_models_of_kind(OutputKind::Video).await
    }

    pub async fn get_image_models(&mut self) -> Result<HashMap<String, ModelInfo>> {
        self.get_models_of_kind(OutputKind::Image).await
    }

    /// Filter by an output type name; anything other than `image` or `video`
    /// returns the full catalog.
    pub async fn get_models_by_type(
        &mut self,
        output_type: &str,
    ) -> Result<HashMap<String, ModelInfo>> {
        match output_type.parse::<OutputKind>() {
            Ok(kind) => self.get_models_of_kind(kind).await,
            Err(_) => self.get_all_models().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixed_pricing_collapses_to_value() {
        let pricing = PricingInfo::from_api_data(&json!({"type": "fixed", "value": 0.04}));

        assert_eq!(pricing.kind, PricingKind::Fixed);
        assert_eq!(pricing.estimate(), (0.04, 0.04, 0.04));
    }

    #[test]
    fn test_range_pricing() {
        let pricing = PricingInfo::from_api_data(&json!({
            "type": "post_generation",
            "range": {"min": 0.18, "average": 0.27, "max": 0.37}
        }));

        assert_eq!(pricing.kind, PricingKind::PostGeneration);
        assert_eq!(pricing.estimate(), (0.18, 0.27, 0.37));
    }

    #[test]
    fn test_missing_range_fields_default_to_zero() {
        let pricing = PricingInfo::from_api_data(&json!({
            "type": "calculated",
            "range": {"max": 1.5}
        }));

        assert_eq!(pricing.estimate(), (0.0, 0.0, 1.5));
    }

    #[test]
    fn test_unknown_type_kept_and_read_as_range() {
        let pricing = PricingInfo::from_api_data(&json!({
            "type": "per_second",
            "range": {"min": 0.1, "average": 0.2, "max": 0.3}
        }));

        assert_eq!(pricing.kind, PricingKind::Unknown("per_second".to_string()));
        assert_eq!(pricing.kind.as_str(), "per_second");
        assert_eq!(pricing.estimate(), (0.1, 0.2, 0.3));
    }

    #[test]
    fn test_malformed_pricing_never_fails() {
        let absent = PricingInfo::from_api_data(&Value::Null);
        assert_eq!(absent.kind.as_str(), "unknown");
        assert_eq!(absent.estimate(), (0.0, 0.0, 0.0));

        let garbage = PricingInfo::from_api_data(&json!({"type": "fixed", "value": "n/a"}));
        assert_eq!(garbage.estimate(), (0.0, 0.0, 0.0));

        let numeric_string = PricingInfo::from_api_data(&json!({"type": "fixed", "value": "0.5"}));
        assert_eq!(numeric_string.estimate(), (0.5, 0.5, 0.5));
    }

    #[test]
    fn test_model_from_full_entry() {
        let model = ModelInfo::from_api_data(json!({
            "id": "google/veo-3.1-fast",
            "name": "Veo 3.1 Fast",
            "provider": "Gemini",
            "output": ["video"],
            "pricing": {"type": "calculated", "range": {"min": 0.60, "average": 0.90, "max": 1.20}},
            "seconds": [4, 6, 8],
            "sizes": ["1280x720", "1920x1080"],
            "supported_params": {"edit": false}
        }));

        assert_eq!(model.id, "google/veo-3.1-fast");
        assert_eq!(model.name, "Veo 3.1 Fast");
        assert!(model.is_video_model());
        assert!(!model.is_image_model());
        assert_eq!(model.supported_durations, vec![4, 6, 8]);
        assert_eq!(model.default_duration(), Some(4));
        assert_eq!(model.supported_sizes.len(), 2);
        assert!(!model.supports_edit);
        assert_eq!(model.raw["provider"], "Gemini");
    }

    #[test]
    fn test_model_defaults() {
        let model = ModelInfo::from_api_data(json!({
            "id": "acme/both",
            "output": ["image", "video", "audio"]
        }));

        assert_eq!(model.name, "acme/both");
        assert_eq!(model.provider, "unknown");
        assert_eq!(model.output_types, vec![OutputKind::Image, OutputKind::Video]);
        assert!(model.supported_durations.is_empty());
        assert_eq!(model.default_duration(), None);
        assert!(!model.supports_edit);
    }

    #[test]
    fn test_durations_accept_integral_floats_and_strings() {
        let model = ModelInfo::from_api_data(json!({
            "id": "acme/clip",
            "output": ["video"],
            "seconds": [5.0, "10", 7.5, -2, "long", null]
        }));

        assert_eq!(model.supported_durations, vec![5, 10]);
        assert_eq!(model.default_duration(), Some(5));
    }

    #[test]
    fn test_model_serialization_omits_raw() {
        let model = ModelInfo::from_api_data(json!({
            "id": "openai/gpt-image-1",
            "output": ["image"],
            "pricing": {"type": "fixed", "value": 0.02}
        }));

        let value = serde_json::to_value(&model).unwrap();
        assert!(value.get("raw").is_none());
        assert_eq!(value["pricing"]["type"], "fixed");
        assert_eq!(value["output_types"], json!(["image"]));
    }
}
