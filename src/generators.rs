//! Image and video generation requests

use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::client::ImageRouter;
use crate::error::{ImageRouterError, Result};
use crate::types::{FilePart, GenerationResponse, ResponseFormat};
use crate::utils::{
    download_file, prepare_images, save_base64_content, validate_prompt, MAX_PROMPT_LENGTH,
};

const IMAGE_GENERATION_ENDPOINT: &str = "/v1/openai/images/generations";
const IMAGE_EDIT_ENDPOINT: &str = "/v1/openai/images/edits";
const VIDEO_GENERATION_ENDPOINT: &str = "/v1/openai/videos/generations";

/// Generation result plus where it was saved, if an output path was set
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub response: GenerationResponse,
    pub saved_to: Option<PathBuf>,
}

// ============ Requests ============

/// Parameters for image generation and editing
///
/// `quality` and `size` left unset mean "auto" and are not sent.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: String,
    pub quality: Option<String>,
    pub size: Option<String>,
    pub output_format: Option<String>,
    pub response_format: ResponseFormat,
    /// Source images for image-to-image (up to 16)
    pub images: Vec<PathBuf>,
    /// Masks for targeted edits
    pub masks: Vec<PathBuf>,
    pub output_path: Option<PathBuf>,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            quality: None,
            size: None,
            output_format: None,
            response_format: ResponseFormat::default(),
            images: Vec::new(),
            masks: Vec::new(),
            output_path: None,
        }
    }

    /// Quality level (`low`, `medium`, `high`); `auto` clears it
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = non_auto(quality.into());
        self
    }

    /// Output resolution; `auto` clears it
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = non_auto(size.into());
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }

    pub fn with_mask(mut self, path: impl Into<PathBuf>) -> Self {
        self.masks.push(path.into());
        self
    }

    /// Save the first output to this path
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

/// Parameters for video generation
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub prompt: String,
    pub model: String,
    /// Duration in seconds; unset lets the model pick its default
    pub seconds: Option<u32>,
    pub size: Option<String>,
    pub response_format: ResponseFormat,
    /// Source images for image-to-video
    pub images: Vec<PathBuf>,
    pub output_path: Option<PathBuf>,
}

impl VideoRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            seconds: None,
            size: None,
            response_format: ResponseFormat::default(),
            images: Vec::new(),
            output_path: None,
        }
    }

    pub fn with_seconds(mut self, seconds: u32) -> Self {
        self.seconds = Some(seconds);
        self
    }

    /// Output resolution; `auto` clears it
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = non_auto(size.into());
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }

    /// Save the first output to this path
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

fn non_auto(value: String) -> Option<String> {
    if value == "auto" {
        None
    } else {
        Some(value)
    }
}

// ============ Generators ============

/// Text-to-image and image-to-image generation
///
/// # Example
///
/// ```no_run
/// use imagerouter::{ImageGenerator, ImageRequest, ImageRouter};
///
/// # async fn example() -> imagerouter::Result<()> {
/// let client = ImageRouter::new("ir_xxx")?;
/// let generator = ImageGenerator::new(&client);
///
/// let outcome = generator
///     .text_to_image(
///         &ImageRequest::new("A futuristic cityscape", "openai/gpt-image-1")
///             .with_quality("high")
///             .with_output_path("city.png"),
///     )
///     .await?;
/// println!("Saved to {:?}", outcome.saved_to);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ImageGenerator<'a> {
    client: &'a ImageRouter,
}

impl<'a> ImageGenerator<'a> {
    pub fn new(client: &'a ImageRouter) -> Self {
        Self { client }
    }

    /// Generate images from a text prompt
    pub async fn text_to_image(&self, request: &ImageRequest) -> Result<GenerationOutcome> {
        let prompt = validate_prompt(&request.prompt, MAX_PROMPT_LENGTH)?;

        let mut payload = base_payload(&prompt, &request.model, request.response_format);
        insert_opt(&mut payload, "quality", request.quality.as_deref());
        insert_opt(&mut payload, "size", request.size.as_deref());
        insert_opt(&mut payload, "output_format", request.output_format.as_deref());

        let response = self
            .client
            .post_json(IMAGE_GENERATION_ENDPOINT, &Value::Object(payload), None)
            .await?;

        finish(self.client, response, request.output_path.as_deref()).await
    }

    /// Edit or transform the request's input images, optionally with masks
    pub async fn image_to_image(&self, request: &ImageRequest) -> Result<GenerationOutcome> {
        let prompt = validate_prompt(&request.prompt, MAX_PROMPT_LENGTH)?;
        require_images(&request.images)?;

        let mut files: Vec<FilePart> = prepare_images(&request.images, "image").await?;
        if !request.masks.is_empty() {
            files.extend(prepare_images(&request.masks, "mask").await?);
        }

        let mut fields = base_fields(&prompt, &request.model, request.response_format);
        push_opt(&mut fields, "quality", request.quality.as_deref());
        push_opt(&mut fields, "size", request.size.as_deref());

        let response = self
            .client
            .post_multipart(IMAGE_EDIT_ENDPOINT, &fields, &files, None)
            .await?;

        finish(self.client, response, request.output_path.as_deref()).await
    }

    /// Image-to-image when input images are present, text-to-image otherwise
    pub async fn generate(&self, request: &ImageRequest) -> Result<GenerationOutcome> {
        if request.images.is_empty() {
            self.text_to_image(request).await
        } else {
            self.image_to_image(request).await
        }
    }
}

/// Text-to-video and image-to-video generation
#[derive(Debug, Clone, Copy)]
pub struct VideoGenerator<'a> {
    client: &'a ImageRouter,
}

impl<'a> VideoGenerator<'a> {
    pub fn new(client: &'a ImageRouter) -> Self {
        Self { client }
    }

    /// Generate a video from a text prompt
    pub async fn text_to_video(&self, request: &VideoRequest) -> Result<GenerationOutcome> {
        let prompt = validate_prompt(&request.prompt, MAX_PROMPT_LENGTH)?;

        let mut payload = base_payload(&prompt, &request.model, request.response_format);
        if let Some(seconds) = request.seconds {
            payload.insert("seconds".to_string(), json!(seconds));
        }
        insert_opt(&mut payload, "size", request.size.as_deref());

        let response = self
            .client
            .post_json(VIDEO_GENERATION_ENDPOINT, &Value::Object(payload), None)
            .await?;

        finish(self.client, response, request.output_path.as_deref()).await
    }

    /// Animate the request's input images
    pub async fn image_to_video(&self, request: &VideoRequest) -> Result<GenerationOutcome> {
        let prompt = validate_prompt(&request.prompt, MAX_PROMPT_LENGTH)?;
        require_images(&request.images)?;

        let files = prepare_images(&request.images, "image").await?;

        let mut fields = base_fields(&prompt, &request.model, request.response_format);
        if let Some(seconds) = request.seconds {
            fields.push(("seconds".to_string(), seconds.to_string()));
        }
        push_opt(&mut fields, "size", request.size.as_deref());

        let response = self
            .client
            .post_multipart(VIDEO_GENERATION_ENDPOINT, &fields, &files, None)
            .await?;

        finish(self.client, response, request.output_path.as_deref()).await
    }

    /// Image-to-video when input images are present, text-to-video otherwise
    pub async fn generate(&self, request: &VideoRequest) -> Result<GenerationOutcome> {
        if request.images.is_empty() {
            self.text_to_video(request).await
        } else {
            self.image_to_video(request).await
        }
    }
}

// ============ Internal Helpers ============

fn require_images(images: &[PathBuf]) -> Result<()> {
    if images.is_empty() {
        return Err(ImageRouterError::validation("At least one input image is required"));
    }
    Ok(())
}

fn base_payload(prompt: &str, model: &str, format: ResponseFormat) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("prompt".to_string(), json!(prompt));
    payload.insert("model".to_string(), json!(model));
    payload.insert("response_format".to_string(), json!(format.as_str()));
    payload
}

fn insert_opt(payload: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        payload.insert(key.to_string(), json!(value));
    }
}

fn base_fields(prompt: &str, model: &str, format: ResponseFormat) -> Vec<(String, String)> {
    vec![
        ("prompt".to_string(), prompt.to_string()),
        ("model".to_string(), model.to_string()),
        ("response_format".to_string(), format.as_str().to_string()),
    ]
}

fn push_opt(fields: &mut Vec<(String, String)>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        fields.push((key.to_string(), value.to_string()));
    }
}

async fn finish(
    client: &ImageRouter,
    response: Value,
    output_path: Option<&Path>,
) -> Result<GenerationOutcome> {
    let response: GenerationResponse = serde_json::from_value(response)?;

    let saved_to = match output_path {
        Some(path) => Some(save_output(client, &response, path).await?),
        None => None,
    };

    Ok(GenerationOutcome { response, saved_to })
}

/// Persist the first output of a response
async fn save_output(
    client: &ImageRouter,
    response: &GenerationResponse,
    output_path: &Path,
) -> Result<PathBuf> {
    let first = response
        .data
        .first()
        .ok_or_else(|| ImageRouterError::validation("No output data in response"))?;

    let saved = if let Some(url) = &first.url {
        download_file(client.http(), url, output_path).await?
    } else if let Some(b64) = &first.b64_json {
        save_base64_content(b64, output_path).await?
    } else {
        return Err(ImageRouterError::validation(
            "Response contains neither URL nor base64 data",
        ));
    };

    info!(path = %saved.display(), "saved generation output");
    Ok(saved)
}
