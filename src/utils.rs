//! File helpers: prompt validation, upload preparation and output persistence

use base64::{engine::general_purpose, Engine as _};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::error::{ImageRouterError, Result};
use crate::types::{FilePart, OutputKind};

/// Longest prompt accepted, in characters
pub const MAX_PROMPT_LENGTH: usize = 10_000;

/// Most input images accepted by one request
pub const MAX_INPUT_IMAGES: usize = 16;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Upload formats and their MIME types
const SUPPORTED_IMAGE_FORMATS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

const SUPPORTED_VIDEO_FORMATS: &[(&str, &str)] = &[("mp4", "video/mp4"), ("webm", "video/webm")];

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn lookup_format(table: &[(&str, &'static str)], ext: &str) -> Option<&'static str> {
    table.iter().find(|(e, _)| *e == ext).map(|(_, mime)| *mime)
}

/// Trim a prompt and check it is non-empty and at most `max_length` characters
pub fn validate_prompt(prompt: &str, max_length: usize) -> Result<String> {
    let cleaned = prompt.trim();
    if cleaned.is_empty() {
        return Err(ImageRouterError::validation("Prompt cannot be empty"));
    }

    let length = cleaned.chars().count();
    if length > max_length {
        return Err(ImageRouterError::validation(format!(
            "Prompt too long ({} chars). Maximum is {} characters.",
            length, max_length
        )));
    }

    Ok(cleaned.to_string())
}

/// Check that `path` is an existing file in a supported image format
pub fn validate_image_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(ImageRouterError::validation(format!(
            "Image file not found: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(ImageRouterError::validation(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }

    let ext = extension_of(path).unwrap_or_default();
    if lookup_format(SUPPORTED_IMAGE_FORMATS, &ext).is_none() {
        let supported: Vec<String> = SUPPORTED_IMAGE_FORMATS
            .iter()
            .map(|(e, _)| format!(".{}", e))
            .collect();
        return Err(ImageRouterError::validation(format!(
            "Unsupported image format '.{}'. Supported formats: {}",
            ext,
            supported.join(", ")
        )));
    }

    Ok(path.canonicalize()?)
}

/// MIME type for a path, based on its extension
pub fn mime_type_for(path: &Path) -> String {
    if let Some(ext) = extension_of(path) {
        if let Some(mime) = lookup_format(SUPPORTED_IMAGE_FORMATS, &ext)
            .or_else(|| lookup_format(SUPPORTED_VIDEO_FORMATS, &ext))
        {
            return mime.to_string();
        }
    }

    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Read images into multipart parts named `<field_prefix>[i]`
pub async fn prepare_images(paths: &[PathBuf], field_prefix: &str) -> Result<Vec<FilePart>> {
    if paths.len() > MAX_INPUT_IMAGES {
        return Err(ImageRouterError::validation(format!(
            "Maximum {} images allowed per request",
            MAX_INPUT_IMAGES
        )));
    }

    let mut parts = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let resolved = validate_image_path(path)?;
        let bytes = tokio::fs::read(&resolved).await?;
        let file_name = resolved
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        parts.push(FilePart {
            field: format!("{}[{}]", field_prefix, index),
            file_name,
            mime_type: mime_type_for(&resolved),
            bytes,
        });
    }

    Ok(parts)
}

fn ensure_parent_exists(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            Err(ImageRouterError::validation(format!(
                "Output directory does not exist: {}",
                parent.display()
            )))
        }
        _ => Ok(()),
    }
}

/// Decode base64 content and write it to `output_path`
pub async fn save_base64_content(data: &str, output_path: &Path) -> Result<PathBuf> {
    ensure_parent_exists(output_path)?;

    let decoded = general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| {
            ImageRouterError::validation(format!("Failed to decode base64 content: {}", e))
        })?;

    tokio::fs::write(output_path, decoded).await?;
    Ok(output_path.canonicalize()?)
}

/// Stream `url` into `output_path`
///
/// Hosted outputs are public, so no credentials are sent.
pub async fn download_file(http: &Client, url: &str, output_path: &Path) -> Result<PathBuf> {
    ensure_parent_exists(output_path)?;

    let download_error = |e: reqwest::Error| {
        ImageRouterError::network(format!("Failed to download file: {}", e), Some(e))
    };

    let response = http
        .get(url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(download_error)?;

    let mut file = tokio::fs::File::create(output_path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk.map_err(download_error)?).await?;
    }
    file.flush().await?;

    Ok(output_path.canonicalize()?)
}

/// Extension for an output file, preferring the one already on `output_path`
pub fn infer_output_extension(kind: OutputKind, output_path: Option<&Path>) -> String {
    if let Some(ext) = output_path.and_then(extension_of) {
        return format!(".{}", ext);
    }

    match kind {
        OutputKind::Video => ".mp4".to_string(),
        OutputKind::Image => ".png".to_string(),
    }
}

/// Output path with an extension, or `<model>_<unix time><ext>` when none was given
pub fn ensure_output_path(output_path: Option<&Path>, kind: OutputKind, model: &str) -> PathBuf {
    let ext = infer_output_extension(kind, None);

    match output_path {
        Some(path) if path.extension().is_none() => {
            path.with_extension(ext.trim_start_matches('.'))
        }
        Some(path) => path.to_path_buf(),
        None => {
            let model_safe = model.replace(['/', ':'], "_");
            PathBuf::from(format!("{}_{}{}", model_safe, chrono::Utc::now().timestamp(), ext))
        }
    }
}
