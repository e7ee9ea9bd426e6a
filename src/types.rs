//! ImageRouter API types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{ImageRouterError, Result};

// ============ Configuration ============

pub(crate) const ENV_API_KEY: &str = "IMAGEROUTER_API_KEY";
pub(crate) const ENV_TIMEOUT: &str = "IMAGEROUTER_TIMEOUT";
pub(crate) const ENV_MAX_RETRIES: &str = "IMAGEROUTER_MAX_RETRIES";
pub(crate) const ENV_BASE_URL: &str = "IMAGEROUTER_BASE_URL";

/// Configuration for the ImageRouter client
#[derive(Debug, Clone)]
pub struct ImageRouterConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL for the API (default: https://api.imagerouter.io)
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 300)
    pub timeout: Option<u64>,
    /// Total number of attempts per request (default: 3)
    pub max_retries: Option<u32>,
}

impl ImageRouterConfig {
    /// Create a new configuration with just an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            timeout: None,
            max_retries: None,
        }
    }

    /// Build a configuration from `IMAGEROUTER_*` environment variables.
    ///
    /// A missing key yields an empty one, which the client rejects at
    /// construction. Builder calls made afterwards take precedence.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let timeout = read(ENV_TIMEOUT)
            .map(|raw| parse_env_number::<u64>(ENV_TIMEOUT, &raw))
            .transpose()?;
        let max_retries = read(ENV_MAX_RETRIES)
            .map(|raw| parse_env_number::<u32>(ENV_MAX_RETRIES, &raw))
            .transpose()?;

        Ok(Self {
            api_key: read(ENV_API_KEY).unwrap_or_default(),
            base_url: read(ENV_BASE_URL),
            timeout,
            max_retries,
        })
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set a custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set a custom timeout in seconds
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the total number of attempts per request
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

fn parse_env_number<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        ImageRouterError::validation(format!("{} must be an integer, got '{}'", name, raw))
    })
}

// ============ Output kinds ============

/// What a model produces, and what kind of generation an estimate covers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Image,
    Video,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Image => "image",
            OutputKind::Video => "video",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKind {
    type Err = ImageRouterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(OutputKind::Image),
            "video" => Ok(OutputKind::Video),
            other => Err(ImageRouterError::validation(format!(
                "Unknown output type '{}', expected 'image' or 'video'",
                other
            ))),
        }
    }
}

// ============ Account ============

/// Account credit balance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credits {
    /// Remaining balance in USD
    #[serde(default)]
    pub remaining_credits: f64,
    /// Total spent so far in USD
    #[serde(default)]
    pub credit_usage: f64,
    /// Total deposited in USD
    #[serde(default)]
    pub total_deposits: f64,
}

// ============ Generation ============

/// How the API should return generated media
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Hosted URL (default)
    #[default]
    Url,
    /// Inline base64 payload
    B64Json,
    /// Inline base64 payload that is not stored server side
    B64Ephemeral,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Url => "url",
            ResponseFormat::B64Json => "b64_json",
            ResponseFormat::B64Ephemeral => "b64_ephemeral",
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = ImageRouterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "url" => Ok(ResponseFormat::Url),
            "b64_json" => Ok(ResponseFormat::B64Json),
            "b64_ephemeral" => Ok(ResponseFormat::B64Ephemeral),
            other => Err(ImageRouterError::validation(format!(
                "Unknown response format '{}'",
                other
            ))),
        }
    }
}

/// One generated image or video
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedOutput {
    /// Hosted URL (url response format)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64 payload (b64 response formats)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    /// Prompt as rewritten by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of a generation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Unix timestamp of creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    /// Generated outputs
    #[serde(default)]
    pub data: Vec<GeneratedOutput>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============ Uploads ============

/// A file attached to a multipart request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name, e.g. `image[0]`
    pub field: String,
    /// File name sent to the server
    pub file_name: String,
    /// MIME type of the content
    pub mime_type: String,
    /// File content
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_builder() {
        let config = ImageRouterConfig::new("test_key")
            .with_base_url("https://custom.url")
            .with_timeout(30)
            .with_max_retries(5);

        assert_eq!(config.api_key, "test_key");
        assert_eq!(config.base_url, Some("https://custom.url".to_string()));
        assert_eq!(config.timeout, Some(30));
        assert_eq!(config.max_retries, Some(5));
    }

    #[test]
    fn test_config_from_env_values() {
        let config = ImageRouterConfig::from_lookup(lookup(&[
            (ENV_API_KEY, "env_key"),
            (ENV_TIMEOUT, "120"),
            (ENV_MAX_RETRIES, "5"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "env_key");
        assert_eq!(config.timeout, Some(120));
        assert_eq!(config.max_retries, Some(5));
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_explicit_values_override_env() {
        let config = ImageRouterConfig::from_lookup(lookup(&[
            (ENV_API_KEY, "env_key"),
            (ENV_TIMEOUT, "120"),
        ]))
        .unwrap()
        .with_api_key("explicit")
        .with_timeout(10);

        assert_eq!(config.api_key, "explicit");
        assert_eq!(config.timeout, Some(10));
    }

    #[test]
    fn test_config_rejects_non_numeric_env() {
        let result = ImageRouterConfig::from_lookup(lookup(&[(ENV_TIMEOUT, "soon")]));

        assert!(matches!(result, Err(ImageRouterError::Validation { .. })));
    }

    #[test]
    fn test_output_kind_parsing() {
        assert_eq!("video".parse::<OutputKind>().unwrap(), OutputKind::Video);
        assert_eq!("image".parse::<OutputKind>().unwrap(), OutputKind::Image);
        assert!("audio".parse::<OutputKind>().is_err());
    }

    #[test]
    fn test_generation_response_keeps_unknown_fields() {
        let response: GenerationResponse = serde_json::from_value(serde_json::json!({
            "created": 1735689600,
            "data": [{"url": "https://x/y.png", "seed": 7}],
            "latency": 1.5
        }))
        .unwrap();

        assert_eq!(response.created, Some(1735689600));
        assert_eq!(response.data[0].url.as_deref(), Some("https://x/y.png"));
        assert_eq!(response.data[0].extra["seed"], 7);
        assert_eq!(response.extra["latency"], 1.5);
    }
}
