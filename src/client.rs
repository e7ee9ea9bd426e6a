//! ImageRouter API client

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{multipart, Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{classify_response, ImageRouterError, Result};
use crate::types::*;

const DEFAULT_BASE_URL: &str = "https://api.imagerouter.io";
const DEFAULT_TIMEOUT: u64 = 300;
const DEFAULT_MAX_RETRIES: u32 = 3;
const USER_AGENT: &str = concat!("imagerouter-rust/", env!("CARGO_PKG_VERSION"));

/// ImageRouter API client
///
/// Owns the HTTP connection pool, credentials and retry budget. Everything is
/// fixed at construction, so clones can be handed to the registry and the
/// generators freely.
///
/// # Example
///
/// ```no_run
/// use imagerouter::ImageRouter;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ImageRouter::new("ir_xxx")?;
///
///     let credits = client.get_credits().await?;
///     println!("Remaining: ${:.2}", credits.remaining_credits);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ImageRouter {
    api_key: String,
    base_url: String,
    client: Client,
    timeout: Duration,
    max_retries: u32,
}

/// Request body variants understood by the retry loop.
///
/// Multipart content is kept as owned data because a `reqwest` form can only
/// be sent once; every attempt rebuilds it.
enum Payload<'a> {
    Empty,
    Json(&'a Value),
    Multipart {
        fields: &'a [(String, String)],
        files: &'a [FilePart],
    },
}

/// The last recoverable failure seen by the retry loop
enum LastFailure {
    RateLimited { body: String },
    Transport(reqwest::Error),
}

impl ImageRouter {
    /// Create a new client with an API key and default settings
    ///
    /// # Errors
    ///
    /// Returns `ImageRouterError::Authentication` if the API key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ImageRouterConfig::new(api_key))
    }

    /// Create a client from `IMAGEROUTER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(ImageRouterConfig::from_env()?)
    }

    /// Create a new client with custom configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use imagerouter::{ImageRouter, ImageRouterConfig};
    ///
    /// let client = ImageRouter::with_config(
    ///     ImageRouterConfig::new("ir_xxx")
    ///         .with_timeout(60)
    ///         .with_max_retries(5)
    /// )?;
    /// # Ok::<(), imagerouter::ImageRouterError>(())
    /// ```
    pub fn with_config(config: ImageRouterConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ImageRouterError::Authentication {
                message: format!(
                    "API key is required. Provide it explicitly or via the {} environment variable.",
                    ENV_API_KEY
                ),
                status: None,
                body: None,
            });
        }

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ImageRouterError::network(format!("Failed to create HTTP client: {}", e), Some(e))
            })?;

        Ok(Self {
            api_key: config.api_key,
            base_url,
            client,
            timeout: Duration::from_secs(
                config.timeout.filter(|&t| t > 0).unwrap_or(DEFAULT_TIMEOUT),
            ),
            max_retries: config.max_retries.unwrap_or(DEFAULT_MAX_RETRIES).max(1),
        })
    }

    /// Default per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Total number of attempts per request
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    // ============ Catalog & Account ============

    /// Fetch the model catalog as raw JSON objects keyed by model id.
    ///
    /// Entries without an id are skipped. With `output_type` set, only models
    /// whose `output` list contains that kind are kept.
    pub async fn list_models(
        &self,
        output_type: Option<OutputKind>,
    ) -> Result<HashMap<String, Value>> {
        let response = self.get("/v1/models").await?;

        let entries = match response.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        let mut models = HashMap::new();
        for entry in entries {
            let id = match entry.get("id").and_then(Value::as_str) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => continue,
            };

            if let Some(kind) = output_type {
                let supported = entry
                    .get("output")
                    .and_then(Value::as_array)
                    .map(|outputs| outputs.iter().any(|o| o.as_str() == Some(kind.as_str())))
                    .unwrap_or(false);
                if !supported {
                    continue;
                }
            }

            models.insert(id, entry);
        }

        Ok(models)
    }

    /// Get the account credit balance
    pub async fn get_credits(&self) -> Result<Credits> {
        let response = self.get("/v1/credits").await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Check that the API key is accepted
    ///
    /// Returns `Ok(true)` on success; an invalid key surfaces as
    /// `ImageRouterError::Authentication`.
    pub async fn test_auth(&self) -> Result<bool> {
        self.request(Method::POST, "/v1/auth/test", Payload::Empty, None)
            .await?;
        Ok(true)
    }

    // ============ Raw Requests ============

    /// POST a JSON body and return the parsed JSON response
    pub async fn post_json(
        &self,
        endpoint: &str,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        self.request(Method::POST, endpoint, Payload::Json(body), timeout)
            .await
    }

    /// POST a multipart form and return the parsed JSON response
    pub async fn post_multipart(
        &self,
        endpoint: &str,
        fields: &[(String, String)],
        files: &[FilePart],
        timeout: Option<Duration>,
    ) -> Result<Value> {
        self.request(
            Method::POST,
            endpoint,
            Payload::Multipart { fields, files },
            timeout,
        )
        .await
    }

    // ============ Internal Methods ============

    async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, Payload::Empty, None).await
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        payload: &Payload<'_>,
        timeout: Duration,
    ) -> Result<RequestBuilder> {
        let request = self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .timeout(timeout);

        let request = match payload {
            Payload::Empty => request,
            Payload::Json(body) => request.json(body),
            Payload::Multipart { fields, files } => {
                let mut form = multipart::Form::new();
                for (name, value) in fields.iter() {
                    form = form.text(name.clone(), value.clone());
                }
                for file in files.iter() {
                    let part = multipart::Part::bytes(file.bytes.clone())
                        .file_name(file.file_name.clone())
                        .mime_str(&file.mime_type)
                        .map_err(|e| {
                            ImageRouterError::validation(format!(
                                "Invalid MIME type '{}': {}",
                                file.mime_type, e
                            ))
                        })?;
                    form = form.part(file.field.clone(), part);
                }
                request.multipart(form)
            }
        };

        Ok(request)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Payload<'_>,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let timeout = timeout.filter(|t| !t.is_zero()).unwrap_or(self.timeout);
        let mut last_failure: Option<LastFailure> = None;

        for attempt in 0..self.max_retries {
            let is_last = attempt + 1 >= self.max_retries;
            debug!(%method, %url, attempt, "sending request");

            let request = self.build_request(method.clone(), &url, &payload, timeout)?;
            let started = Instant::now();

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!(%url, attempt, error = %e, "transient transport failure");
                    last_failure = Some(LastFailure::Transport(e));
                    if !is_last {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                    continue;
                }
                Err(e) => {
                    return Err(ImageRouterError::network(
                        format!("Request failed: {}", e),
                        Some(e),
                    ));
                }
            };

            let status = response.status();

            // Rate limits are retried, honouring Retry-After when present
            if status == StatusCode::TOO_MANY_REQUESTS {
                let delay = retry_after(response.headers()).unwrap_or_else(|| backoff(attempt));
                let body = response.text().await.unwrap_or_default();
                warn!(%url, attempt, delay_secs = delay.as_secs(), "rate limited");
                last_failure = Some(LastFailure::RateLimited { body });
                if !is_last {
                    tokio::time::sleep(delay).await;
                }
                continue;
            }

            // The body is read under the same timeout as the headers
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) if body_timed_out(&e, started.elapsed(), timeout) => {
                    warn!(%url, attempt, error = %e, "timed out reading response body");
                    last_failure = Some(LastFailure::Transport(e));
                    if !is_last {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                    continue;
                }
                Err(e) => {
                    return Err(ImageRouterError::network(
                        format!("Failed to read response body: {}", e),
                        Some(e),
                    ));
                }
            };

            if status.as_u16() >= 400 {
                debug!(%url, status = status.as_u16(), "request rejected");
                return Err(classify_response(status.as_u16(), &text));
            }

            return Ok(serde_json::from_str(&text)?);
        }

        match last_failure {
            Some(LastFailure::RateLimited { body }) => {
                Err(classify_response(StatusCode::TOO_MANY_REQUESTS.as_u16(), &body))
            }
            Some(LastFailure::Transport(e)) => Err(ImageRouterError::network(
                format!("Request failed after {} attempts: {}", self.max_retries, e),
                Some(e),
            )),
            None => Err(ImageRouterError::network(
                format!("Request failed after {} attempts", self.max_retries),
                None,
            )),
        }
    }
}

/// Exponential backoff for a zero-based attempt: 1s, 2s, 4s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(16))
}

/// A body read that failed once the request deadline had passed.
///
/// reqwest reports a deadline hit mid-body as a decode error, so elapsed time
/// is checked alongside `is_timeout`.
fn body_timed_out(error: &reqwest::Error, elapsed: Duration, timeout: Duration) -> bool {
    error.is_timeout() || ((error.is_body() || error.is_decode()) && elapsed >= timeout)
}

/// Parse a `Retry-After` header given in whole seconds
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(0), Duration::from_secs(1));
        assert_eq!(backoff(1), Duration::from_secs(2));
        assert_eq!(backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = ImageRouter::new("  ");
        assert!(matches!(
            result,
            Err(ImageRouterError::Authentication { status: None, .. })
        ));
    }

    #[test]
    fn test_config_defaults_and_clamping() {
        let client = ImageRouter::new("key").unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(300));
        assert_eq!(client.max_retries(), 3);
        assert_eq!(client.base_url, DEFAULT_BASE_URL);

        let client = ImageRouter::with_config(
            ImageRouterConfig::new("key")
                .with_base_url("http://localhost:8080/")
                .with_max_retries(0),
        )
        .unwrap();
        assert_eq!(client.max_retries(), 1);
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let client =
            ImageRouter::with_config(ImageRouterConfig::new("key").with_timeout(0)).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(DEFAULT_TIMEOUT));
    }
}
