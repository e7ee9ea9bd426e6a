//! Shared fixtures for the integration suites

#![allow(dead_code)]

use imagerouter::{ImageRouter, ImageRouterConfig};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Client pointed at the mock server with a single attempt per request
pub fn create_test_client(mock_server: &MockServer) -> ImageRouter {
    create_client_with_attempts(mock_server, 1)
}

pub fn create_client_with_attempts(mock_server: &MockServer, attempts: u32) -> ImageRouter {
    ImageRouter::with_config(
        ImageRouterConfig::new("test_api_key")
            .with_base_url(mock_server.uri())
            .with_max_retries(attempts),
    )
    .expect("Failed to create test client")
}

/// Catalog with video, image, fixed and range priced models
pub fn catalog() -> Value {
    json!({
        "data": [
            {
                "id": "google/veo-3.1-fast",
                "name": "Veo 3.1 Fast",
                "provider": "Gemini",
                "output": ["video"],
                "pricing": {
                    "type": "calculated",
                    "range": {"min": 0.60, "average": 0.90, "max": 1.20}
                },
                "seconds": [4, 6, 8],
                "sizes": ["1280x720", "1920x1080"],
                "supported_params": {"edit": false}
            },
            {
                "id": "kwaivgi/kling-2.1-standard",
                "name": "Kling 2.1 Standard",
                "provider": "Runware",
                "output": ["video"],
                "pricing": {
                    "type": "post_generation",
                    "range": {"min": 0.18, "average": 0.27, "max": 0.37}
                },
                "seconds": [5, 10],
                "sizes": ["1280x720"],
                "supported_params": {"edit": true}
            },
            {
                "id": "openai/gpt-image-1",
                "name": "GPT Image 1",
                "provider": "OpenAI",
                "output": ["image"],
                "pricing": {
                    "type": "calculated",
                    "range": {"min": 0.01, "average": 0.15, "max": 0.30}
                },
                "sizes": ["1024x1024", "512x512"],
                "supported_params": {"edit": true}
            },
            {
                "id": "ir/test-video",
                "name": "Test Video",
                "provider": "Test",
                "output": ["video"],
                "pricing": {"type": "fixed", "value": 0.00},
                "seconds": [5],
                "supported_params": {"edit": false}
            },
            {
                "id": "openai/gpt-image-1.5:free",
                "name": "GPT Image 1.5 Free",
                "provider": "OpenAI",
                "output": ["image"],
                "pricing": {"type": "fixed", "value": 0.00},
                "sizes": ["1024x1024"],
                "supported_params": {"edit": true}
            },
            {
                "id": "acme/omni",
                "output": ["image", "video"],
                "pricing": {"type": "fixed", "value": 0.25}
            },
            {
                "name": "Entry without id",
                "output": ["image"],
                "pricing": {"type": "fixed", "value": 1.0}
            }
        ]
    })
}

/// Serve the catalog on `GET /v1/models`, expecting exactly `times` fetches
pub async fn mount_catalog(mock_server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog()))
        .expect(times)
        .mount(mock_server)
        .await;
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
