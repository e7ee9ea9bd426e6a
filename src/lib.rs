//! # ImageRouter client
//!
//! Rust client for the ImageRouter image and video generation API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use imagerouter::{CostEstimator, ImageRouter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ImageRouter::from_env()?;
//!
//!     // Check the price before generating anything
//!     let mut estimator = CostEstimator::new(client.clone());
//!     let estimate = estimator.estimate_video("google/veo-3.1-fast", Some(4), 2).await?;
//!
//!     println!("{}", estimate);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```no_run
//! use imagerouter::{ImageRouter, ImageRouterConfig};
//!
//! let client = ImageRouter::with_config(
//!     ImageRouterConfig::from_env()?
//!         .with_timeout(120)
//!         .with_max_retries(5)
//! )?;
//! # Ok::<(), imagerouter::ImageRouterError>(())
//! ```
//!
//! ## Generation
//!
//! ```no_run
//! use imagerouter::{ImageRouter, VideoGenerator, VideoRequest};
//!
//! # async fn example() -> imagerouter::Result<()> {
//! let client = ImageRouter::new("ir_xxx")?;
//!
//! let outcome = VideoGenerator::new(&client)
//!     .text_to_video(
//!         &VideoRequest::new("A cat playing piano", "google/veo-3.1-fast")
//!             .with_seconds(4)
//!             .with_output_path("cat.mp4"),
//!     )
//!     .await?;
//!
//! println!("Saved to {:?}", outcome.saved_to);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use imagerouter::{CostEstimator, ImageRouter, ImageRouterError};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut estimator = CostEstimator::new(ImageRouter::new("ir_xxx")?);
//!
//! match estimator.estimate_image("openai/gpt-image-1", "high", "auto", 3).await {
//!     Ok(estimate) => println!("About ${:.2}", estimate.total_average),
//!     Err(ImageRouterError::Authentication { message, .. }) => {
//!         eprintln!("Invalid API key: {}", message);
//!     }
//!     Err(ImageRouterError::ModelNotFound { message, .. }) => {
//!         eprintln!("Unknown model: {}", message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod estimator;
mod generators;
mod models;
mod types;
pub mod utils;

// Re-export main types
pub use client::ImageRouter;
pub use error::{classify_response, ImageRouterError, Result};
pub use estimator::{CostEstimate, CostEstimator};
pub use generators::{GenerationOutcome, ImageGenerator, ImageRequest, VideoGenerator, VideoRequest};
pub use models::{ModelInfo, ModelRegistry, PricingInfo, PricingKind};
pub use types::{
    // Configuration
    ImageRouterConfig,
    // Catalog
    OutputKind,
    // Account
    Credits,
    // Generation
    FilePart,
    GeneratedOutput,
    GenerationResponse,
    ResponseFormat,
};
