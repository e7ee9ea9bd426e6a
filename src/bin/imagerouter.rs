//! ImageRouter command-line interface
//!
//! Estimates are the default workflow; generation needs an explicit `--execute`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use imagerouter::{
    CostEstimator, GenerationOutcome, ImageGenerator, ImageRequest, ImageRouter, ImageRouterError,
    ModelRegistry, OutputKind, ResponseFormat, VideoGenerator, VideoRequest,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imagerouter", version, about = "ImageRouter video/image generation CLI")]
struct Cli {
    /// Log requests and retries to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate generation cost (no API cost)
    Estimate(EstimateArgs),
    /// Execute generation (requires --execute)
    Generate(GenerateArgs),
    /// List available models
    Models(ModelsArgs),
    /// Show account balance
    Credits(CreditsArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Video,
    Image,
}

impl From<KindArg> for OutputKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Video => OutputKind::Video,
            KindArg::Image => OutputKind::Image,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Url,
    #[value(name = "b64_json")]
    B64Json,
    #[value(name = "b64_ephemeral")]
    B64Ephemeral,
}

impl From<FormatArg> for ResponseFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Url => ResponseFormat::Url,
            FormatArg::B64Json => ResponseFormat::B64Json,
            FormatArg::B64Ephemeral => ResponseFormat::B64Ephemeral,
        }
    }
}

#[derive(Args)]
struct EstimateArgs {
    /// Generation type
    #[arg(long = "type", value_enum)]
    kind: KindArg,
    /// Model ID (e.g. 'google/veo-3.1-fast')
    #[arg(long)]
    model: String,
    /// Video duration in seconds
    #[arg(long)]
    seconds: Option<u32>,
    /// Number of outputs
    #[arg(long, default_value_t = 1)]
    count: u32,
    /// Image quality level
    #[arg(long, default_value = "auto")]
    quality: String,
    /// Output resolution
    #[arg(long, default_value = "auto")]
    size: String,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct GenerateArgs {
    /// Confirm that generation should run and be billed
    #[arg(long, required = true)]
    execute: bool,
    /// Generation type
    #[arg(long = "type", value_enum)]
    kind: KindArg,
    /// Model ID
    #[arg(long)]
    model: String,
    /// Text prompt
    #[arg(long)]
    prompt: String,
    /// Input image path(s) for image-to-video / image-to-image
    #[arg(long = "image")]
    images: Vec<PathBuf>,
    /// Mask image path(s) for editing
    #[arg(long = "mask")]
    masks: Vec<PathBuf>,
    /// Video duration in seconds
    #[arg(long)]
    seconds: Option<u32>,
    /// Output resolution
    #[arg(long, default_value = "auto")]
    size: String,
    /// Image quality level
    #[arg(long, default_value = "auto")]
    quality: String,
    /// Save output to file path
    #[arg(long)]
    output: Option<PathBuf>,
    /// Response format
    #[arg(long, value_enum, default_value = "url")]
    format: FormatArg,
    /// Output full JSON response
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ModelsArgs {
    /// Filter by output type
    #[arg(long = "type", value_enum)]
    kind: Option<KindArg>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CreditsArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Command::Estimate(args) => cmd_estimate(args).await,
        Command::Generate(args) => cmd_generate(args).await,
        Command::Models(args) => cmd_models(args).await,
        Command::Credits(args) => cmd_credits(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.message());
            ExitCode::FAILURE
        }
    }
}

async fn cmd_estimate(args: EstimateArgs) -> Result<(), ImageRouterError> {
    let mut estimator = CostEstimator::new(ImageRouter::from_env()?);

    let estimate = match args.kind {
        KindArg::Video => {
            estimator
                .estimate_video(&args.model, args.seconds, args.count)
                .await?
        }
        KindArg::Image => {
            estimator
                .estimate_image(&args.model, &args.quality, &args.size, args.count)
                .await?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
    } else {
        println!("{}", estimate);
    }
    Ok(())
}

async fn cmd_generate(args: GenerateArgs) -> Result<(), ImageRouterError> {
    let client = ImageRouter::from_env()?;

    let outcome: GenerationOutcome = match args.kind {
        KindArg::Video => {
            let mut request = VideoRequest::new(&args.prompt, &args.model)
                .with_size(&args.size)
                .with_response_format(args.format.into());
            request.seconds = args.seconds;
            request.images = args.images.clone();
            request.output_path = args.output.clone();
            VideoGenerator::new(&client).generate(&request).await?
        }
        KindArg::Image => {
            let mut request = ImageRequest::new(&args.prompt, &args.model)
                .with_quality(&args.quality)
                .with_size(&args.size)
                .with_response_format(args.format.into());
            request.images = args.images.clone();
            request.masks = args.masks.clone();
            request.output_path = args.output.clone();
            ImageGenerator::new(&client).generate(&request).await?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.response)?);
    } else {
        for (i, item) in outcome.response.data.iter().enumerate() {
            if let Some(url) = &item.url {
                println!("Output {}: {}", i + 1, url);
            } else if let Some(b64) = &item.b64_json {
                println!("Output {}: [base64 data, {} chars]", i + 1, b64.len());
            }
        }
        if let Some(path) = &outcome.saved_to {
            println!("Saved to: {}", path.display());
        }
    }
    Ok(())
}

async fn cmd_models(args: ModelsArgs) -> Result<(), ImageRouterError> {
    let mut registry = ModelRegistry::new(ImageRouter::from_env()?);

    let models = match args.kind {
        Some(kind) => registry.get_models_of_kind(kind.into()).await?,
        None => registry.get_all_models().await?,
    };

    let mut sorted: Vec<_> = models.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    if args.json {
        let output: serde_json::Map<String, serde_json::Value> = sorted
            .into_iter()
            .map(|(id, info)| serde_json::to_value(info).map(|value| (id, value)))
            .collect::<Result<_, serde_json::Error>>()?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let label = args
        .kind
        .map(|k| format!("{} ", OutputKind::from(k)))
        .unwrap_or_default();
    println!("Available {}models:\n", label);
    for (id, info) in sorted {
        let (min, _, max) = info.pricing.estimate();
        let price = if min == max {
            format!("${:.2}", min)
        } else {
            format!("${:.2} - ${:.2}", min, max)
        };

        println!("  {}", id);
        println!("    Provider: {}", info.provider);
        println!("    Price: {}", price);
        if !info.supported_durations.is_empty() {
            println!("    Durations: {:?}s", info.supported_durations);
        }
        if info.supports_edit {
            println!("    Supports edit: Yes");
        }
        println!();
    }
    Ok(())
}

async fn cmd_credits(args: CreditsArgs) -> Result<(), ImageRouterError> {
    let credits = ImageRouter::from_env()?.get_credits().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&credits)?);
    } else {
        println!("Account Balance:");
        println!("  Remaining credits: ${:.2}", credits.remaining_credits);
        println!("  Total usage: ${:.2}", credits.credit_usage);
        println!("  Total deposits: ${:.2}", credits.total_deposits);
    }
    Ok(())
}
