use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use easel_core::{
    diagnostics::{self, AcceleratorReport, Verdict},
    presets,
    sentiment::{SentimentClassifier, DEFAULT_SENTIMENT_MODEL},
    AcceleratorPolicy, CandleEngine, Configurator, DeviceMap, Engine, GenerationError,
    GenerationRequest, GenerationResult, MediaSpec, Runner,
};
use hf_hub::api::tokio::Api;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Define command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive image and video generation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an image from a text prompt
    Image {
        /// Directory the image is written to
        #[arg(long, default_value = "images")]
        output_dir: PathBuf,

        /// Use CPU instead of GPU
        #[arg(long)]
        cpu: bool,

        #[command(flatten)]
        prompting: Prompting,
    },
    /// Generate a video from a text prompt (requires a GPU)
    Video {
        /// Directory the video is written to
        #[arg(long, default_value = "videos")]
        output_dir: PathBuf,

        #[command(flatten)]
        prompting: Prompting,
    },
    /// Report platform and accelerator support
    Doctor,
    /// Classify the sentiment of a piece of text
    Sentiment {
        /// Text to classify; asked interactively when omitted
        text: Option<String>,

        /// Hub model to classify with
        #[arg(long, default_value = DEFAULT_SENTIMENT_MODEL)]
        model: String,

        /// Use CPU instead of GPU
        #[arg(long)]
        cpu: bool,
    },
}

#[derive(Args, Debug)]
struct Prompting {
    /// Give up after this many invalid answers to one question
    #[arg(long)]
    max_attempts: Option<usize>,
}

fn rule() -> String {
    "=".repeat(60)
}

fn print_section(title: &str) {
    println!("\n{}", rule());
    println!("  {title}");
    println!("{}", rule());
}

fn print_banner(title: &str) {
    println!("{}", rule());
    println!("  {title}");
    println!("{}", rule());
}

fn print_request(request: &GenerationRequest, device_map: DeviceMap) {
    let kind = match request.media {
        MediaSpec::Image { .. } => "Image",
        MediaSpec::Video { .. } => "Video",
    };
    print_section(&format!("{} {kind} Generation", request.model_name));
    println!("Device: {device_map}");
    println!("Prompt: {}", request.prompt);
    match request.media {
        MediaSpec::Image { width, height } => println!("Size: {width}x{height}"),
        MediaSpec::Video { frames, fps } => println!(
            "Frames: {frames} ({:.1}s @ {fps}fps)",
            request.media.duration_secs().unwrap_or_default()
        ),
    }
    println!("Steps: {}", request.steps);
    if let Some(guidance) = request.guidance {
        println!("Guidance: {guidance}");
    }
    println!("{}\n", rule());
}

fn print_result(result: &GenerationResult, kind: &MediaSpec) {
    let generation = result.generation_duration.as_secs_f64();
    print_banner("Generation Complete!");
    match kind {
        MediaSpec::Image { .. } => println!("Generation time: {generation:.2} seconds"),
        MediaSpec::Video { .. } => println!(
            "Generation time: {generation:.2} seconds ({:.1} minutes)",
            generation / 60.0
        ),
    }
    println!(
        "Total time: {:.2} seconds",
        result.total_duration().as_secs_f64()
    );
    println!("Saved to: {}", result.output_path.display());
    println!("{}\n", rule());
}

fn hub() -> Result<Api, GenerationError> {
    Api::new().map_err(|e| GenerationError::Engine(e.into()))
}

/// Checks the accelerator before showing anything, then runs the request.
async fn generate(
    request: GenerationRequest,
    policy: AcceleratorPolicy,
    device_map: DeviceMap,
    notices: &[&str],
) -> Result<GenerationResult, GenerationError> {
    request.validate()?;
    let runner = Runner::new(CandleEngine::new(hub()?), policy).with_device_map(device_map);
    let device_map = runner.resolve_device(&request)?;

    print_request(&request, device_map);
    for notice in notices {
        println!("{notice}");
    }
    runner.run_on(request, device_map).await
}

async fn image(
    output_dir: PathBuf,
    cpu: bool,
    prompting: Prompting,
) -> Result<(), GenerationError> {
    print_banner("Interactive Stable Diffusion Image Generator");
    let mut cfg = Configurator::stdio().with_max_attempts(prompting.max_attempts);
    let request = presets::configure_image(&mut cfg, output_dir)?;
    let media = request.media;

    let device_map = if cpu {
        DeviceMap::ForceCpu
    } else {
        DeviceMap::default()
    };
    let result = generate(request, AcceleratorPolicy::PreferWithFallback, device_map, &[]).await?;
    print_result(&result, &media);
    Ok(())
}

async fn video(output_dir: PathBuf, prompting: Prompting) -> Result<(), GenerationError> {
    print_banner("Interactive CogVideoX Video Generator");
    let mut cfg = Configurator::stdio().with_max_attempts(prompting.max_attempts);
    let request = presets::configure_video(&mut cfg, output_dir)?;
    let media = request.media;

    let notices = [
        "(First run will download ~8-20GB of model weights)",
        "(Generation may take several minutes...)",
    ];
    let result = generate(
        request,
        AcceleratorPolicy::Required,
        DeviceMap::default(),
        &notices,
    )
    .await?;
    print_result(&result, &media);
    Ok(())
}

fn doctor() -> Result<()> {
    let report = AcceleratorReport::probe();

    print_section("System Information");
    println!("Platform: {}-{}", report.os, report.arch);
    println!("Family: {}", report.family);
    println!("easel version: {}", report.crate_version);
    println!("CPU threads: {}", report.num_threads);

    print_section("Candle Build Information");
    println!("AVX: {}", report.with_avx);
    println!("NEON: {}", report.with_neon);
    println!("F16C: {}", report.with_f16c);
    println!("MKL: {}", report.with_mkl);
    println!("Accelerate: {}", report.with_accelerate);

    print_section("Accelerator Support Status");
    println!("CUDA built into this binary: {}", report.cuda_built);
    println!("CUDA available on device: {}", report.cuda_available);
    println!("Metal built into this binary: {}", report.metal_built);
    println!("Metal available on device: {}", report.metal_available);

    print_section("Summary");
    match report.verdict() {
        Verdict::Ready => {
            println!("✓ GPU acceleration is FULLY SUPPORTED and ready to use!");
            if let Some(device) = report.accelerator()? {
                print_section("Quick Accelerator Test");
                match diagnostics::smoke_test(&device) {
                    Ok(shape) => {
                        println!("✓ Successfully created tensors and performed operations on the accelerator!");
                        println!("Test tensor shape: {shape:?}");
                        println!("Test tensor device: {:?}", device.location());
                    }
                    Err(e) => println!("✗ Accelerator test failed: {e}"),
                }
            }
        }
        Verdict::BuiltButUnavailable => {
            println!("⚠ GPU support is built into this binary but NOT available on this device");
            println!("\nPossible reasons:");
            println!("  - No CUDA-capable GPU or driver present");
            println!("  - Not running on Apple Silicon (M1/M2/M3/M4) for Metal");
        }
        Verdict::NotBuilt => {
            println!("✗ GPU support is NOT built into this binary");
            println!("\nTo get GPU support:");
            println!("  - Rebuild with `--features cuda` on NVIDIA hardware");
            println!("  - Rebuild with `--features metal` on Apple Silicon");
        }
    }
    println!("\n{}\n", rule());
    Ok(())
}

async fn sentiment(
    text: Option<String>,
    model: String,
    cpu: bool,
) -> Result<(), GenerationError> {
    let text = match text {
        Some(text) if !text.trim().is_empty() => text.trim().to_string(),
        Some(_) => return Err(GenerationError::EmptyPrompt),
        None => Configurator::stdio().prompt_text("Enter the text to classify:", None)?,
    };

    let api = hub()?;
    let requested = if cpu {
        DeviceMap::ForceCpu
    } else {
        DeviceMap::default()
    };
    let engine = CandleEngine::new(api.clone());
    let device_map = AcceleratorPolicy::PreferWithFallback
        .choose(requested, || engine.accelerator_available())
        .unwrap_or(DeviceMap::ForceCpu);

    info!(model = %model, "Loading sentiment model...");
    let classifier = SentimentClassifier::load(&model, api, device_map)
        .await
        .map_err(GenerationError::Engine)?;
    let result = classifier.classify(&text).map_err(GenerationError::Engine)?;
    let json = serde_json::to_string(&[result]).map_err(|e| GenerationError::Engine(e.into()))?;
    println!("{json}");
    Ok(())
}

fn init_tracing() {
    let env_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_layer)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let (what, outcome) = match cli.command {
        Command::Image {
            output_dir,
            cpu,
            prompting,
        } => ("generating image", image(output_dir, cpu, prompting).await),
        Command::Video {
            output_dir,
            prompting,
        } => ("generating video", video(output_dir, prompting).await),
        Command::Doctor => (
            "checking accelerator support",
            doctor().map_err(GenerationError::Engine),
        ),
        Command::Sentiment { text, model, cpu } => {
            ("classifying sentiment", sentiment(text, model, cpu).await)
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(GenerationError::EmptyPrompt) => {
            eprintln!("\n✗ Error: Prompt cannot be empty");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("\n✗ Error {what}: {e:#}");
            ExitCode::FAILURE
        }
    }
}
