use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use memoria_core::codec::domain::image_reader::ImageReader;
use memoria_core::codec::domain::image_writer::ImageWriter;
use memoria_core::codec::infrastructure::image_file_reader::ImageFileReader;
use memoria_core::codec::infrastructure::image_file_writer::{
    ImageFileWriter, DEFAULT_JPEG_QUALITY,
};
use memoria_core::detection::domain::region_detector::RegionDetector;
use memoria_core::detection::infrastructure::http_region_detector::HttpRegionDetector;
use memoria_core::pipeline::batch_executor::BatchExecutor;
use memoria_core::pipeline::enhance_batch_use_case::EnhanceBatchUseCase;
use memoria_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use memoria_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use memoria_core::shared::constants::{DEFAULT_DETECTOR_TIMEOUT_MS, IMAGE_EXTENSIONS};
use memoria_core::shared::enhancement_config::EnhancementConfig;

const CONFIG_DIR_NAME: &str = "Memoria";
const CONFIG_FILE_NAME: &str = "enhance.json";

/// Photo enhancement for memorial slideshows and printed cards.
#[derive(Parser)]
#[command(name = "memoria")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rotate, crop, colour-correct and frame a set of photos.
    Enhance(EnhanceArgs),
}

#[derive(Args)]
struct EnhanceArgs {
    /// Input image files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for the enhanced images.
    #[arg(long)]
    out_dir: PathBuf,

    /// JSON config file (defaults to <config dir>/Memoria/enhance.json if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target aspect ratio as width/height, e.g. 1.778.
    #[arg(long)]
    aspect: Option<f64>,

    /// Keep portrait photos upright.
    #[arg(long)]
    no_rotate: bool,

    /// Skip background analysis and tone correction.
    #[arg(long)]
    no_background: bool,

    /// Skip document detection and cropping.
    #[arg(long)]
    no_edge_crop: bool,

    /// Skip glare suppression.
    #[arg(long)]
    no_glare: bool,

    /// Keep the frame centred instead of following the face.
    #[arg(long)]
    no_center_face: bool,

    /// Keep the source aspect ratio (no crop or zoom).
    #[arg(long)]
    no_zoom: bool,

    /// Remote region detection endpoint. Without one, only the heuristic runs.
    #[arg(long)]
    detector_url: Option<String>,

    /// Remote detection timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_DETECTOR_TIMEOUT_MS)]
    detector_timeout_ms: u64,

    /// Worker threads (default: available parallelism, at most 8).
    #[arg(long)]
    workers: Option<usize>,

    /// Output format: png or jpg.
    #[arg(long, default_value = "png")]
    format: String,

    /// JPEG quality from 1 to 100, used with --format jpg.
    #[arg(
        long,
        default_value_t = DEFAULT_JPEG_QUALITY,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    jpeg_quality: u8,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Enhance(args) => run_enhance(args),
    }
}

fn run_enhance(args: EnhanceArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate(&args)?;

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let reader = ImageFileReader::new();
    let mut sources = Vec::new();
    let mut images = Vec::new();
    for path in &args.inputs {
        match reader.read(path) {
            Ok(image) => {
                sources.push(path.clone());
                images.push(image);
            }
            Err(e) => log::warn!("Skipping {}: {e}", path.display()),
        }
    }
    if images.is_empty() {
        return Err("No decodable input images".into());
    }

    let remote = build_detector(&args)?;
    let executor: Box<dyn BatchExecutor> = match args.workers {
        Some(n) => Box::new(ThreadedBatchExecutor::new(n)),
        None => Box::new(ThreadedBatchExecutor::default()),
    };
    let use_case = EnhanceBatchUseCase::new(remote, executor);
    let mut logger = StdoutPipelineLogger::default();
    let results = use_case.execute(
        images,
        &config,
        Arc::new(AtomicBool::new(false)),
        &mut logger,
    )?;

    let writer = ImageFileWriter::new().with_jpeg_quality(args.jpeg_quality);
    let names = output_names(&sources, &args.format);
    for ((source, name), result) in sources.iter().zip(names).zip(&results) {
        let output = args.out_dir.join(name);
        writer.write(&output, &result.enhanced)?;
        log::info!(
            "{} -> {} ({}x{}{})",
            source.display(),
            output.display(),
            result.metadata.width,
            result.metadata.height,
            if result.metadata.fallback { ", unenhanced" } else { "" }
        );
    }
    Ok(())
}

fn build_detector(
    args: &EnhanceArgs,
) -> Result<Option<Arc<dyn RegionDetector>>, Box<dyn std::error::Error>> {
    let Some(url) = &args.detector_url else {
        log::info!("No detector URL given, using heuristic region finding only");
        return Ok(None);
    };
    let detector =
        HttpRegionDetector::new(url.as_str(), Duration::from_millis(args.detector_timeout_ms))?;
    log::info!("Using remote region detector at {}", detector.endpoint());
    Ok(Some(Arc::new(detector)))
}

/// Explicit path must exist; the default path is optional.
fn load_config(explicit: Option<&Path>) -> Result<EnhancementConfig, Box<dyn std::error::Error>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(EnhancementConfig::default()),
        },
    };
    let text = std::fs::read_to_string(&path)
        .map_err(|e| format!("Cannot read config {}: {e}", path.display()))?;
    let config: EnhancementConfig = serde_json::from_str(&text)
        .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn apply_overrides(config: &mut EnhancementConfig, args: &EnhanceArgs) {
    if let Some(aspect) = args.aspect {
        config.target_aspect_ratio = aspect;
    }
    config.auto_rotate &= !args.no_rotate;
    config.detect_background &= !args.no_background;
    config.edge_crop &= !args.no_edge_crop;
    config.remove_glare &= !args.no_glare;
    config.center_face &= !args.no_center_face;
    config.auto_zoom &= !args.no_zoom;
}

fn validate(args: &EnhanceArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.format != "png" && args.format != "jpg" {
        return Err(format!("Format must be 'png' or 'jpg', got '{}'", args.format).into());
    }
    if args.detector_timeout_ms == 0 {
        return Err("Detector timeout must be positive".into());
    }
    for input in &args.inputs {
        if !is_image(input) {
            log::warn!("{} does not look like an image file", input.display());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// `<stem>_enhanced.<ext>` per source. A stem seen before gets `_2`, `_3`, ...
/// so no output overwrites another; names compare case-insensitively.
fn output_names(sources: &[PathBuf], extension: &str) -> Vec<String> {
    let mut taken = HashSet::new();
    sources
        .iter()
        .map(|source| {
            let stem = source
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("image");
            let mut name = format!("{stem}_enhanced.{extension}");
            let mut index = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{stem}_{index}_enhanced.{extension}");
                index += 1;
            }
            name
        })
        .collect()
}
