use anyhow::{Context, Result};
use clap::Parser;
use pavement_area::input::{FileSource, ImageSource};
use pavement_area::output::{JsonReport, OverlayWriter, ResultSink};
use pavement_area::pipeline::{AreaPipeline, PipelineConfig};
use pavement_area::{segmentation, PixelsPerFoot};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image of the paved surface (photo or orthophoto)
    image: PathBuf,

    /// Image scale in pixels per foot
    /// If not provided, region areas are reported as unknown
    #[arg(long, env = "PIXELS_PER_FOOT")]
    pixels_per_foot: Option<f64>,

    /// Path to segmentation model (ONNX file)
    /// If not provided, uses classical intensity-based extraction
    #[arg(long, env = "ASPHALT_MODEL_PATH")]
    model: Option<PathBuf>,

    /// Polygon simplification tolerance, percent of perimeter
    #[arg(long, default_value_t = 2.0)]
    epsilon: f64,

    /// Regions smaller than this many square pixels are discarded
    #[arg(long, default_value_t = 1000.0)]
    min_region_area: f64,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save an image with region outlines drawn over the input
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("pavement-area starting");

    let scale = args
        .pixels_per_foot
        .map(PixelsPerFoot::new)
        .transpose()
        .context("Invalid --pixels-per-foot")?;
    match scale {
        Some(ppf) => tracing::info!("Scale: {} px/ft", ppf.get()),
        None => tracing::info!("No scale given, real-world areas will be unknown"),
    }

    let mut source = FileSource::new(&args.image);
    let image = source
        .load()
        .with_context(|| format!("Failed to load {}", source.describe()))?;
    tracing::info!("Image: {}x{}", image.width(), image.height());

    let mut segmenter = segmentation::load_segmenter(args.model.as_ref());
    tracing::info!("Learned segmenter: {}", segmenter.name());

    let pipeline = AreaPipeline::new(PipelineConfig {
        epsilon_ratio: args.epsilon,
        min_region_area_px: args.min_region_area,
        ..PipelineConfig::default()
    });

    let start = Instant::now();
    let result = pipeline
        .measure(&image, &mut segmenter, scale)
        .context("Failed to measure pavement")?;
    tracing::info!(
        "Measurement took {:.1}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    let mut sinks: Vec<Box<dyn ResultSink>> = Vec::new();
    match &args.output {
        Some(path) => sinks.push(Box::new(JsonReport::create(path)?)),
        None => sinks.push(Box::new(JsonReport::new(std::io::stdout().lock()))),
    }
    if let Some(path) = &args.overlay {
        sinks.push(Box::new(OverlayWriter::new(path)));
    }

    for sink in &mut sinks {
        sink.write_result(&image, &result)?;
    }

    Ok(())
}
