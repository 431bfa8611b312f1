//! docuscan CLI — detect document boundaries and produce rectified output.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use docuscan::{
    CurvaturePoint, DetectConfig, DetectionResult, Detector, Point2D, Quadrilateral, WarpConfig,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "docuscan")]
#[command(about = "Detect document boundaries in images and produce de-skewed output")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the document boundary in an image.
    Detect(DetectArgs),

    /// Rectify with explicit corner coordinates, bypassing detection.
    Warp(WarpArgs),
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the detection result (JSON). Prints to stdout if omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also rectify the detected region and write the image here.
    #[arg(long)]
    warp: Option<PathBuf>,

    /// Rectified output width in pixels.
    #[arg(long, default_value = "1000")]
    width: u32,

    /// Rectified output height in pixels.
    #[arg(long, default_value = "1414")]
    height: u32,

    /// Cap on the larger frame dimension during detection.
    #[arg(long, default_value = "500")]
    max_dimension: u32,

    /// Maximum accepted quadrilateral aspect ratio.
    #[arg(long, default_value = "5.0")]
    max_aspect_ratio: f64,

    /// Curvature weight when refining corners before the warp (0 disables).
    #[arg(long, default_value = "0.3")]
    corner_blend: f64,
}

#[derive(Debug, Clone, Args)]
struct WarpArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the rectified image.
    #[arg(long)]
    out: PathBuf,

    /// Eight comma-separated corner coordinates: x1,y1,x2,y2,x3,y3,x4,y4
    /// (any corner order; they are canonically re-ordered).
    #[arg(long, value_delimiter = ',', num_args = 8, allow_hyphen_values = true)]
    corners: Vec<f64>,

    /// Rectified output width in pixels.
    #[arg(long, default_value = "1000")]
    width: u32,

    /// Rectified output height in pixels.
    #[arg(long, default_value = "1414")]
    height: u32,
}

fn run_detect(args: &DetectArgs) -> CliResult<()> {
    let image = image::open(&args.image)?;

    let mut config = DetectConfig::default();
    config.preprocess.max_dimension = args.max_dimension;
    config.contour.max_aspect_ratio = args.max_aspect_ratio;
    config.warp.corner_blend = args.corner_blend;
    let detector = Detector::with_config(config);

    let result = detector.detect(&image);
    match &result {
        DetectionResult::Detected { vertices, .. } => {
            tracing::info!(
                "document detected: tl=({:.1}, {:.1}) br=({:.1}, {:.1})",
                vertices.top_left().x,
                vertices.top_left().y,
                vertices.bottom_right().x,
                vertices.bottom_right().y,
            );
        }
        DetectionResult::NotDetected => tracing::info!("no document detected"),
    }

    let json = serde_json::to_string_pretty(&result)?;
    match &args.out {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }

    if let Some(warp_path) = &args.warp {
        let DetectionResult::Detected { vertices, curvature } = &result else {
            return Err("cannot warp: no document detected".into());
        };
        let rectified = detector.rectify(&image, vertices, curvature, args.width, args.height)?;
        rectified.save(warp_path)?;
        tracing::info!("rectified image written to {}", warp_path.display());
    }
    Ok(())
}

fn run_warp(args: &WarpArgs) -> CliResult<()> {
    let image = image::open(&args.image)?;

    let corners: [Point2D; 4] = [
        Point2D::new(args.corners[0], args.corners[1]),
        Point2D::new(args.corners[2], args.corners[3]),
        Point2D::new(args.corners[4], args.corners[5]),
        Point2D::new(args.corners[6], args.corners[7]),
    ];
    let quad = Quadrilateral::ordered(corners);
    // Manual corners carry no curvature information: midpoints, blend off.
    let curvature = CurvaturePoint::midpoints(&quad);
    let config = WarpConfig { corner_blend: 0.0 };

    let rectified = docuscan::rectify(&image, &quad, &curvature, args.width, args.height, &config)?;
    rectified.save(&args.out)?;
    tracing::info!("rectified image written to {}", args.out.display());
    Ok(())
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Detect(args) => run_detect(args),
        Commands::Warp(args) => run_warp(args),
    }
}
