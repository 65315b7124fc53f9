//! mosaic - command-line front end
//!
//! Reads a raster image, builds its mosaic against the tile service and
//! writes the resulting SVG document.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use mosaic_client::{MosaicPipeline, PipelineConfig, SvgDocument};
use mosaic_common::config::{load_config, resolve_service_url};
use mosaic_common::logging::init_tracing;
use tracing::{error, info};

/// Command-line arguments for mosaic
#[derive(Parser, Debug)]
#[command(name = "mosaic")]
#[command(about = "Render an image as an SVG mosaic of service-provided tiles")]
#[command(version)]
struct Args {
    /// Source image (PNG, JPEG, GIF or BMP)
    image: PathBuf,

    /// Destination SVG file
    output: PathBuf,

    /// Tile service base URL (overrides MOSAIC_SERVICE_URL and config file)
    #[arg(long)]
    service_url: Option<String>,

    /// Tile width in pixels
    #[arg(long)]
    tile_width: Option<u32>,

    /// Tile height in pixels
    #[arg(long)]
    tile_height: Option<u32>,

    /// Per-tile fetch timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Configuration file (default: platform config dir/svg-mosaic/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(width) = args.tile_width {
        config.tiles.width = width;
    }
    if let Some(height) = args.tile_height {
        config.tiles.height = height;
    }
    if let Some(secs) = args.timeout_secs {
        config.fetch.timeout_secs = secs;
    }
    config.validate().context("Invalid configuration")?;

    // Held until exit so the log file writer flushes
    let _logging = init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!("Starting svg-mosaic v{}", env!("CARGO_PKG_VERSION"));

    let service_url = resolve_service_url(args.service_url.as_deref(), &config)?;

    let image = image::open(&args.image)
        .with_context(|| format!("Failed to read image {}", args.image.display()))?
        .to_rgba8();
    info!(
        "Loaded {} ({}x{})",
        args.image.display(),
        image.width(),
        image.height()
    );

    let pipeline = MosaicPipeline::new(PipelineConfig::from_toml(&config, service_url))
        .context("Failed to initialize mosaic pipeline")?;

    let mut document = SvgDocument::new();
    let run = match pipeline.run(&image, &mut document).await {
        Ok(run) => run,
        Err(e) => {
            error!("Mosaic failed: {}", e);
            return Err(e.into());
        }
    };

    write_output(&args.output, &document.to_svg_string())?;
    info!(
        "✓ Wrote {} rows to {} (run {})",
        run.rows_rendered,
        args.output.display(),
        run.run_id
    );

    Ok(())
}

fn write_output(path: &Path, svg: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, svg).with_context(|| format!("Failed to write {}", path.display()))
}
