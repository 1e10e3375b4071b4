use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use tripmap::{GeoPoint, MapConfig, MapMode, MapSpecial, OsmMapProvider, StaticMapProvider};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the tile cache directory, overrides the config file
    #[arg(short, long)]
    cache_dir: Option<PathBuf>,

    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RenderArgs {
    /// Output image, the format follows the extension
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Render with the dark color filter
    #[arg(long)]
    dark: bool,
}

impl RenderArgs {
    fn mode(&self) -> MapMode {
        if self.dark { MapMode::Dark } else { MapMode::Normal }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render a trip from a JSON array of {"lat", "lng"} points
    Trip {
        #[arg(short, long)]
        points: PathBuf,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Render a charging stop
    Charging {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Render a parking spot
    Parking {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Clear the tile cache
    ClearCache,
}

fn read_points(path: &Path) -> Result<Vec<GeoPoint>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trip file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse trip file {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MapConfig::load(path)?,
        None => MapConfig::default(),
    };
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = cache_dir;
    }

    let provider = OsmMapProvider::from_config(&config).context("Failed to create map provider")?;

    match &cli.command {
        Commands::Trip { points, render } => {
            let points = read_points(points)?;
            info!("Rendering trip with {} points", points.len());
            provider
                .create_trip_map(
                    &points,
                    render.width,
                    render.height,
                    render.mode(),
                    MapSpecial::None,
                    &render.output,
                )
                .context("Failed to create trip map")?;
        }

        Commands::Charging { lat, lng, render } => {
            provider
                .create_charging_map(
                    GeoPoint::new(*lat, *lng),
                    render.width,
                    render.height,
                    render.mode(),
                    MapSpecial::None,
                    &render.output,
                )
                .context("Failed to create charging map")?;
        }

        Commands::Parking { lat, lng, render } => {
            provider
                .create_parking_map(
                    GeoPoint::new(*lat, *lng),
                    render.width,
                    render.height,
                    render.mode(),
                    MapSpecial::None,
                    &render.output,
                )
                .context("Failed to create parking map")?;
        }

        Commands::ClearCache => {
            info!("Clearing cache");
            provider.cache().clear().context("Failed to clear cache")?;
            info!("Cache cleared");
        }
    }

    Ok(())
}
