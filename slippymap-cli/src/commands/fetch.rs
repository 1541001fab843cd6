//! `fetch` command: run one visible-tile pass and save the tiles as PNG.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use slippymap::config::ConfigFile;
use slippymap::coord::{Size, TileAddress, DISTRICT_ZOOM};
use slippymap::loader::{LoaderConfig, TileLoader};
use slippymap::map::{MapEngine, MapEvent};
use slippymap::tile::TileImage;
use tracing::{info, warn};

use super::CoordinateArgs;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub coordinate: CoordinateArgs,

    /// Map scale; rounds to the zoom level fetched
    #[arg(long, default_value_t = DISTRICT_ZOOM)]
    pub scale: f64,

    /// Directory to write `{x}-{y}-{z}.png` files into
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Seconds to wait for the whole pass
    #[arg(long, default_value_t = 30)]
    pub wait: u64,
}

/// Tiles written and tiles that could not be loaded.
#[derive(Debug, Default, PartialEq, Eq)]
struct FetchSummary {
    written: usize,
    failed: usize,
}

pub fn run(args: FetchArgs, config: &ConfigFile) -> Result<(), CliError> {
    let point = args.coordinate.coordinate()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let summary = runtime.block_on(async {
        let loader = TileLoader::new(LoaderConfig::from_config_file(config))?;
        let viewport = Size::new(config.map.viewport_width, config.map.viewport_height);
        let mut engine = MapEngine::new(loader, viewport);

        engine.move_to(point, args.scale);
        info!(
            zoom = engine.view().zoom(),
            pending = engine.pending(),
            "Fetching visible tiles"
        );

        let failed = wait_for_tiles(&mut engine, Duration::from_secs(args.wait)).await;

        std::fs::create_dir_all(&args.out).map_err(|e| CliError::WriteTile {
            path: args.out.clone(),
            message: e.to_string(),
        })?;

        let mut written = 0;
        for placement in engine.draw_list().tiles {
            if let Some(image) = placement.image {
                write_tile(&args.out, placement.address, &image)?;
                written += 1;
            }
        }

        println!("{}", engine.loader().telemetry());
        Ok::<_, CliError>(FetchSummary { written, failed })
    })?;

    println!(
        "Wrote {} tiles to {} ({} failed)",
        summary.written,
        args.out.display(),
        summary.failed
    );
    Ok(())
}

/// Apply results until nothing is pending or `wait` elapses. Returns the
/// number of failed tiles.
async fn wait_for_tiles(engine: &mut MapEngine, wait: Duration) -> usize {
    let progress = ProgressBar::new(engine.pending() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:30}] {pos}/{len} tiles {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut failed = 0;
    let deadline = tokio::time::Instant::now() + wait;

    loop {
        let event = match tokio::time::timeout_at(deadline, engine.next_event()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => {
                warn!(pending = engine.pending(), "Gave up waiting for tiles");
                break;
            }
        };

        match event {
            MapEvent::TileLoaded(address) => progress.set_message(address.to_string()),
            MapEvent::TileFailed { address, error } => {
                failed += 1;
                warn!(tile = %address, error = %error, "Tile failed");
            }
            MapEvent::TileDiscarded(_) => {}
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    failed
}

fn tile_path(dir: &Path, address: TileAddress) -> PathBuf {
    dir.join(format!("{}.png", address.bundle_name()))
}

fn write_tile(dir: &Path, address: TileAddress, image: &TileImage) -> Result<(), CliError> {
    let path = tile_path(dir, address);
    image
        .pixels()
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(|e| CliError::WriteTile {
            path: path.clone(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use tempfile::TempDir;

    #[test]
    fn test_tile_path_uses_bundle_name() {
        let path = tile_path(Path::new("/tmp/out"), TileAddress::new(619, 320, 10));
        assert_eq!(path, PathBuf::from("/tmp/out/619-320-10.png"));
    }

    #[test]
    fn test_write_tile() {
        let dir = TempDir::new().unwrap();
        let address = TileAddress::new(1, 2, 3);
        write_tile(dir.path(), address, &TileImage::new(RgbaImage::new(2, 2))).unwrap();

        let written = image::open(tile_path(dir.path(), address)).unwrap();
        assert_eq!(written.width(), 2);
    }
}
