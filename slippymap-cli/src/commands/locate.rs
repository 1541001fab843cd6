//! `locate` command: where a coordinate lands on the tile grid.

use clap::Args;
use slippymap::config::ConfigFile;
use slippymap::coord::{self, MAX_ZOOM, MIN_ZOOM};

use super::CoordinateArgs;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct LocateArgs {
    #[command(flatten)]
    pub coordinate: CoordinateArgs,

    /// Zoom level
    #[arg(long, default_value_t = 14, value_parser = clap::value_parser!(u8).range(i64::from(MIN_ZOOM)..=i64::from(MAX_ZOOM)))]
    pub zoom: u8,
}

pub fn run(args: LocateArgs, config: &ConfigFile) -> Result<(), CliError> {
    let point = args.coordinate.coordinate()?;
    let zoom = args.zoom;

    let world = coord::to_world_point(point);
    let position = coord::geo_to_screen(point, zoom);
    let address = coord::tile_address(world, zoom);
    let visible = coord::visible_tile(position, zoom);

    println!("Coordinate:    {}", point);
    println!("Zoom:          {}", zoom);
    println!("World point:   ({:.6}, {:.6})", world.x, world.y);
    println!("Layer point:   ({:.3}, {:.3})", position.x, position.y);
    println!("Tile:          {}", address);
    println!("Visible tile:  {}", visible);
    println!("Bundle name:   {}", address.bundle_name());
    println!("URL:           {}", config.tiles.url_template.url_for(address));

    Ok(())
}
