//! `zoom` command: trace a zoom transition and check the camera point
//! survives it.

use clap::Args;
use slippymap::config::ConfigFile;
use slippymap::coord::Size;
use slippymap::map::MapView;

use super::CoordinateArgs;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ZoomArgs {
    #[command(flatten)]
    pub coordinate: CoordinateArgs,

    /// Scale to centre the map at
    #[arg(long)]
    pub from: f64,

    /// Scale to zoom to
    #[arg(long)]
    pub to: f64,

    /// Print the resulting draw list as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ZoomArgs, config: &ConfigFile) -> Result<(), CliError> {
    let point = args.coordinate.coordinate()?;
    let viewport = Size::new(config.map.viewport_width, config.map.viewport_height);

    let mut view = MapView::new(viewport);
    view.move_to(point, args.from);
    let before = view.camera_coordinate();

    let transition = view.set_scale(args.to);
    let after = view.camera_coordinate();

    if args.json {
        let output = serde_json::to_string_pretty(&view.draw_list())
            .map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", output);
        return Ok(());
    }

    println!("Start:         {} at scale {:.2}", before, args.from);
    match &transition {
        Some(t) => {
            println!("Transition:    zoom {} -> {}", t.from, t.to);
            println!("Anchor:        ({:.9}, {:.9})", t.anchor.x, t.anchor.y);
            println!("Visible tile:  {}", t.visible_tile);
            println!("Camera:        ({:.3}, {:.3})", t.camera.x, t.camera.y);
            println!("Released:      {} loading tiles", t.released.len());
        }
        None => println!("Transition:    none, zoom stays {}", view.zoom()),
    }
    println!("Scale:         {:.2}", view.scale());
    println!("Camera scale:  {:.6}", view.camera_scale());
    println!("End:           {}", after);
    println!("Drift:         {:.3} m", before.distance_m(&after));

    Ok(())
}
