//! Slippymap - Web-Mercator tile engine
//!
//! Core of a slippy map for a small-screen client: geographic projection,
//! tile addressing, an asynchronous tile loader with bounded in-flight
//! requests, memory and disk caches, and the zoom-continuity logic that keeps
//! the visible tile and camera in step while the user zooms.
//!
//! Rendering is left to the caller. [`map::MapView::draw_list`] produces
//! placed tiles, route runs and markers in screen space.
//!
//! ```no_run
//! use slippymap::coord::{GeoCoordinate, Size};
//! use slippymap::loader::{LoaderConfig, TileLoader};
//! use slippymap::map::MapEngine;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = TileLoader::new(LoaderConfig::default())?;
//! let mut engine = MapEngine::new(loader, Size::new(184.0, 224.0));
//!
//! engine.set_current_location(GeoCoordinate::new(55.7539, 37.6208));
//! engine.load_visible_tiles();
//! while let Some(event) = engine.next_event().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod loader;
pub mod logging;
pub mod map;
pub mod provider;
pub mod session;
pub mod tile;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use coord::{GeoCoordinate, TileAddress};
pub use loader::{TileError, TileLoader};
pub use map::{MapEngine, MapView};
pub use tile::{TileImage, TileRequest};
