//! CLI command implementations.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod locate;
pub mod zoom;

use clap::Args;
use slippymap::coord::{GeoCoordinate, MAX_LATITUDE};

use crate::error::CliError;

/// Latitude and longitude in degrees.
#[derive(Debug, Clone, Args)]
pub struct CoordinateArgs {
    /// Latitude in degrees, north positive
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees, east positive
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
}

impl CoordinateArgs {
    /// Validate the pair against the Web-Mercator range.
    pub fn coordinate(&self) -> Result<GeoCoordinate, CliError> {
        if !self.lat.is_finite() || self.lat.abs() > MAX_LATITUDE {
            return Err(CliError::InvalidArgument(format!(
                "latitude {} is outside ±{}",
                self.lat, MAX_LATITUDE
            )));
        }
        if !self.lon.is_finite() || self.lon.abs() > 180.0 {
            return Err(CliError::InvalidArgument(format!(
                "longitude {} is outside ±180",
                self.lon
            )));
        }
        Ok(GeoCoordinate::new(self.lat, self.lon))
    }
}
