//! Locate command implementation - tile holding a coordinate

use anyhow::{Context, Result};
use heatmap_core::{TileKey, ZoomLevel};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Location {
    pub tile: TileKey,
    pub path: String,
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

pub fn locate(lat: f64, lng: f64, zoom: ZoomLevel) -> Location {
    let tile = TileKey::containing(lat, lng, zoom);
    let bounds = tile.geo_bounds();
    Location {
        tile,
        path: tile.to_string(),
        south: bounds.south,
        west: bounds.west,
        north: bounds.north,
        east: bounds.east,
    }
}

pub fn execute(lat: f64, lng: f64, zoom: ZoomLevel, json: bool) -> Result<()> {
    let location = locate(lat, lng, zoom);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&location).context("Failed to serialize location")?
        );
    } else {
        println!(
            "{}  (lat {:.6}..{:.6}, lng {:.6}..{:.6})",
            location.path, location.south, location.north, location.west, location.east
        );
    }
    Ok(())
}
