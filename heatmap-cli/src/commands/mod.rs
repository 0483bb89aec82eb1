//! Command implementations for the heatmap CLI

pub mod locate;
pub mod render;
pub mod render_area;

use anyhow::{Context, Result};
use heatmap_core::{Bitmap, OverlayId, OverlayRegistry, TileKey, ZoomLevel};
use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, StyleOverrides};
use crate::error::{CliError, CliResult};
use crate::points::load_points;
use crate::surface::LogSurface;

/// Tile addressed either by coordinates or by a location inside it.
pub fn resolve_key(
    zoom: ZoomLevel,
    x: Option<u32>,
    y: Option<u32>,
    lat: Option<f64>,
    lng: Option<f64>,
) -> CliResult<TileKey> {
    match (x, y, lat, lng) {
        (Some(x), Some(y), None, None) => Ok(TileKey::new(zoom, x, y)),
        (None, None, Some(lat), Some(lng)) => Ok(TileKey::containing(lat, lng, zoom)),
        _ => Err(CliError::validation("give either --x and --y, or --lat and --lng")),
    }
}

/// Load points and register one overlay with the CLI surface.
pub fn open_overlay(config: &Config, points: &Path, overrides: &StyleOverrides) -> Result<(OverlayRegistry, OverlayId)> {
    let heatmap = config.heatmap_config(overrides)?;
    let points = load_points(points)?;

    let registry = OverlayRegistry::new(Arc::new(LogSurface::new()));
    let id = registry
        .add(points, heatmap)
        .map_err(CliError::from)
        .context("Failed to build heatmap overlay")?;
    Ok((registry, id))
}

pub fn write_tile(bitmap: &Bitmap, path: &Path) -> Result<()> {
    let png = bitmap.encode_png().map_err(CliError::from)?;
    std::fs::write(path, png).with_context(|| format!("Failed to write tile: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_key() {
        assert_eq!(resolve_key(4, Some(3), Some(5), None, None).unwrap(), TileKey::new(4, 3, 5));
        assert_eq!(
            resolve_key(10, None, None, Some(0.0), Some(0.0)).unwrap(),
            TileKey::new(10, 512, 512)
        );
        assert!(resolve_key(10, Some(1), None, None, None).is_err());
        assert!(resolve_key(10, Some(1), Some(1), Some(0.0), Some(0.0)).is_err());
    }
}
