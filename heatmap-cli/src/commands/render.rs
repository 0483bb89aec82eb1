//! Render command implementation - one tile to PNG

use anyhow::Result;
use heatmap_core::TileKey;
use std::path::{Path, PathBuf};

use super::{open_overlay, write_tile};
use crate::config::{Config, StyleOverrides};
use crate::error::CliError;

pub fn execute(config: &Config, points: &Path, key: TileKey, out: PathBuf, overrides: &StyleOverrides) -> Result<()> {
    log::info!("Rendering tile {} from {}", key, points.display());

    let (registry, id) = open_overlay(config, points, overrides)?;
    let tile = registry
        .request_tile(id, key.zoom, key.x, key.y)
        .map_err(CliError::from)?;

    write_tile(&tile, &out)?;

    log::info!(
        "Wrote {} ({}x{}, {} colored pixels, checksum {:016x})",
        out.display(),
        tile.width(),
        tile.height(),
        tile.opaque_pixel_count(),
        tile.checksum()
    );
    if tile.is_transparent() {
        log::warn!("Tile {} has no points within reach; the image is fully transparent", key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatmap_core::HeatmapError;
    use tempfile::TempDir;

    fn write_points(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("points.json");
        std::fs::write(&path, "[[0.0, 0.0, 1.0], [0.01, 0.01]]").unwrap();
        path
    }

    #[test]
    fn test_render_writes_png() {
        let dir = TempDir::new().unwrap();
        let points = write_points(&dir);
        let out = dir.path().join("tile.png");
        let overrides = StyleOverrides {
            tile_size: Some(64),
            ..Default::default()
        };

        execute(&Config::default(), &points, TileKey::new(10, 512, 512), out.clone(), &overrides).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_render_rejects_out_of_range_tile() {
        let dir = TempDir::new().unwrap();
        let points = write_points(&dir);
        let err = execute(
            &Config::default(),
            &points,
            TileKey::new(2, 9, 0),
            dir.path().join("tile.png"),
            &StyleOverrides::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::Heatmap(HeatmapError::InvalidTile(_)))
        ));
    }
}
