//! Render-area command implementation - the block of tiles around a location
//!
//! Tiles are requested from one overlay in parallel, the way a map surface
//! fetching a viewport would.

use anyhow::{Context, Result};
use heatmap_core::{TileKey, ZoomLevel};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use super::{open_overlay, write_tile};
use crate::config::{Config, StyleOverrides};
use crate::error::CliError;

/// Keys within `span` tiles of `center`, clipped to the pyramid.
pub fn area_keys(center: TileKey, span: u32) -> Vec<TileKey> {
    let last = center.tiles_per_axis().saturating_sub(1);
    let range = |c: u32| {
        let lo = (c as u64).saturating_sub(span as u64);
        let hi = (c as u64 + span as u64).min(last);
        lo..=hi
    };

    range(center.y)
        .flat_map(|y| range(center.x).map(move |x| TileKey::new(center.zoom, x as u32, y as u32)))
        .collect()
}

pub fn tile_file_name(key: TileKey) -> String {
    format!("{}_{}_{}.png", key.zoom, key.x, key.y)
}

#[allow(clippy::too_many_arguments)]
pub fn execute(
    config: &Config,
    points: &Path,
    lat: f64,
    lng: f64,
    zoom: ZoomLevel,
    span: Option<u32>,
    out_dir: Option<PathBuf>,
    overrides: &StyleOverrides,
) -> Result<Vec<PathBuf>> {
    let span = span.unwrap_or(config.output.span);
    let out_dir = out_dir.unwrap_or_else(|| config.output.directory.clone());
    let keys = area_keys(TileKey::containing(lat, lng, zoom), span);
    log::info!(
        "Rendering {} tiles around ({}, {}) at zoom {} into {}",
        keys.len(),
        lat,
        lng,
        zoom,
        out_dir.display()
    );

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let (registry, id) = open_overlay(config, points, overrides)?;
    let overlay = registry.lookup(id).map_err(CliError::from)?;

    let written = keys
        .par_iter()
        .map(|&key| -> Result<(PathBuf, bool)> {
            let tile = overlay.request_tile(key).map_err(CliError::from)?;
            let path = out_dir.join(tile_file_name(key));
            write_tile(&tile, &path)?;
            log::debug!("Wrote {}", path.display());
            Ok((path, !tile.is_transparent()))
        })
        .collect::<Result<Vec<_>>>()?;

    let colored = written.iter().filter(|(_, colored)| *colored).count();
    let stats = overlay.cache_stats();
    log::info!(
        "Wrote {} tiles ({} with heat), cache: {}",
        written.len(),
        colored,
        serde_json::to_string(&stats).context("Failed to serialize cache statistics")?
    );

    Ok(written.into_iter().map(|(path, _)| path).collect())
}
