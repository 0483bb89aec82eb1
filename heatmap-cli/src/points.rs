//! Point data loading

use heatmap_core::WeightedPoint;
use serde::Deserialize;
use std::path::Path;

use crate::error::{CliError, CliResult};

/// A bare array of points, or an object carrying them under `data`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PointsDocument {
    Bare(Vec<WeightedPoint>),
    Wrapped { data: Vec<WeightedPoint> },
}

/// Read points from a JSON file. Range checks happen when the overlay is built.
pub fn load_points(path: &Path) -> CliResult<Vec<WeightedPoint>> {
    if !path.exists() {
        return Err(CliError::file_not_found(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let points = parse_points(&content).map_err(|e| CliError::parse(path.display().to_string(), e))?;
    log::info!("Loaded {} points from {}", points.len(), path.display());
    Ok(points)
}

fn parse_points(content: &str) -> Result<Vec<WeightedPoint>, String> {
    let document: PointsDocument = serde_json::from_str(content).map_err(|e| e.to_string())?;
    Ok(match document {
        PointsDocument::Bare(points) => points,
        PointsDocument::Wrapped { data } => data,
    })
}
