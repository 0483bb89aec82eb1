//! Error types for the heatmap engine

use crate::types::{OverlayId, TileKey};
use thiserror::Error;

/// Errors returned by the index, overlays and registry.
///
/// Every variant is recoverable: a rejected command leaves the engine in its
/// previous state.
#[derive(Debug, Error)]
pub enum HeatmapError {
    /// A point in a data set is malformed. The whole data set is rejected.
    #[error("Invalid point at index {index}: {message}")]
    InvalidInput { index: usize, message: String },

    /// A radius, gradient, opacity, max intensity or tile size is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tile {0} is outside the tile pyramid")]
    InvalidTile(TileKey),

    #[error("Overlay not found: {0}")]
    NotFound(OverlayId),

    #[error("Overlay {0} has been removed")]
    OverlayRemoved(OverlayId),

    #[cfg(feature = "png")]
    #[error("PNG encoding error: {0}")]
    Encode(#[from] image::ImageError),
}

impl HeatmapError {
    pub fn invalid_input<S: Into<String>>(index: usize, message: S) -> Self {
        Self::InvalidInput {
            index,
            message: message.into(),
        }
    }

    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type for heatmap operations
pub type HeatmapResult<T> = Result<T, HeatmapError>;
