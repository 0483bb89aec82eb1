//! Heatmap Core Library
//!
//! Spatial index, density rasterizer, tile cache and overlay controller for
//! serving heatmap layers to a slippy-map surface.

pub mod types;
pub mod error;
pub mod coords;
pub mod gradient;
pub mod bitmap;
pub mod config;
pub mod index;
pub mod intensity;
pub mod raster;
pub mod cache;
pub mod surface;
pub mod overlay;
pub mod registry;

// Re-export commonly used types and functions
pub use types::{Epoch, OverlayId, Rgba, TileKey, WeightedPoint, ZoomLevel};
pub use error::{HeatmapError, HeatmapResult};
pub use coords::{project, unproject, GeoBounds, WorldBounds, WorldPoint, MAX_ZOOM, TILE_SIZE};
pub use gradient::{ColorMap, ColorStop, Gradient, MAX_COLOR_MAP_SIZE};
pub use bitmap::Bitmap;
pub use config::{HeatmapConfig, HeatmapUpdate, MaxIntensity, MAX_RADIUS, MIN_RADIUS};
pub use index::SpatialIndex;
pub use raster::DensityRasterizer;
pub use cache::{CacheStats, RenderedTile, TileCache};
pub use surface::{MapSurface, NullSurface, SurfaceHandle};
pub use overlay::{HeatmapOverlay, RenderSnapshot};
pub use registry::OverlayRegistry;

/// Version information for the heatmap core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
