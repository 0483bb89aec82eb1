//! Spherical Web Mercator projection and tile geometry.
//!
//! The world is the unit square: x grows east from the antimeridian, y grows
//! south from the northern projection limit. Tile `(z, x, y)` covers
//! `[x / 2^z, (x + 1) / 2^z] × [y / 2^z, (y + 1) / 2^z]`.

use crate::error::{HeatmapError, HeatmapResult};
use crate::types::{TileKey, ZoomLevel};
use std::f64::consts::PI;

/// Default tile edge in pixels.
pub const TILE_SIZE: u32 = 512;
/// Deepest zoom level the engine serves.
pub const MAX_ZOOM: ZoomLevel = 22;
/// Web Mercator latitude limit; points beyond it are projected onto it.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
/// Width of the projected world.
pub const WORLD_WIDTH: f64 = 1.0;

/// Position in the projected unit square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn shifted_x(self, dx: f64) -> Self {
        Self::new(self.x + dx, self.y)
    }
}

/// Axis-aligned box in world coordinates (inclusive on all edges).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl WorldBounds {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Smallest box holding every point, `None` when the iterator is empty.
    pub fn enclosing<I: IntoIterator<Item = WorldPoint>>(points: I) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self::new(p.x, p.x, p.y, p.y),
                Some(b) => Self::new(b.min_x.min(p.x), b.max_x.max(p.x), b.min_y.min(p.y), b.max_y.max(p.y)),
            })
        })
    }

    /// Grow every edge outward by `padding`.
    pub fn expand(&self, padding: f64) -> Self {
        Self::new(
            self.min_x - padding,
            self.max_x + padding,
            self.min_y - padding,
            self.max_y + padding,
        )
    }

    pub fn contains(&self, p: WorldPoint) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn intersects(&self, other: &WorldBounds) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Latitude/longitude rectangle, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// Project a coordinate into the world square.
pub fn project(latitude: f64, longitude: f64) -> WorldPoint {
    let x = longitude / 360.0 + 0.5;
    let siny = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians().sin();
    let y = 0.5 * ((1.0 + siny) / (1.0 - siny)).ln() / -(2.0 * PI) + 0.5;
    WorldPoint::new(x, y)
}

/// Inverse of [`project`]; returns `(latitude, longitude)`.
pub fn unproject(point: WorldPoint) -> (f64, f64) {
    let longitude = (point.x - 0.5) * 360.0;
    let latitude = 2.0 * ((0.5 - point.y) * 2.0 * PI).exp().atan().to_degrees() - 90.0;
    (latitude, longitude)
}

impl TileKey {
    /// Reject zooms past [`MAX_ZOOM`] and coordinates outside the pyramid.
    pub fn validate(&self) -> HeatmapResult<()> {
        if self.zoom > MAX_ZOOM {
            return Err(HeatmapError::InvalidTile(*self));
        }
        let n = self.tiles_per_axis();
        if self.x as u64 >= n || self.y as u64 >= n {
            return Err(HeatmapError::InvalidTile(*self));
        }
        Ok(())
    }

    /// Tile holding a coordinate at `zoom` (capped at [`MAX_ZOOM`]).
    pub fn containing(latitude: f64, longitude: f64, zoom: ZoomLevel) -> Self {
        let zoom = zoom.min(MAX_ZOOM);
        let n = (1u64 << zoom) as f64;
        let p = project(latitude, longitude);
        let last = n - 1.0;
        let x = (p.x * n).floor().clamp(0.0, last) as u32;
        let y = (p.y * n).floor().clamp(0.0, last) as u32;
        TileKey::new(zoom, x, y)
    }

    pub fn world_bounds(&self) -> WorldBounds {
        let width = WORLD_WIDTH / self.tiles_per_axis() as f64;
        let min_x = self.x as f64 * width;
        let min_y = self.y as f64 * width;
        WorldBounds::new(min_x, min_x + width, min_y, min_y + width)
    }

    pub fn geo_bounds(&self) -> GeoBounds {
        let b = self.world_bounds();
        let (north, west) = unproject(WorldPoint::new(b.min_x, b.min_y));
        let (south, east) = unproject(WorldPoint::new(b.max_x, b.max_y));
        GeoBounds {
            south,
            west,
            north,
            east,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_projection_landmarks() {
        let origin = project(0.0, 0.0);
        assert!(close(origin.x, 0.5) && close(origin.y, 0.5));

        let west = project(0.0, -180.0);
        assert!(close(west.x, 0.0));

        let north = project(MAX_LATITUDE, 0.0);
        assert!(north.y.abs() < 1e-9);

        // Poles clamp to the projection limit instead of diverging.
        let pole = project(90.0, 0.0);
        assert!(pole.y.is_finite());
        assert!(close(pole.y, north.y));
    }

    #[test]
    fn test_projection_inverse() {
        for &(lat, lng) in &[(0.0, 0.0), (51.5, -0.12), (-33.9, 151.2), (70.0, 179.0)] {
            let (lat2, lng2) = unproject(project(lat, lng));
            assert!((lat - lat2).abs() < 1e-7, "lat {} -> {}", lat, lat2);
            assert!((lng - lng2).abs() < 1e-7, "lng {} -> {}", lng, lng2);
        }
    }

    #[test]
    fn test_tile_geometry() {
        let key = TileKey::containing(0.0, 0.0, 10);
        assert_eq!(key, TileKey::new(10, 512, 512));

        let b = key.world_bounds();
        assert!(close(b.min_x, 0.5) && close(b.width(), 1.0 / 1024.0));

        let geo = TileKey::new(0, 0, 0).geo_bounds();
        assert!(close(geo.west, -180.0) && close(geo.east, 180.0));
        assert!((geo.north - MAX_LATITUDE).abs() < 1e-6);

        // Eastern edge of the world stays inside the pyramid.
        assert_eq!(TileKey::containing(0.0, 180.0, 2).x, 3);
    }

    #[test]
    fn test_tile_validation() {
        assert!(TileKey::new(3, 7, 7).validate().is_ok());
        assert!(TileKey::new(3, 8, 0).validate().is_err());
        assert!(TileKey::new(MAX_ZOOM + 1, 0, 0).validate().is_err());
    }

    #[test]
    fn test_bounds_helpers() {
        let b = WorldBounds::enclosing(vec![WorldPoint::new(0.2, 0.4), WorldPoint::new(0.1, 0.9)]).unwrap();
        assert_eq!(b, WorldBounds::new(0.1, 0.2, 0.4, 0.9));
        assert!(b.contains(WorldPoint::new(0.2, 0.9)));
        assert!(!b.contains(WorldPoint::new(0.21, 0.9)));
        assert!(b.expand(0.05).contains(WorldPoint::new(0.21, 0.9)));
        assert!(b.intersects(&WorldBounds::new(0.2, 0.3, 0.0, 0.4)));
        assert!(WorldBounds::enclosing(Vec::<WorldPoint>::new()).is_none());
    }
}
