//! R-tree over projected points.

use crate::coords::{project, WorldBounds, WorldPoint, WORLD_WIDTH};
use crate::error::HeatmapResult;
use crate::types::WeightedPoint;
use log::debug;
use rstar::{RTree, RTreeObject, AABB};
use std::fmt;

/// A point together with its position in the world square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedPoint {
    pub point: WeightedPoint,
    pub position: WorldPoint,
}

impl IndexedPoint {
    pub fn new(point: WeightedPoint) -> Self {
        Self {
            point,
            position: project(point.latitude, point.longitude),
        }
    }

    pub fn weight(&self) -> f64 {
        self.point.weight
    }
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.position.x, self.position.y])
    }
}

/// Immutable spatial index of one data set.
///
/// A new data set means a new index; queries borrow from the index, so no
/// iterator can observe a rebuild.
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
    bounds: Option<WorldBounds>,
    total_weight: f64,
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("len", &self.len())
            .field("bounds", &self.bounds)
            .field("total_weight", &self.total_weight)
            .finish()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            bounds: None,
            total_weight: 0.0,
        }
    }

    /// Validate every point, then bulk load. Any invalid point rejects the whole set.
    pub fn build(points: &[WeightedPoint]) -> HeatmapResult<Self> {
        for (i, point) in points.iter().enumerate() {
            point.validate(i)?;
        }

        let indexed: Vec<IndexedPoint> = points.iter().copied().map(IndexedPoint::new).collect();
        let bounds = WorldBounds::enclosing(indexed.iter().map(|p| p.position));
        let total_weight = indexed.iter().map(IndexedPoint::weight).sum();

        debug!("Bulk loading {} points into spatial index", indexed.len());
        Ok(Self {
            tree: RTree::bulk_load(indexed),
            bounds,
            total_weight,
        })
    }

    /// Points inside `bounds` grown by `padding` on every side.
    pub fn query<'a>(&'a self, bounds: &WorldBounds, padding: f64) -> impl Iterator<Item = &'a IndexedPoint> + 'a {
        let padded = bounds.expand(padding);
        self.locate(&padded)
    }

    /// Like [`query`](Self::query), but when the padded box crosses the
    /// antimeridian the strip on the far side of the world is included too,
    /// shifted by one world width so it lines up with `bounds`.
    pub fn query_wrapped<'a>(
        &'a self,
        bounds: &WorldBounds,
        padding: f64,
    ) -> impl Iterator<Item = (WorldPoint, f64)> + 'a {
        let padded = bounds.expand(padding);

        let west = (padded.min_x < 0.0).then(|| {
            let strip = WorldBounds::new(padded.min_x + WORLD_WIDTH, WORLD_WIDTH, padded.min_y, padded.max_y);
            self.locate(&strip)
                .map(|p| (p.position.shifted_x(-WORLD_WIDTH), p.weight()))
        });
        let east = (padded.max_x > WORLD_WIDTH).then(|| {
            let strip = WorldBounds::new(0.0, padded.max_x - WORLD_WIDTH, padded.min_y, padded.max_y);
            self.locate(&strip)
                .map(|p| (p.position.shifted_x(WORLD_WIDTH), p.weight()))
        });

        self.locate(&padded)
            .map(|p| (p.position, p.weight()))
            .chain(west.into_iter().flatten())
            .chain(east.into_iter().flatten())
    }

    fn locate<'a>(&'a self, bounds: &WorldBounds) -> impl Iterator<Item = &'a IndexedPoint> + 'a {
        let envelope = AABB::from_corners([bounds.min_x, bounds.min_y], [bounds.max_x, bounds.max_y]);
        self.tree.locate_in_envelope(&envelope)
    }

    pub fn points(&self) -> impl Iterator<Item = &IndexedPoint> {
        self.tree.iter()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Enclosing box of all projected points.
    pub fn bounds(&self) -> Option<WorldBounds> {
        self.bounds
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }
}
