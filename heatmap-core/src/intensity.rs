//! Per-zoom maximum intensity.
//!
//! With [`MaxIntensity::Auto`] the data set is bucketed at screen resolution
//! for a band of zoom levels and the heaviest bucket becomes that zoom's max.
//! Zooms outside the band reuse the nearest computed value.

use crate::config::{HeatmapConfig, MaxIntensity};
use crate::coords::MAX_ZOOM;
use crate::index::SpatialIndex;
use crate::types::ZoomLevel;
use std::collections::HashMap;

/// Nominal screen edge, in pixels, at zoom 3.
pub const SCREEN_SIZE: f64 = 1280.0;
/// First zoom with its own computed max.
pub const AUTO_MIN_ZOOM: ZoomLevel = 5;
/// One past the last zoom with its own computed max.
pub const AUTO_MAX_ZOOM: ZoomLevel = 11;

#[derive(Debug, Clone, PartialEq)]
pub struct MaxIntensityTable {
    values: [f64; MAX_ZOOM as usize + 1],
}

impl MaxIntensityTable {
    pub fn fixed(value: f64) -> Self {
        Self {
            values: [value; MAX_ZOOM as usize + 1],
        }
    }

    /// Table for `config` over the points in `index`.
    pub fn resolve(config: &HeatmapConfig, index: &SpatialIndex) -> Self {
        match config.max_intensity {
            MaxIntensity::Fixed(value) => Self::fixed(value),
            MaxIntensity::Auto => Self::auto(index, config.radius),
        }
    }

    fn auto(index: &SpatialIndex, radius: u32) -> Self {
        let mut values = [0.0; MAX_ZOOM as usize + 1];
        for zoom in AUTO_MIN_ZOOM..AUTO_MAX_ZOOM {
            values[zoom as usize] = bucket_max(index, radius, zoom);
        }
        let low = values[AUTO_MIN_ZOOM as usize];
        let high = values[AUTO_MAX_ZOOM as usize - 1];
        values[..AUTO_MIN_ZOOM as usize].fill(low);
        values[AUTO_MAX_ZOOM as usize..].fill(high);
        Self { values }
    }

    /// Max for `zoom`, saturating at [`MAX_ZOOM`].
    pub fn at(&self, zoom: ZoomLevel) -> f64 {
        self.values[zoom.min(MAX_ZOOM) as usize]
    }
}

/// Largest summed weight in any `2 * radius` pixel bucket at `zoom`.
fn bucket_max(index: &SpatialIndex, radius: u32, zoom: ZoomLevel) -> f64 {
    let bounds = match index.bounds() {
        Some(b) => b,
        None => return 0.0,
    };
    let dim = bounds.width().max(bounds.height());
    if dim <= 0.0 {
        return index.total_weight();
    }

    let screen_dim = SCREEN_SIZE * 2f64.powi(zoom as i32 - 3);
    let n_buckets = (screen_dim / (2.0 * radius as f64)).floor();
    let scale = n_buckets / dim;

    let mut buckets: HashMap<(i64, i64), f64> = HashMap::new();
    let mut max = 0.0f64;
    for p in index.points() {
        let bx = ((p.position.x - bounds.min_x) * scale) as i64;
        let by = ((p.position.y - bounds.min_y) * scale) as i64;
        let sum = buckets.entry((bx, by)).or_insert(0.0);
        *sum += p.weight();
        max = max.max(*sum);
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeightedPoint;

    #[test]
    fn test_fixed_fills_every_zoom() {
        let config = HeatmapConfig::default().with_max_intensity(MaxIntensity::Fixed(3.0));
        let table = MaxIntensityTable::resolve(&config, &SpatialIndex::new());
        assert_eq!(table.at(0), 3.0);
        assert_eq!(table.at(MAX_ZOOM), 3.0);
        assert_eq!(table.at(200), 3.0);
    }

    #[test]
    fn test_single_location_gets_total_weight() {
        let index = SpatialIndex::build(&[WeightedPoint::new(0.0, 0.0, 2.0), WeightedPoint::new(0.0, 0.0, 3.0)]).unwrap();
        let table = MaxIntensityTable::resolve(&HeatmapConfig::default(), &index);
        for zoom in 0..=MAX_ZOOM {
            assert_eq!(table.at(zoom), 5.0);
        }
    }

    #[test]
    fn test_empty_data_has_zero_max() {
        let table = MaxIntensityTable::resolve(&HeatmapConfig::default(), &SpatialIndex::new());
        assert_eq!(table.at(10), 0.0);
    }

    #[test]
    fn test_auto_separates_distant_points() {
        let index = SpatialIndex::build(&[
            WeightedPoint::new(0.0, 0.0, 1.0),
            WeightedPoint::new(0.0, 0.0, 1.0),
            WeightedPoint::new(40.0, 90.0, 1.0),
        ])
        .unwrap();
        let table = MaxIntensityTable::resolve(&HeatmapConfig::default(), &index);

        assert_eq!(table.at(AUTO_MIN_ZOOM), 2.0);
        assert_eq!(table.at(0), table.at(AUTO_MIN_ZOOM));
        assert_eq!(table.at(MAX_ZOOM), table.at(AUTO_MAX_ZOOM - 1));
    }
}
