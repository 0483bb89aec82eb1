//! Kernel density rendering of one tile.
//!
//! Points are bucketed into a grid padded by `radius` pixels on each side,
//! blurred with a separable Gaussian, cropped back to the tile and pushed
//! through the color map.

use crate::bitmap::Bitmap;
use crate::config::HeatmapConfig;
use crate::coords::{WorldBounds, WorldPoint};
use crate::gradient::ColorMap;
use crate::types::Rgba;

/// Discrete Gaussian with support `radius` and sigma `radius / 3`; the center weight is 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    radius: usize,
    weights: Vec<f64>,
}

impl Kernel {
    pub fn gaussian(radius: u32) -> Self {
        let r = radius as usize;
        let sigma = radius as f64 / 3.0;
        let weights = (0..=2 * r)
            .map(|i| {
                let d = i as f64 - radius as f64;
                (-(d * d) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        Self { radius: r, weights }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Weight at signed offset `d` from the center, zero outside the support.
    pub fn weight(&self, d: isize) -> f64 {
        let i = d + self.radius as isize;
        if i < 0 {
            return 0.0;
        }
        self.weights.get(i as usize).copied().unwrap_or(0.0)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

/// Row-major grid of accumulated intensities.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityGrid {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl IntensityGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.width + x]
    }

    fn add(&mut self, x: usize, y: usize, value: f64) {
        self.values[y * self.width + x] += value;
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }
}

/// Renders tiles for one radius, tile size and color map.
#[derive(Debug, Clone)]
pub struct DensityRasterizer {
    tile_size: usize,
    kernel: Kernel,
    color_map: ColorMap,
}

impl DensityRasterizer {
    /// Rasterizer for a validated configuration.
    pub fn new(config: &HeatmapConfig) -> Self {
        Self {
            tile_size: config.tile_size as usize,
            kernel: Kernel::gaussian(config.radius),
            color_map: config.gradient.color_map(config.opacity),
        }
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn radius(&self) -> usize {
        self.kernel.radius
    }

    pub fn color_map(&self) -> &ColorMap {
        &self.color_map
    }

    fn padded_dim(&self) -> usize {
        self.tile_size + 2 * self.kernel.radius
    }

    /// Width of one tile pixel in world units.
    pub fn pixel_width(&self, bounds: &WorldBounds) -> f64 {
        bounds.width() / self.tile_size as f64
    }

    /// Padding, in world units, for the index query feeding `bounds`.
    pub fn padding(&self, bounds: &WorldBounds) -> f64 {
        self.kernel.radius as f64 * self.pixel_width(bounds)
    }

    /// Sum sample weights into the padded grid; samples outside it are skipped.
    pub fn accumulate<I>(&self, bounds: &WorldBounds, samples: I) -> IntensityGrid
    where
        I: IntoIterator<Item = (WorldPoint, f64)>,
    {
        let dim = self.padded_dim();
        let pixel_width = self.pixel_width(bounds);
        let origin_x = bounds.min_x - self.padding(bounds);
        let origin_y = bounds.min_y - self.padding(bounds);

        let mut grid = IntensityGrid::new(dim, dim);
        for (p, weight) in samples {
            let bx = ((p.x - origin_x) / pixel_width).floor();
            let by = ((p.y - origin_y) / pixel_width).floor();
            if bx < 0.0 || by < 0.0 || bx >= dim as f64 || by >= dim as f64 {
                continue;
            }
            grid.add(bx as usize, by as usize, weight);
        }
        grid
    }

    /// Blur the padded grid and crop it to the tile.
    ///
    /// Scatter form: each non-zero cell spreads into the output columns
    /// (then rows) it can reach, so empty regions cost nothing.
    pub fn convolve(&self, padded: &IntensityGrid) -> IntensityGrid {
        let r = self.kernel.radius;
        let ts = self.tile_size;
        let dim = padded.width;
        debug_assert_eq!(dim, self.padded_dim());

        // Horizontal pass: keep only the tile's columns.
        let mut intermediate = IntensityGrid::new(ts, dim);
        for y in 0..dim {
            for x in 0..dim {
                let v = padded.get(x, y);
                if v == 0.0 {
                    continue;
                }
                let lo = x.saturating_sub(r).max(r);
                let hi = (x + r).min(r + ts - 1);
                for x2 in lo..=hi {
                    intermediate.add(x2 - r, y, v * self.kernel.weights[x2 + r - x]);
                }
            }
        }

        // Vertical pass: keep only the tile's rows.
        let mut output = IntensityGrid::new(ts, ts);
        for y in 0..dim {
            for x in 0..ts {
                let v = intermediate.get(x, y);
                if v == 0.0 {
                    continue;
                }
                let lo = y.saturating_sub(r).max(r);
                let hi = (y + r).min(r + ts - 1);
                for y2 in lo..=hi {
                    output.add(x, y2 - r, v * self.kernel.weights[y2 + r - y]);
                }
            }
        }
        output
    }

    /// Map intensities to colors against `max_intensity`.
    pub fn colorize(&self, grid: &IntensityGrid, max_intensity: f64) -> Bitmap {
        let (w, h) = (grid.width as u32, grid.height as u32);
        if max_intensity <= 0.0 || !max_intensity.is_finite() {
            return Bitmap::transparent(w, h);
        }

        let scale = (self.color_map.len() - 1) as f64 / max_intensity;
        let pixels = grid
            .values
            .iter()
            .map(|&v| {
                if v <= 0.0 {
                    return Rgba::TRANSPARENT;
                }
                match (v * scale) as usize {
                    0 => Rgba::TRANSPARENT,
                    idx => self.color_map.get(idx),
                }
            })
            .collect();
        Bitmap::from_pixels(w, h, pixels)
    }

    /// Full pipeline for the tile covering `bounds`.
    pub fn render<I>(&self, bounds: &WorldBounds, samples: I, max_intensity: f64) -> Bitmap
    where
        I: IntoIterator<Item = (WorldPoint, f64)>,
    {
        let padded = self.accumulate(bounds, samples);
        if padded.is_empty() {
            let ts = self.tile_size as u32;
            return Bitmap::transparent(ts, ts);
        }
        let grid = self.convolve(&padded);
        self.colorize(&grid, max_intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rasterizer(radius: u32) -> DensityRasterizer {
        DensityRasterizer::new(&HeatmapConfig::default().with_radius(radius).with_tile_size(64))
    }

    fn unit_tile() -> WorldBounds {
        WorldBounds::new(0.0, 1.0, 0.0, 1.0)
    }

    /// World position of the center of padded-grid cell (px, py) for `unit_tile`.
    fn cell_center(r: &DensityRasterizer, px: f64, py: f64) -> WorldPoint {
        let pw = r.pixel_width(&unit_tile());
        let pad = r.radius() as f64;
        WorldPoint::new((px - pad + 0.5) * pw, (py - pad + 0.5) * pw)
    }

    #[test]
    fn test_kernel_shape() {
        let k = Kernel::gaussian(10);
        assert_eq!(k.weights().len(), 21);
        assert_eq!(k.weight(0), 1.0);
        assert_eq!(k.weight(-3), k.weight(3));
        assert!(k.weight(1) > k.weight(2));
        assert!((k.weight(10) - (-4.5f64).exp()).abs() < 1e-12);
        assert_eq!(k.weight(11), 0.0);
        assert_eq!(k.weight(-11), 0.0);
    }

    #[test]
    fn test_accumulate_buckets_and_skips() {
        let r = rasterizer(10);
        let inside = cell_center(&r, 20.0, 30.0);
        let outside = WorldPoint::new(-0.5, 0.5);
        let grid = r.accumulate(&unit_tile(), vec![(inside, 1.5), (inside, 0.5), (outside, 9.0)]);

        assert_eq!((grid.width(), grid.height()), (84, 84));
        assert_eq!(grid.get(20, 30), 2.0);
        assert_eq!(grid.max(), 2.0);
    }

    #[test]
    fn test_convolve_matches_direct_sum() {
        let r = rasterizer(10);
        let a = cell_center(&r, 15.0, 40.0);
        let b = cell_center(&r, 22.0, 44.0);
        let padded = r.accumulate(&unit_tile(), vec![(a, 1.0), (b, 2.0)]);
        let grid = r.convolve(&padded);
        assert_eq!((grid.width(), grid.height()), (64, 64));

        // Output (x, y) sits at padded (x + 10, y + 10).
        let direct = |x: isize, y: isize| {
            let k = &r.kernel;
            1.0 * k.weight(x + 10 - 15) * k.weight(y + 10 - 40) + 2.0 * k.weight(x + 10 - 22) * k.weight(y + 10 - 44)
        };
        for &(x, y) in &[(5, 30), (12, 34), (0, 25), (20, 40), (40, 10)] {
            let got = grid.get(x as usize, y as usize);
            assert!((got - direct(x, y)).abs() < 1e-12, "({}, {}): {} vs {}", x, y, got, direct(x, y));
        }
    }

    #[test]
    fn test_colorize_thresholds() {
        let r = rasterizer(10);
        let mut grid = IntensityGrid::new(2, 2);
        grid.add(0, 0, 0.0);
        grid.add(1, 0, 0.0005);
        grid.add(0, 1, 1.0);
        grid.add(1, 1, 50.0);

        let bitmap = r.colorize(&grid, 1.0);
        let top = r.color_map().top();
        assert_eq!(bitmap.pixel(0, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(bitmap.pixel(1, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(bitmap.pixel(0, 1), Some(top));
        assert_eq!(bitmap.pixel(1, 1), Some(top));

        assert!(r.colorize(&grid, 0.0).is_transparent());
    }

    #[test]
    fn test_render_without_samples_is_transparent() {
        let r = rasterizer(20);
        let bitmap = r.render(&unit_tile(), Vec::new(), 1.0);
        assert_eq!((bitmap.width(), bitmap.height()), (64, 64));
        assert!(bitmap.is_transparent());
    }

    #[test]
    fn test_point_at_padding_edge_reaches_tile() {
        let r = rasterizer(10);
        // Left-most padded column: exactly `radius` pixels west of the tile.
        let at_edge = cell_center(&r, 0.0, 40.0);
        let bitmap = r.render(&unit_tile(), vec![(at_edge, 1.0)], 1.0);
        assert!(bitmap.pixel(0, 30).map_or(false, |p| p.a > 0));

        // One pixel further out falls off the padded grid.
        let beyond = cell_center(&r, -1.0, 40.0);
        assert!(r.render(&unit_tile(), vec![(beyond, 1.0)], 1.0).is_transparent());
    }
}
