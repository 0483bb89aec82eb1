//! Color ramps mapping normalized intensity to RGBA.

use crate::error::{HeatmapError, HeatmapResult};
use crate::types::Rgba;
use serde::{Deserialize, Serialize};

/// Entries in a generated color map.
pub const DEFAULT_COLOR_MAP_SIZE: usize = 1000;
/// Largest accepted color map.
pub const MAX_COLOR_MAP_SIZE: usize = 1 << 16;

/// A color anchored at a position in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub position: f64,
    pub color: Rgba,
}

impl ColorStop {
    pub fn new(position: f64, color: Rgba) -> Self {
        Self { position, color }
    }
}

/// Ordered color stops plus the resolution of the lookup table built from them.
///
/// Intensities below the first stop fade in from a transparent version of the
/// first color; intensities past the last stop keep the last color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub stops: Vec<ColorStop>,
    #[serde(default = "default_color_map_size")]
    pub color_map_size: usize,
}

fn default_color_map_size() -> usize {
    DEFAULT_COLOR_MAP_SIZE
}

impl Default for Gradient {
    /// Blue to red, with the ramp starting at 20% intensity.
    fn default() -> Self {
        Self {
            stops: vec![
                ColorStop::new(0.2, Rgba::rgb(0, 0, 255)),
                ColorStop::new(1.0, Rgba::rgb(255, 0, 0)),
            ],
            color_map_size: DEFAULT_COLOR_MAP_SIZE,
        }
    }
}

impl Gradient {
    /// Build and validate a gradient from stops.
    pub fn new(stops: Vec<ColorStop>) -> HeatmapResult<Self> {
        let gradient = Self {
            stops,
            color_map_size: DEFAULT_COLOR_MAP_SIZE,
        };
        gradient.validate()?;
        Ok(gradient)
    }

    /// Build from parallel color and position slices.
    pub fn from_parts(colors: &[Rgba], positions: &[f64]) -> HeatmapResult<Self> {
        if colors.len() != positions.len() {
            return Err(HeatmapError::invalid_config(format!(
                "gradient has {} colors but {} positions",
                colors.len(),
                positions.len()
            )));
        }
        let stops = positions
            .iter()
            .zip(colors)
            .map(|(&position, &color)| ColorStop::new(position, color))
            .collect();
        Self::new(stops)
    }

    pub fn with_color_map_size(mut self, size: usize) -> HeatmapResult<Self> {
        self.color_map_size = size;
        self.validate()?;
        Ok(self)
    }

    /// Stops must be non-empty, finite, within [0, 1] and strictly increasing.
    pub fn validate(&self) -> HeatmapResult<()> {
        if self.stops.is_empty() {
            return Err(HeatmapError::invalid_config("gradient needs at least one color stop"));
        }
        if !(2..=MAX_COLOR_MAP_SIZE).contains(&self.color_map_size) {
            return Err(HeatmapError::invalid_config(format!(
                "color map size must be within [2, {}], got {}",
                MAX_COLOR_MAP_SIZE, self.color_map_size
            )));
        }
        for (i, stop) in self.stops.iter().enumerate() {
            if !stop.position.is_finite() || !(0.0..=1.0).contains(&stop.position) {
                return Err(HeatmapError::invalid_config(format!(
                    "gradient stop {} has position {} outside [0, 1]",
                    i, stop.position
                )));
            }
        }
        if let Some(pair) = self.stops.windows(2).find(|w| w[1].position <= w[0].position) {
            return Err(HeatmapError::invalid_config(format!(
                "gradient stops must be strictly increasing ({} then {})",
                pair[0].position, pair[1].position
            )));
        }
        Ok(())
    }

    /// Color at normalized intensity `t`, before opacity is applied.
    pub fn color_at(&self, t: f64) -> Rgba {
        let first = self.stops[0];
        if t <= first.position {
            if first.position <= 0.0 {
                return first.color;
            }
            return first.color.with_alpha(0).lerp(first.color, t / first.position);
        }
        for pair in self.stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t < hi.position {
                let span = hi.position - lo.position;
                return lo.color.lerp(hi.color, (t - lo.position) / span);
            }
        }
        self.stops[self.stops.len() - 1].color
    }

    /// Sample the ramp into a lookup table, scaling every alpha by `opacity`.
    pub fn color_map(&self, opacity: f64) -> ColorMap {
        let last = (self.color_map_size - 1) as f64;
        let colors = (0..self.color_map_size)
            .map(|i| self.color_at(i as f64 / last).scale_alpha(opacity))
            .collect();
        ColorMap { colors }
    }
}

/// Precomputed gradient lookup; index 0 is zero intensity, the last entry full intensity.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    colors: Vec<Rgba>,
}

impl ColorMap {
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Entry for `index`, saturating at the top of the map.
    pub fn get(&self, index: usize) -> Rgba {
        self.colors[index.min(self.colors.len() - 1)]
    }

    pub fn top(&self) -> Rgba {
        self.get(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_increasing_stops() {
        let result = Gradient::from_parts(&[Rgba::rgb(0, 0, 255), Rgba::rgb(255, 0, 0)], &[0.5, 0.2]);
        assert!(matches!(result, Err(HeatmapError::InvalidConfig(_))));

        let result = Gradient::from_parts(&[Rgba::rgb(0, 0, 255), Rgba::rgb(255, 0, 0)], &[0.5, 0.5]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_malformed_gradients() {
        assert!(Gradient::new(Vec::new()).is_err());
        assert!(Gradient::from_parts(&[Rgba::rgb(0, 0, 0)], &[1.5]).is_err());
        assert!(Gradient::from_parts(&[Rgba::rgb(0, 0, 0)], &[f64::NAN]).is_err());
        assert!(Gradient::from_parts(&[Rgba::rgb(0, 0, 0)], &[0.2, 0.4]).is_err());
        assert!(Gradient::default().with_color_map_size(1).is_err());
        assert!(Gradient::default().with_color_map_size(MAX_COLOR_MAP_SIZE).is_ok());
        assert!(Gradient::default().with_color_map_size(MAX_COLOR_MAP_SIZE + 1).is_err());
        assert!(Gradient::default().with_color_map_size(usize::MAX).is_err());
    }

    #[test]
    fn test_color_interpolation() {
        let g = Gradient::default();
        let blue = Rgba::rgb(0, 0, 255);
        let red = Rgba::rgb(255, 0, 0);

        assert_eq!(g.color_at(0.0), blue.with_alpha(0));
        assert_eq!(g.color_at(0.1), blue.with_alpha(128));
        assert_eq!(g.color_at(0.2), blue);
        let mid = g.color_at(0.6);
        assert!((127..=128).contains(&mid.r) && (127..=128).contains(&mid.b));
        assert_eq!((mid.g, mid.a), (0, 255));
        assert_eq!(g.color_at(1.0), red);
        assert_eq!(g.color_at(3.0), red);
    }

    #[test]
    fn test_stop_at_zero_is_opaque() {
        let g = Gradient::from_parts(&[Rgba::rgb(0, 255, 0), Rgba::rgb(255, 0, 0)], &[0.0, 1.0]).unwrap();
        assert_eq!(g.color_at(0.0), Rgba::rgb(0, 255, 0));
    }

    #[test]
    fn test_color_map_applies_opacity() {
        let map = Gradient::default().color_map(0.8);
        assert_eq!(map.len(), DEFAULT_COLOR_MAP_SIZE);
        assert_eq!(map.get(0).a, 0);
        assert_eq!(map.top(), Rgba::new(255, 0, 0, 204));
        assert_eq!(map.get(usize::MAX), map.top());
        assert!(map.get(500).a <= 204);
    }

    #[test]
    fn test_gradient_serde() {
        let g: Gradient = serde_json::from_str(
            r##"{"stops": [{"position": 0.1, "color": "#00ff00"}, {"position": 1.0, "color": "#ff000080"}]}"##,
        )
        .unwrap();
        assert_eq!(g.color_map_size, DEFAULT_COLOR_MAP_SIZE);
        assert_eq!(g.stops[1].color, Rgba::new(255, 0, 0, 128));
        assert!(g.validate().is_ok());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn stops() -> impl Strategy<Value = Vec<ColorStop>> {
            prop::collection::btree_set(1u16..=1000, 1..6).prop_flat_map(|positions| {
                let n = positions.len();
                prop::collection::vec(any::<(u8, u8, u8, u8)>(), n).prop_map(move |colors| {
                    positions
                        .iter()
                        .zip(colors)
                        .map(|(&p, (r, g, b, a))| ColorStop::new(p as f64 / 1000.0, Rgba::new(r, g, b, a)))
                        .collect()
                })
            })
        }

        proptest! {
            #[test]
            fn color_map_respects_opacity(stops in stops(), opacity in 0.0f64..=1.0) {
                let last = stops[stops.len() - 1].color;
                let gradient = Gradient::new(stops).unwrap();
                let map = gradient.color_map(opacity);
                let ceiling = (255.0 * opacity).round() as u8;

                prop_assert_eq!(map.len(), DEFAULT_COLOR_MAP_SIZE);
                prop_assert_eq!(map.get(0).a, 0);
                prop_assert_eq!(map.top(), last.scale_alpha(opacity));
                prop_assert!((0..map.len()).all(|i| map.get(i).a <= ceiling));
            }

            #[test]
            fn reversed_stops_are_rejected(stops in stops()) {
                prop_assume!(stops.len() > 1);
                let reversed: Vec<_> = stops.into_iter().rev().collect();
                prop_assert!(Gradient::new(reversed).is_err());
            }
        }
    }
}
