//! Overlay configuration and partial updates.

use crate::coords::TILE_SIZE;
use crate::error::{HeatmapError, HeatmapResult};
use crate::gradient::Gradient;
use crate::types::WeightedPoint;
use serde::{Deserialize, Serialize};

/// Smallest kernel radius, in tile pixels.
pub const MIN_RADIUS: u32 = 10;
/// Largest kernel radius, in tile pixels.
pub const MAX_RADIUS: u32 = 50;
pub const DEFAULT_RADIUS: u32 = 20;
pub const DEFAULT_OPACITY: f64 = 0.7;
pub const MIN_TILE_SIZE: u32 = 64;
pub const MAX_TILE_SIZE: u32 = 2048;

/// Intensity that maps to the top of the gradient.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "MaxIntensityRepr", into = "MaxIntensityRepr")]
pub enum MaxIntensity {
    /// Derived from the data set for each zoom level.
    #[default]
    Auto,
    Fixed(f64),
}

impl MaxIntensity {
    pub fn validate(&self) -> HeatmapResult<()> {
        match *self {
            MaxIntensity::Auto => Ok(()),
            MaxIntensity::Fixed(v) if v.is_finite() && v > 0.0 => Ok(()),
            MaxIntensity::Fixed(v) => Err(HeatmapError::invalid_config(format!(
                "max intensity must be a finite value > 0 or \"auto\", got {}",
                v
            ))),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MaxIntensityRepr {
    Value(f64),
    Keyword(String),
}

impl TryFrom<MaxIntensityRepr> for MaxIntensity {
    type Error = String;

    fn try_from(repr: MaxIntensityRepr) -> Result<Self, Self::Error> {
        match repr {
            MaxIntensityRepr::Value(v) => Ok(MaxIntensity::Fixed(v)),
            MaxIntensityRepr::Keyword(k) if k.eq_ignore_ascii_case("auto") => Ok(MaxIntensity::Auto),
            MaxIntensityRepr::Keyword(k) => Err(format!("expected a number or \"auto\", got \"{}\"", k)),
        }
    }
}

impl From<MaxIntensity> for MaxIntensityRepr {
    fn from(value: MaxIntensity) -> Self {
        match value {
            MaxIntensity::Auto => MaxIntensityRepr::Keyword("auto".to_string()),
            MaxIntensity::Fixed(v) => MaxIntensityRepr::Value(v),
        }
    }
}

/// Visualization parameters of one overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapConfig {
    /// Kernel support radius in tile pixels
    #[serde(default = "default_radius")]
    pub radius: u32,

    #[serde(default)]
    pub gradient: Gradient,

    /// Multiplier applied to every gradient alpha
    #[serde(default = "default_opacity")]
    pub opacity: f64,

    #[serde(default)]
    pub max_intensity: MaxIntensity,

    /// Edge length of rendered tiles in pixels
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
}

fn default_radius() -> u32 { DEFAULT_RADIUS }
fn default_opacity() -> f64 { DEFAULT_OPACITY }
fn default_tile_size() -> u32 { TILE_SIZE }

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            gradient: Gradient::default(),
            opacity: DEFAULT_OPACITY,
            max_intensity: MaxIntensity::Auto,
            tile_size: TILE_SIZE,
        }
    }
}

impl HeatmapConfig {
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_gradient(mut self, gradient: Gradient) -> Self {
        self.gradient = gradient;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_max_intensity(mut self, max_intensity: MaxIntensity) -> Self {
        self.max_intensity = max_intensity;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn validate(&self) -> HeatmapResult<()> {
        validate_radius(self.radius)?;
        validate_opacity(self.opacity)?;
        self.gradient.validate()?;
        self.max_intensity.validate()?;
        if !(MIN_TILE_SIZE..=MAX_TILE_SIZE).contains(&self.tile_size) {
            return Err(HeatmapError::invalid_config(format!(
                "tile size {} outside [{}, {}]",
                self.tile_size, MIN_TILE_SIZE, MAX_TILE_SIZE
            )));
        }
        Ok(())
    }
}

pub fn validate_radius(radius: u32) -> HeatmapResult<()> {
    if !(MIN_RADIUS..=MAX_RADIUS).contains(&radius) {
        return Err(HeatmapError::invalid_config(format!(
            "radius {} outside [{}, {}]",
            radius, MIN_RADIUS, MAX_RADIUS
        )));
    }
    Ok(())
}

pub fn validate_opacity(opacity: f64) -> HeatmapResult<()> {
    if !opacity.is_finite() || !(0.0..=1.0).contains(&opacity) {
        return Err(HeatmapError::invalid_config(format!("opacity {} outside [0, 1]", opacity)));
    }
    Ok(())
}

/// A partial change to an overlay. Absent fields keep their current value.
///
/// Applied as a unit: either every present field is accepted or none is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapUpdate {
    pub data: Option<Vec<WeightedPoint>>,
    pub radius: Option<u32>,
    pub gradient: Option<Gradient>,
    pub opacity: Option<f64>,
    pub max_intensity: Option<MaxIntensity>,
}

impl HeatmapUpdate {
    pub fn data(mut self, points: Vec<WeightedPoint>) -> Self {
        self.data = Some(points);
        self
    }

    pub fn radius(mut self, radius: u32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn gradient(mut self, gradient: Gradient) -> Self {
        self.gradient = Some(gradient);
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn max_intensity(mut self, max_intensity: MaxIntensity) -> Self {
        self.max_intensity = Some(max_intensity);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
            && self.radius.is_none()
            && self.gradient.is_none()
            && self.opacity.is_none()
            && self.max_intensity.is_none()
    }

    /// `base` with the configuration fields of this update applied and validated.
    pub fn merged_config(&self, base: &HeatmapConfig) -> HeatmapResult<HeatmapConfig> {
        let mut config = base.clone();
        if let Some(radius) = self.radius {
            config.radius = radius;
        }
        if let Some(gradient) = &self.gradient {
            config.gradient = gradient.clone();
        }
        if let Some(opacity) = self.opacity {
            config.opacity = opacity;
        }
        if let Some(max_intensity) = self.max_intensity {
            config.max_intensity = max_intensity;
        }
        config.validate()?;
        Ok(config)
    }
}
