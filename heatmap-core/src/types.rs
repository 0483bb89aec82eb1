use crate::error::HeatmapError;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ZoomLevel = u8;
pub type Epoch = u64;

/// Weight assigned to points given without one.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// A geolocated sample. Latitude in [-90, 90], longitude in [-180, 180], weight >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PointRecord")]
pub struct WeightedPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub weight: f64,
}

impl WeightedPoint {
    pub fn new(latitude: f64, longitude: f64, weight: f64) -> Self {
        Self {
            latitude,
            longitude,
            weight,
        }
    }

    pub fn unweighted(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, DEFAULT_WEIGHT)
    }

    /// Check ranges; `index` is the point's position in the data set being loaded.
    pub fn validate(&self, index: usize) -> Result<(), HeatmapError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(HeatmapError::invalid_input(
                index,
                format!("latitude {} outside [-90, 90]", self.latitude),
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(HeatmapError::invalid_input(
                index,
                format!("longitude {} outside [-180, 180]", self.longitude),
            ));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(HeatmapError::invalid_input(
                index,
                format!("weight {} must be a finite value >= 0", self.weight),
            ));
        }
        Ok(())
    }
}

impl From<(f64, f64)> for WeightedPoint {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::unweighted(latitude, longitude)
    }
}

impl From<(f64, f64, f64)> for WeightedPoint {
    fn from((latitude, longitude, weight): (f64, f64, f64)) -> Self {
        Self::new(latitude, longitude, weight)
    }
}

/// Accepted wire shapes for a point: `[lat, lng]`, `[lat, lng, weight]` or an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum PointRecord {
    Weighted(f64, f64, f64),
    Plain(f64, f64),
    Object {
        #[serde(alias = "lat")]
        latitude: f64,
        #[serde(alias = "lng", alias = "lon")]
        longitude: f64,
        #[serde(default = "default_weight")]
        weight: f64,
    },
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

impl From<PointRecord> for WeightedPoint {
    fn from(record: PointRecord) -> Self {
        match record {
            PointRecord::Weighted(lat, lng, weight) => Self::new(lat, lng, weight),
            PointRecord::Plain(lat, lng) => Self::unweighted(lat, lng),
            PointRecord::Object {
                latitude,
                longitude,
                weight,
            } => Self::new(latitude, longitude, weight),
        }
    }
}

/// Slippy-map tile address. Valid when `x, y < 2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub zoom: ZoomLevel,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(zoom: ZoomLevel, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Number of tiles along one axis at this zoom.
    pub fn tiles_per_axis(&self) -> u64 {
        1u64.checked_shl(self.zoom as u32).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Registry-issued overlay identifier. Never reused within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverlayId(pub u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "heatmap-{}", self.0)
    }
}

/// 8-bit RGBA pixel, laid out so pixel buffers can be viewed as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(C)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Multiply alpha by `factor` (clamped to [0, 1]).
    pub fn scale_alpha(self, factor: f64) -> Self {
        let a = (self.a as f64 * factor.clamp(0.0, 1.0)).round() as u8;
        self.with_alpha(a)
    }

    /// Channel-wise linear interpolation, `t` clamped to [0, 1].
    pub fn lerp(self, other: Rgba, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Rgba {
    type Error = HeatmapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgba::from_hex(&value)
            .ok_or_else(|| HeatmapError::invalid_config(format!("malformed color '{}'", value)))
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_validation() {
        assert!(WeightedPoint::new(90.0, -180.0, 0.0).validate(0).is_ok());
        assert!(WeightedPoint::new(90.5, 0.0, 1.0).validate(0).is_err());
        assert!(WeightedPoint::new(0.0, 180.1, 1.0).validate(0).is_err());
        assert!(WeightedPoint::new(0.0, 0.0, -0.1).validate(0).is_err());
        assert!(WeightedPoint::new(f64::NAN, 0.0, 1.0).validate(0).is_err());

        match WeightedPoint::new(0.0, 0.0, -1.0).validate(7) {
            Err(HeatmapError::InvalidInput { index, .. }) => assert_eq!(index, 7),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_point_wire_shapes() {
        let points: Vec<WeightedPoint> = serde_json::from_str(
            r#"[[10.0, 20.0], [1.5, -2.5, 3.0], {"lat": 4.0, "lng": 5.0}, {"latitude": 6.0, "longitude": 7.0, "weight": 0.5}]"#,
        )
        .unwrap();

        assert_eq!(points[0], WeightedPoint::new(10.0, 20.0, 1.0));
        assert_eq!(points[1], WeightedPoint::new(1.5, -2.5, 3.0));
        assert_eq!(points[2], WeightedPoint::new(4.0, 5.0, 1.0));
        assert_eq!(points[3], WeightedPoint::new(6.0, 7.0, 0.5));
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(Rgba::from_hex("#ff0000"), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(Rgba::from_hex("0000ff80"), Some(Rgba::new(0, 0, 255, 128)));
        assert_eq!(Rgba::from_hex("#12345"), None);
        assert_eq!(Rgba::from_hex("#gg0000"), None);
        assert_eq!(Rgba::new(1, 2, 3, 4).to_hex(), "#01020304");

        let parsed: Rgba = serde_json::from_str("\"#00ff00\"").unwrap();
        assert_eq!(parsed, Rgba::rgb(0, 255, 0));
        assert!(serde_json::from_str::<Rgba>("\"blue\"").is_err());
    }

    #[test]
    fn test_color_math() {
        let blue = Rgba::rgb(0, 0, 255);
        let red = Rgba::rgb(255, 0, 0);
        assert_eq!(blue.lerp(red, 0.0), blue);
        assert_eq!(blue.lerp(red, 1.0), red);
        assert_eq!(blue.lerp(red, 0.5), Rgba::rgb(128, 0, 128));
        assert_eq!(red.scale_alpha(0.8).a, 204);
        assert_eq!(red.scale_alpha(0.0).a, 0);
    }

    #[test]
    fn test_tile_key_display() {
        assert_eq!(TileKey::new(10, 512, 300).to_string(), "10/512/300");
        assert_eq!(TileKey::new(3, 0, 0).tiles_per_axis(), 8);
        assert_eq!(OverlayId(4).to_string(), "heatmap-4");
    }
}
