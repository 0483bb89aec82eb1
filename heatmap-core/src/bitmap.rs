//! RGBA tile bitmaps

use crate::types::Rgba;
use xxhash_rust::xxh64::xxh64;

/// Row-major RGBA image, top-left origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Bitmap {
    /// Fully transparent bitmap of the given size.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width as usize * height as usize],
        }
    }

    /// Caller guarantees `pixels.len() == width * height`.
    pub(crate) fn from_pixels(width: u32, height: u32, pixels: Vec<Rgba>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Raw `RGBARGBA...` bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn is_transparent(&self) -> bool {
        self.pixels.iter().all(|p| p.a == 0)
    }

    pub fn max_alpha(&self) -> u8 {
        self.pixels.iter().map(|p| p.a).max().unwrap_or(0)
    }

    /// Pixels with non-zero alpha.
    pub fn opaque_pixel_count(&self) -> usize {
        self.pixels.iter().filter(|p| p.a > 0).count()
    }

    /// Content hash over dimensions and pixel bytes.
    pub fn checksum(&self) -> u64 {
        let seed = ((self.width as u64) << 32) | self.height as u64;
        xxh64(self.as_bytes(), seed)
    }

    #[cfg(feature = "png")]
    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            let p = self.pixels[y as usize * self.width as usize + x as usize];
            image::Rgba([p.r, p.g, p.b, p.a])
        })
    }

    #[cfg(feature = "png")]
    pub fn encode_png(&self) -> crate::error::HeatmapResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_image()
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)?;
        Ok(buf)
    }
}
