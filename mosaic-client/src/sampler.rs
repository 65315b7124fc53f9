//! Representative color of one tile
//!
//! The tile's pixel block is subsampled on a fixed stride along both axes
//! and each channel is averaged with floor truncation. Alpha is ignored.

use crate::error::{MosaicError, Result};
use image::RgbaImage;
use mosaic_common::tiles::DEFAULT_SAMPLING_STRIDE;
use std::fmt;

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Six lowercase hex digits, no leading `#`
    pub fn to_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Averages a tile's color from every `stride`-th pixel along each axis
#[derive(Debug, Clone, Copy)]
pub struct ColorSampler {
    stride: u32,
}

impl Default for ColorSampler {
    fn default() -> Self {
        Self {
            stride: DEFAULT_SAMPLING_STRIDE,
        }
    }
}

impl ColorSampler {
    /// Create a sampler with the given stride
    ///
    /// A zero stride can never produce a sample and is rejected.
    pub fn new(stride: u32) -> Result<Self> {
        if stride == 0 {
            return Err(MosaicError::InvalidTileSize(
                "sampling stride must be positive".to_string(),
            ));
        }
        Ok(Self { stride })
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Average color of the `tile_width x tile_height` block at `(x, y)`
    ///
    /// Samples start at the tile origin. Fails with `InvalidTileSize` when the
    /// walk yields no samples, and with `InvalidInput` when the block does not
    /// lie inside the canvas.
    pub fn sample(
        &self,
        canvas: &RgbaImage,
        x: u32,
        y: u32,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Rgb> {
        let x_end = x.checked_add(tile_width);
        let y_end = y.checked_add(tile_height);
        let (x_end, y_end) = match (x_end, y_end) {
            (Some(xe), Some(ye)) if xe <= canvas.width() && ye <= canvas.height() => (xe, ye),
            _ => {
                return Err(MosaicError::InvalidInput(format!(
                    "tile {}x{} at ({}, {}) exceeds canvas {}x{}",
                    tile_width,
                    tile_height,
                    x,
                    y,
                    canvas.width(),
                    canvas.height()
                )))
            }
        };

        let step = self.stride as usize;
        let (mut r, mut g, mut b, mut count) = (0u64, 0u64, 0u64, 0u64);

        for py in (y..y_end).step_by(step) {
            for px in (x..x_end).step_by(step) {
                let pixel = canvas.get_pixel(px, py);
                r += u64::from(pixel[0]);
                g += u64::from(pixel[1]);
                b += u64::from(pixel[2]);
                count += 1;
            }
        }

        if count == 0 {
            return Err(MosaicError::InvalidTileSize(format!(
                "tile {}x{} yields no samples at stride {}",
                tile_width, tile_height, self.stride
            )));
        }

        // Each average is <= 255, truncation matches floor for non-negative sums
        Ok(Rgb::new(
            (r / count) as u8,
            (g / count) as u8,
            (b / count) as u8,
        ))
    }
}
