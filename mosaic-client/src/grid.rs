//! Image partitioning into a grid of equally sized tiles

use crate::error::{MosaicError, Result};

/// Tile grid derived from image and tile dimensions
///
/// Both counts are floor-divided: trailing partial tiles on the right and
/// bottom edges are dropped, never padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub image_width: u32,
    pub image_height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub column_count: usize,
    pub row_count: usize,
}

impl Grid {
    /// Partition an image of `image_width x image_height` pixels
    pub fn new(
        image_width: u32,
        image_height: u32,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Self> {
        if tile_width == 0 || tile_height == 0 {
            return Err(MosaicError::InvalidTileSize(format!(
                "tile dimensions must be positive, got {}x{}",
                tile_width, tile_height
            )));
        }

        let column_count = (image_width / tile_width) as usize;
        let row_count = (image_height / tile_height) as usize;

        if column_count == 0 || row_count == 0 {
            return Err(MosaicError::InvalidInput(format!(
                "image {}x{} is smaller than one {}x{} tile",
                image_width, image_height, tile_width, tile_height
            )));
        }

        Ok(Self {
            image_width,
            image_height,
            tile_width,
            tile_height,
            column_count,
            row_count,
        })
    }

    /// Top-left pixel of a tile
    pub fn tile_origin(&self, row: usize, column: usize) -> (u32, u32) {
        (
            column as u32 * self.tile_width,
            row as u32 * self.tile_height,
        )
    }

    pub fn tile_count(&self) -> usize {
        self.column_count * self.row_count
    }

    pub fn is_last_row(&self, row: usize) -> bool {
        row + 1 == self.row_count
    }
}
