use geo::{RasterSize, Window};

use crate::{Error, Result};

/// A tile expanded with a halo of `radius` cells on every side.
///
/// `padded` is the part of the expanded window that lies inside the raster, the `pad_*` counts
/// hold the number of columns/rows of the expanded window that fall outside of it.
/// Those synthetic cells are never read from the raster and always count as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaloWindow {
    pub tile: Window,
    pub radius: usize,
    pub padded: Window,
    pub pad_left: usize,
    pub pad_right: usize,
    pub pad_top: usize,
    pub pad_bottom: usize,
}

impl HaloWindow {
    pub fn expand(tile: Window, radius: usize, raster_size: RasterSize) -> Result<Self> {
        if !tile.is_within(raster_size) {
            return Err(Error::BoundsViolation(format!("Tile {tile} exceeds the raster bounds {raster_size}")));
        }

        let col_off = tile.col_off.saturating_sub(radius);
        let row_off = tile.row_off.saturating_sub(radius);
        let end_col = (tile.end_col() + radius).min(raster_size.cols);
        let end_row = (tile.end_row() + radius).min(raster_size.rows);

        Ok(HaloWindow {
            tile,
            radius,
            padded: Window::new(col_off, row_off, end_col - col_off, end_row - row_off),
            pad_left: radius.saturating_sub(tile.col_off),
            pad_right: tile.end_col() + radius - end_col,
            pad_top: radius.saturating_sub(tile.row_off),
            pad_bottom: tile.end_row() + radius - end_row,
        })
    }

    /// Size of the expanded window including the synthetic cells
    pub fn outer_size(&self) -> RasterSize {
        self.tile.size().grown(self.radius)
    }

    /// Top left cell (col, row) of the expanded window, negative when it lies outside the raster
    pub fn outer_origin(&self) -> (isize, isize) {
        (
            self.tile.col_off as isize - self.radius as isize,
            self.tile.row_off as isize - self.radius as isize,
        )
    }

    /// True if the cell (in expanded window coordinates) lies outside of the raster
    pub fn is_synthetic(&self, row: usize, col: usize) -> bool {
        let outer = self.outer_size();
        row < self.pad_top || row >= outer.rows - self.pad_bottom || col < self.pad_left || col >= outer.cols - self.pad_right
    }

    pub fn has_synthetic_cells(&self) -> bool {
        self.pad_left + self.pad_right + self.pad_top + self.pad_bottom > 0
    }
}
