use geo::{RasterSize, Window};

use crate::{Error, Result};

/// Partitions a raster into non-overlapping output tiles.
///
/// Tiles are numbered in row major order: all tiles of the first tile row from left to right, then the next row.
/// The last tile of every row and column is clipped to the raster bounds.
/// The grid holds no cursor state, so iterating it again yields the exact same sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    raster_size: RasterSize,
    tile_size: RasterSize,
    tiles_x: usize,
    tiles_y: usize,
}

impl TileGrid {
    pub fn new(raster_size: RasterSize, tile_size: RasterSize) -> Result<Self> {
        if tile_size.is_empty() {
            return Err(Error::Configuration(format!("Tile size must be positive in both dimensions, got {tile_size}")));
        }

        Ok(TileGrid {
            raster_size,
            tile_size,
            tiles_x: raster_size.cols.div_ceil(tile_size.cols),
            tiles_y: raster_size.rows.div_ceil(tile_size.rows),
        })
    }

    pub fn raster_size(&self) -> RasterSize {
        self.raster_size
    }

    pub fn tile_size(&self) -> RasterSize {
        self.tile_size
    }

    /// Number of tiles in a tile row
    pub fn tiles_x(&self) -> usize {
        self.tiles_x
    }

    /// Number of tile rows
    pub fn tiles_y(&self) -> usize {
        self.tiles_y
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_x * self.tiles_y
    }

    /// The tile with the given row major index
    pub fn tile(&self, index: usize) -> Option<Window> {
        if index >= self.tile_count() {
            return None;
        }

        let col_off = (index % self.tiles_x) * self.tile_size.cols;
        let row_off = (index / self.tiles_x) * self.tile_size.rows;

        Some(Window::new(
            col_off,
            row_off,
            self.tile_size.cols.min(self.raster_size.cols - col_off),
            self.tile_size.rows.min(self.raster_size.rows - row_off),
        ))
    }

    pub fn iter(&self) -> TileIter {
        TileIter {
            grid: *self,
            index: 0,
        }
    }
}

impl IntoIterator for &TileGrid {
    type Item = Window;
    type IntoIter = TileIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy row major iterator over the tiles of a [`TileGrid`]
#[derive(Debug, Clone)]
pub struct TileIter {
    grid: TileGrid,
    index: usize,
}

impl Iterator for TileIter {
    type Item = Window;

    fn next(&mut self) -> Option<Self::Item> {
        let tile = self.grid.tile(self.index)?;
        self.index += 1;
        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.tile_count().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileIter {}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_exact_cover(raster_size: RasterSize, tile_size: RasterSize) {
        let grid = TileGrid::new(raster_size, tile_size).unwrap();
        let mut coverage = vec![0u8; raster_size.cell_count()];

        for tile in grid.iter() {
            assert!(tile.is_within(raster_size), "{tile} exceeds {raster_size}");
            assert!(!tile.is_empty());
            for row in tile.row_off..tile.end_row() {
                for col in tile.col_off..tile.end_col() {
                    coverage[row * raster_size.cols + col] += 1;
                }
            }
        }

        assert!(coverage.iter().all(|&c| c == 1), "{raster_size} with tiles {tile_size} not covered exactly once");
    }

    #[test]
    fn tiles_cover_raster_exactly_once() {
        for rows in [1, 7, 10, 33] {
            for cols in [1, 5, 10, 64] {
                for tile_size in [
                    RasterSize::square(1),
                    RasterSize::square(3),
                    RasterSize::with_rows_cols(4, 7),
                    RasterSize::square(100),
                ] {
                    assert_exact_cover(RasterSize::with_rows_cols(rows, cols), tile_size);
                }
            }
        }
    }

    #[test]
    fn row_major_order() {
        let grid = TileGrid::new(RasterSize::with_rows_cols(5, 7), RasterSize::square(3)).unwrap();
        assert_eq!(grid.tile_count(), 6);

        let tiles: Vec<Window> = grid.iter().collect();
        assert_eq!(
            tiles,
            vec![
                Window::new(0, 0, 3, 3),
                Window::new(3, 0, 3, 3),
                Window::new(6, 0, 1, 3),
                Window::new(0, 3, 3, 2),
                Window::new(3, 3, 3, 2),
                Window::new(6, 3, 1, 2),
            ]
        );
    }

    #[test]
    fn restartable() {
        let grid = TileGrid::new(RasterSize::with_rows_cols(10, 12), RasterSize::with_rows_cols(4, 5)).unwrap();
        let mut iter = grid.iter();
        assert_eq!(iter.len(), 9);
        iter.next();
        assert_eq!(iter.len(), 8);

        let first: Vec<Window> = grid.iter().collect();
        let second: Vec<Window> = (&grid).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(grid.tile(8), first.last().copied());
        assert_eq!(grid.tile(9), None);
    }

    #[test]
    fn invalid_tile_size() {
        let size = RasterSize::square(10);
        assert!(matches!(
            TileGrid::new(size, RasterSize::with_rows_cols(0, 10)),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            TileGrid::new(size, RasterSize::with_rows_cols(10, 0)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn empty_raster_has_no_tiles() {
        let grid = TileGrid::new(RasterSize::with_rows_cols(0, 10), RasterSize::square(4)).unwrap();
        assert_eq!(grid.tile_count(), 0);
        assert_eq!(grid.iter().next(), None);
    }
}
