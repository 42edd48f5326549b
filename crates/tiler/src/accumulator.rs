use geo::{ArrayDataType, RasterDescriptor, RasterSize, RasterWriter, Window};
use inf::progressinfo::ProgressNotification;

use crate::{Error, RasterSink, Result, TileBlock, TileGrid, TileSink};

/// Occurrence counts of a phenomenon over a set of input rasters.
///
/// The counts cover the full output grid and live for the duration of a multi raster pass:
/// [`OccurrenceAccumulator::reset`] at the start, one engine pass per input raster (with the accumulator as sink),
/// then [`OccurrenceAccumulator::write_probability`].
/// A failed pass leaves partial counts behind, restarting requires a reset.
#[derive(Debug, Clone)]
pub struct OccurrenceAccumulator {
    size: RasterSize,
    counts: Vec<u32>,
    raster_count: usize,
}

impl OccurrenceAccumulator {
    pub fn new(size: RasterSize) -> Self {
        OccurrenceAccumulator {
            size,
            counts: vec![0; size.cell_count()],
            raster_count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.counts.fill(0);
        self.raster_count = 0;
    }

    pub fn raster_size(&self) -> RasterSize {
        self.size
    }

    /// Number of input rasters that were accumulated completely
    pub fn raster_count(&self) -> usize {
        self.raster_count
    }

    pub fn count(&self, row: usize, col: usize) -> u32 {
        self.counts[row * self.size.cols + col]
    }

    /// Output descriptor for the probability raster on the grid of the inputs
    pub fn output_descriptor(input: &RasterDescriptor) -> RasterDescriptor {
        input.output_like(ArrayDataType::Float32, None)
    }

    /// The occurrence probability (count / number of rasters) of the cells in the window
    pub fn probability(&self, window: &Window) -> Result<TileBlock> {
        if self.raster_count == 0 {
            return Err(Error::Configuration("No input rasters were accumulated".to_string()));
        }

        if !window.is_within(self.size) {
            return Err(Error::BoundsViolation(format!("Window {window} exceeds the accumulator size {}", self.size)));
        }

        let total = self.raster_count as f64;
        let mut values = Vec::with_capacity(window.cell_count());
        for row in window.row_off..window.end_row() {
            let start = row * self.size.cols + window.col_off;
            values.extend(self.counts[start..start + window.cols].iter().map(|&c| c as f64 / total));
        }

        TileBlock::from_values(window.size(), values)
    }

    /// Streams the probabilities to the writer, tile by tile
    pub fn write_probability<W: RasterWriter>(&self, writer: W, tile_size: RasterSize, progress: &impl ProgressNotification) -> Result<W> {
        if writer.descriptor().size != self.size {
            return Err(Error::SizeMismatch {
                size1: (self.size.rows, self.size.cols),
                size2: (writer.descriptor().size.rows, writer.descriptor().size.cols),
            });
        }

        let grid = TileGrid::new(self.size, tile_size)?;
        progress.reset(grid.tile_count() as u64);

        let mut sink = RasterSink::new(writer)?;
        for tile in grid.iter() {
            sink.write_tile(&tile, self.probability(&tile)?)
                .map_err(|e| Error::tile_io(tile.col_off, tile.row_off, tile.cols, tile.rows, e))?;
            progress.tick()?;
        }

        sink.finish()?;
        log::info!("Probability written for {} rasters", self.raster_count);
        Ok(sink.into_inner())
    }
}

impl TileSink for OccurrenceAccumulator {
    /// Adds the occurrences (cells with value 1) of the tile
    fn write_tile(&mut self, tile: &Window, block: TileBlock) -> Result {
        if !tile.is_within(self.size) || block.size() != tile.size() {
            return Err(Error::BoundsViolation(format!(
                "Occurrence tile {tile} does not fit the accumulator of size {}",
                self.size
            )));
        }

        for (row, values) in block.values().chunks_exact(tile.cols).enumerate() {
            let start = (tile.row_off + row) * self.size.cols + tile.col_off;
            for (count, &value) in self.counts[start..start + tile.cols].iter_mut().zip(values) {
                if value == 1.0 {
                    *count += 1;
                }
            }
        }

        Ok(())
    }

    /// Completes the accumulation of one input raster
    fn finish(&mut self) -> Result {
        self.raster_count += 1;
        Ok(())
    }
}
