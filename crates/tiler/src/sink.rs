use std::collections::HashSet;

use geo::{ArrayNum, RasterWriter, Window, dispatch_data_type};

use crate::{Error, NodataNormalizer, Result, TileBlock, normalize::output_nodata_value};

/// Destination of the finished tiles of a pass.
///
/// The engine calls `write_tile` from a single thread, in completion order (which is not the tile order
/// when running with multiple workers). Tiles are addressed by their absolute window only.
pub trait TileSink: Send {
    fn write_tile(&mut self, tile: &Window, block: TileBlock) -> Result;

    /// Called once after the last tile of a successful pass
    fn finish(&mut self) -> Result {
        Ok(())
    }
}

impl<S: TileSink> TileSink for &mut S {
    fn write_tile(&mut self, tile: &Window, block: TileBlock) -> Result {
        (**self).write_tile(tile, block)
    }

    fn finish(&mut self) -> Result {
        (**self).finish()
    }
}

fn check_output_nodata<O: ArrayNum>(nodata: Option<f64>) -> Result {
    output_nodata_value::<O>(nodata).map(|_| ())
}

fn write_block<O: ArrayNum>(writer: &mut impl RasterWriter, tile: &Window, block: &TileBlock, nodata: Option<f64>) -> Result {
    let data = NodataNormalizer::to_external::<O>(block, nodata)?;
    writer.write_window(tile, &data)
}

/// Streams finished tiles into a raster writer.
///
/// Missing cells are written as the nodata value of the output descriptor, values are converted to its pixel type.
/// Every tile can only be written once.
pub struct RasterSink<W: RasterWriter> {
    writer: W,
    written: HashSet<Window>,
}

impl<W: RasterWriter> RasterSink<W> {
    pub fn new(writer: W) -> Result<Self> {
        let desc = writer.descriptor();
        dispatch_data_type!(desc.data_type, check_output_nodata, desc.nodata)?;

        Ok(RasterSink {
            writer,
            written: HashSet::new(),
        })
    }

    pub fn tiles_written(&self) -> usize {
        self.written.len()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: RasterWriter> TileSink for RasterSink<W> {
    fn write_tile(&mut self, tile: &Window, block: TileBlock) -> Result {
        if block.size() != tile.size() {
            return Err(Error::BoundsViolation(format!(
                "Result block of size {} does not match tile {tile}",
                block.size()
            )));
        }

        if !self.written.insert(*tile) {
            return Err(Error::BoundsViolation(format!("Tile {tile} was already written")));
        }

        let desc = self.writer.descriptor();
        let (data_type, nodata) = (desc.data_type, desc.nodata);
        dispatch_data_type!(data_type, write_block, &mut self.writer, tile, &block, nodata)
    }

    fn finish(&mut self) -> Result {
        log::debug!("Flushing {} tiles", self.written.len());
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use geo::{ArrayDataType, MemoryRaster, RasterDescriptor, RasterSize};

    use super::*;

    #[test]
    fn writes_tiles_by_coordinates() {
        let desc = RasterDescriptor::new(RasterSize::with_rows_cols(2, 4), ArrayDataType::Int16).with_nodata(Some(-1.0));
        let mut sink = RasterSink::new(MemoryRaster::<i16>::create(desc).unwrap()).unwrap();

        let right = Window::new(2, 0, 2, 2);
        let left = Window::new(0, 0, 2, 2);
        sink.write_tile(&right, TileBlock::from_values(right.size(), vec![3.0, 4.0, 7.0, f64::NAN]).unwrap())
            .unwrap();
        sink.write_tile(&left, TileBlock::from_values(left.size(), vec![1.0, 2.0, 5.0, 6.0]).unwrap())
            .unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.tiles_written(), 2);
        assert_eq!(sink.into_inner().as_slice(), &[1, 2, 3, 4, 5, 6, 7, -1]);
    }

    #[test]
    fn duplicate_tile_is_rejected() {
        let desc = RasterDescriptor::new(RasterSize::square(2), ArrayDataType::Float32).with_nodata(Some(-9999.0));
        let mut sink = RasterSink::new(MemoryRaster::<f32>::create(desc).unwrap()).unwrap();

        let tile = Window::new(0, 0, 2, 2);
        sink.write_tile(&tile, TileBlock::missing(tile.size())).unwrap();
        assert!(matches!(
            sink.write_tile(&tile, TileBlock::missing(tile.size())),
            Err(Error::BoundsViolation(_))
        ));
    }

    #[test]
    fn block_size_must_match_tile() {
        let desc = RasterDescriptor::new(RasterSize::square(2), ArrayDataType::Float32);
        let mut sink = RasterSink::new(MemoryRaster::<f32>::create(desc).unwrap()).unwrap();
        assert!(sink.write_tile(&Window::new(0, 0, 2, 1), TileBlock::missing(RasterSize::square(2))).is_err());
    }

    #[test]
    fn output_nodata_must_fit_output_type() {
        let desc = RasterDescriptor::new(RasterSize::square(2), ArrayDataType::Uint8).with_nodata(Some(-9999.0));
        let raster = MemoryRaster::<u8>::filled(desc, 0).unwrap();
        assert!(matches!(RasterSink::new(raster), Err(Error::Configuration(_))));
    }
}
