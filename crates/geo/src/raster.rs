//! Windowed raster I/O boundary.
//!
//! Readers and writers operate on pixel windows of a single band, which is all the tile engine needs.
//! Formats and CRS handling stay behind these traits.

#[cfg(feature = "gdal")]
pub mod gdal;
mod memory;

#[cfg(feature = "gdal")]
#[doc(inline)]
pub use self::gdal::{GdalRasterReader, GdalRasterWriter, GdalWriteOptions};
#[doc(inline)]
pub use memory::MemoryRaster;

use crate::{ArrayNum, Error, RasterDescriptor, RasterSize, Result, Window};

/// Read access to a single raster band.
/// Readers are shared between worker threads, implementations synchronize access to the underlying handle.
pub trait RasterReader: Sync {
    fn descriptor(&self) -> &RasterDescriptor;

    /// Reads the cells of a window that lies completely inside the raster, row major.
    /// A window that exceeds the raster bounds is a `BoundsViolation`.
    fn read_window<T: ArrayNum>(&self, window: &Window) -> Result<Vec<T>>;

    /// Reads a window that may (partially) lie outside of the raster.
    /// The window is given by its top left cell which can be negative, out of raster positions contain `fill`.
    fn read_window_boundless<T: ArrayNum>(&self, col_off: isize, row_off: isize, size: RasterSize, fill: T) -> Result<Vec<T>> {
        let mut data = vec![fill; size.cell_count()];
        if size.is_empty() {
            return Ok(data);
        }

        let raster_size = self.descriptor().size;
        let start_col = col_off.max(0);
        let start_row = row_off.max(0);
        let end_col = (col_off + size.cols as isize).min(raster_size.cols as isize);
        let end_row = (row_off + size.rows as isize).min(raster_size.rows as isize);

        if end_col <= start_col || end_row <= start_row {
            return Ok(data);
        }

        let inner = Window::new(
            start_col as usize,
            start_row as usize,
            (end_col - start_col) as usize,
            (end_row - start_row) as usize,
        );
        let inner_data = self.read_window::<T>(&inner)?;

        let dst_col = (start_col - col_off) as usize;
        let dst_row = (start_row - row_off) as usize;
        for (row, src) in inner_data.chunks_exact(inner.cols).enumerate() {
            let start = (dst_row + row) * size.cols + dst_col;
            data[start..start + inner.cols].copy_from_slice(src);
        }

        Ok(data)
    }
}

/// Write access to a single raster band.
/// A writer is owned by exactly one thread, the engine funnels all tile results to it.
pub trait RasterWriter: Send {
    fn descriptor(&self) -> &RasterDescriptor;

    /// Writes the row major cells of a window that lies completely inside the raster.
    fn write_window<T: ArrayNum>(&mut self, window: &Window, data: &[T]) -> Result;

    /// Makes sure all written data reaches the underlying storage.
    fn flush(&mut self) -> Result;
}

impl<R: RasterReader> RasterReader for &R {
    fn descriptor(&self) -> &RasterDescriptor {
        (**self).descriptor()
    }

    fn read_window<T: ArrayNum>(&self, window: &Window) -> Result<Vec<T>> {
        (**self).read_window(window)
    }

    fn read_window_boundless<T: ArrayNum>(&self, col_off: isize, row_off: isize, size: RasterSize, fill: T) -> Result<Vec<T>> {
        (**self).read_window_boundless(col_off, row_off, size, fill)
    }
}

impl<W: RasterWriter> RasterWriter for &mut W {
    fn descriptor(&self) -> &RasterDescriptor {
        (**self).descriptor()
    }

    fn write_window<T: ArrayNum>(&mut self, window: &Window, data: &[T]) -> Result {
        (**self).write_window(window, data)
    }

    fn flush(&mut self) -> Result {
        (**self).flush()
    }
}

/// Verifies that the window lies inside the raster and, when given, that the buffer matches the window.
pub fn check_window(window: &Window, raster_size: RasterSize, data_len: Option<usize>) -> Result {
    if !window.is_within(raster_size) {
        return Err(Error::BoundsViolation(format!("Window {window} exceeds raster bounds {raster_size}")));
    }

    if let Some(len) = data_len
        && len != window.cell_count()
    {
        return Err(Error::InvalidArgument(format!(
            "Invalid data buffer provided: incorrect size (got {len} pixels but window {window} has {} pixels)",
            window.cell_count()
        )));
    }

    Ok(())
}
