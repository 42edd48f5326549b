use crate::{
    ArrayNum, Error, RasterDescriptor, Result, Window,
    raster::{RasterReader, RasterWriter, check_window},
};

/// Raster band that lives completely in memory.
/// Implements both the reader and the writer side, cells are converted on access when the requested type differs.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryRaster<T: ArrayNum> {
    descriptor: RasterDescriptor,
    data: Vec<T>,
}

impl<T: ArrayNum> MemoryRaster<T> {
    pub fn new(descriptor: RasterDescriptor, data: Vec<T>) -> Result<Self> {
        if descriptor.data_type != T::TYPE {
            return Err(Error::InvalidArgument(format!(
                "Raster data type {} does not match the descriptor data type {}",
                T::TYPE,
                descriptor.data_type
            )));
        }

        if data.len() != descriptor.size.cell_count() {
            return Err(Error::InvalidArgument(format!(
                "Raster data length {} does not match the raster size {}",
                data.len(),
                descriptor.size
            )));
        }

        Ok(MemoryRaster { descriptor, data })
    }

    /// Creates a raster filled with the declared nodata value (or the type default when none is declared).
    pub fn create(descriptor: RasterDescriptor) -> Result<Self> {
        let fill = descriptor.nodata_as::<T>().unwrap_or(T::NODATA);
        Self::filled(descriptor, fill)
    }

    pub fn filled(descriptor: RasterDescriptor, value: T) -> Result<Self> {
        let data = vec![value; descriptor.size.cell_count()];
        Self::new(descriptor, data)
    }

    pub fn descriptor(&self) -> &RasterDescriptor {
        &self.descriptor
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn value(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.descriptor.size.rows || col >= self.descriptor.size.cols {
            return None;
        }

        Some(self.data[row * self.descriptor.size.cols + col])
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: T) {
        let cols = self.descriptor.size.cols;
        self.data[row * cols + col] = value;
    }
}

/// Values that are not representable in the target type (NaN to integer, out of range) become the target nodata.
fn convert<From: ArrayNum, To: ArrayNum>(value: From) -> To {
    inf::cast::value_or(value, To::NODATA)
}

impl<T: ArrayNum> RasterReader for MemoryRaster<T> {
    fn descriptor(&self) -> &RasterDescriptor {
        &self.descriptor
    }

    fn read_window<U: ArrayNum>(&self, window: &Window) -> Result<Vec<U>> {
        check_window(window, self.descriptor.size, None)?;

        let cols = self.descriptor.size.cols;
        let mut result = Vec::with_capacity(window.cell_count());
        for row in window.row_off..window.end_row() {
            let start = row * cols + window.col_off;
            result.extend(self.data[start..start + window.cols].iter().map(|&v| convert::<T, U>(v)));
        }

        Ok(result)
    }
}

impl<T: ArrayNum> RasterWriter for MemoryRaster<T> {
    fn descriptor(&self) -> &RasterDescriptor {
        &self.descriptor
    }

    fn write_window<U: ArrayNum>(&mut self, window: &Window, data: &[U]) -> Result {
        check_window(window, self.descriptor.size, Some(data.len()))?;
        if window.is_empty() {
            return Ok(());
        }

        let cols = self.descriptor.size.cols;
        for (row, src) in data.chunks_exact(window.cols).enumerate() {
            let start = (window.row_off + row) * cols + window.col_off;
            for (dst, &v) in self.data[start..start + window.cols].iter_mut().zip(src) {
                *dst = convert::<U, T>(v);
            }
        }

        Ok(())
    }

    fn flush(&mut self) -> Result {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArrayDataType, RasterSize};

    #[test]
    fn create_uses_declared_nodata() {
        let desc = RasterDescriptor::new(RasterSize::with_rows_cols(2, 3), ArrayDataType::Float32).with_nodata(Some(-9999.0));
        let ras = MemoryRaster::<f32>::create(desc).unwrap();
        assert!(ras.as_slice().iter().all(|&v| v == -9999.0));

        let desc = RasterDescriptor::new(RasterSize::with_rows_cols(2, 3), ArrayDataType::Uint8);
        let ras = MemoryRaster::<u8>::create(desc).unwrap();
        assert!(ras.as_slice().iter().all(|&v| v == u8::MAX));
    }

    #[test]
    fn type_mismatch() {
        let desc = RasterDescriptor::new(RasterSize::square(2), ArrayDataType::Int16);
        assert!(MemoryRaster::<u8>::new(desc.clone(), vec![0; 4]).is_err());
        assert!(MemoryRaster::<i16>::new(desc, vec![0; 3]).is_err());
    }

    #[test]
    fn write_window() {
        let desc = RasterDescriptor::new(RasterSize::with_rows_cols(3, 3), ArrayDataType::Int32);
        let mut ras = MemoryRaster::<i32>::filled(desc, 0).unwrap();

        ras.write_window(&Window::new(1, 1, 2, 2), &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(ras.as_slice(), &[0, 0, 0, 0, 1, 2, 0, 3, 4]);
        assert_eq!(ras.value(2, 2), Some(4));
        assert_eq!(ras.value(3, 0), None);

        assert!(ras.write_window(&Window::new(2, 2, 2, 1), &[1i32, 2]).is_err());
        assert!(ras.write_window(&Window::new(0, 0, 2, 1), &[1i32]).is_err());
    }

    #[test]
    fn unrepresentable_values_become_nodata() {
        let desc = RasterDescriptor::new(RasterSize::with_rows_cols(1, 2), ArrayDataType::Uint8);
        let mut ras = MemoryRaster::<u8>::filled(desc, 0).unwrap();
        ras.write_window(&Window::new(0, 0, 2, 1), &[f64::NAN, 300.0]).unwrap();
        assert_eq!(ras.as_slice(), &[u8::MAX, u8::MAX]);
    }
}
