//! GDAL backed raster reader and writer.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use gdal::{
    cpl::CslStringList,
    errors::GdalError,
    raster::{Buffer, GdalDataType},
};

use crate::{
    ArrayDataType, ArrayNum, Error, GeoTransform, RasterDescriptor, RasterSize, Result, Window,
    raster::{RasterReader, RasterWriter, check_window},
};

const BAND_INDEX: usize = 1;

impl TryFrom<GdalDataType> for ArrayDataType {
    type Error = Error;

    fn try_from(value: GdalDataType) -> std::result::Result<Self, Self::Error> {
        match value {
            GdalDataType::UInt8 => Ok(ArrayDataType::Uint8),
            GdalDataType::UInt16 => Ok(ArrayDataType::Uint16),
            GdalDataType::UInt32 => Ok(ArrayDataType::Uint32),
            GdalDataType::UInt64 => Ok(ArrayDataType::Uint64),
            GdalDataType::Int16 => Ok(ArrayDataType::Int16),
            GdalDataType::Int32 => Ok(ArrayDataType::Int32),
            GdalDataType::Int64 => Ok(ArrayDataType::Int64),
            GdalDataType::Float32 => Ok(ArrayDataType::Float32),
            GdalDataType::Float64 => Ok(ArrayDataType::Float64),
            _ => Err(Error::Runtime(format!("Unsupported GDAL data type: {value:?}"))),
        }
    }
}

/// GeoTIFF creation options for output rasters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdalWriteOptions {
    /// Compression algorithm (`COMPRESS` creation option), `None` writes uncompressed data
    pub compression: Option<String>,
    pub tiled: bool,
    /// Internal block size of tiled output, matches the engine tile size by default
    pub block_size: RasterSize,
}

impl Default for GdalWriteOptions {
    fn default() -> Self {
        GdalWriteOptions {
            compression: Some("LZW".to_string()),
            tiled: true,
            block_size: RasterSize::square(256),
        }
    }
}

impl GdalWriteOptions {
    fn to_csl(&self) -> Result<CslStringList> {
        let mut options = CslStringList::new();
        if let Some(compression) = &self.compression {
            options.set_name_value("COMPRESS", compression)?;
        }

        if self.tiled {
            options.set_name_value("TILED", "YES")?;
            options.set_name_value("BLOCKXSIZE", &self.block_size.cols.to_string())?;
            options.set_name_value("BLOCKYSIZE", &self.block_size.rows.to_string())?;
        }

        Ok(options)
    }
}

fn open_dataset(path: &Path) -> Result<gdal::Dataset> {
    let options = gdal::DatasetOptions {
        open_flags: gdal::GdalOpenFlags::GDAL_OF_READONLY | gdal::GdalOpenFlags::GDAL_OF_RASTER,
        ..Default::default()
    };

    gdal::Dataset::open_ex(path, options).map_err(|err| match err {
        // Give a cleaner error message when the file does not exist
        GdalError::NullPointer { .. } if !path.exists() => Error::InvalidPath(PathBuf::from(path)),
        _ => Error::Runtime(format!("Failed to open raster dataset: {} ({})", path.to_string_lossy(), err)),
    })
}

fn read_descriptor(ds: &gdal::Dataset) -> Result<RasterDescriptor> {
    let band = ds.rasterband(BAND_INDEX)?;
    let (width, height) = ds.raster_size();
    let geo_transform = ds.geo_transform().map(GeoTransform::from).unwrap_or_default();

    Ok(RasterDescriptor::new(RasterSize::with_rows_cols(height, width), band.band_type().try_into()?)
        .with_nodata(band.no_data_value())
        .with_geo_transform(geo_transform)
        .with_projection(ds.projection()))
}

/// Reads windows from the first band of a GDAL dataset.
/// Dataset handles are not thread safe, concurrent reads are serialized.
pub struct GdalRasterReader {
    ds: Mutex<gdal::Dataset>,
    descriptor: RasterDescriptor,
}

impl GdalRasterReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let ds = open_dataset(path.as_ref())?;
        let descriptor = read_descriptor(&ds)?;
        log::debug!("Opened {}: {}", path.as_ref().to_string_lossy(), descriptor);

        Ok(GdalRasterReader {
            ds: Mutex::new(ds),
            descriptor,
        })
    }
}

impl RasterReader for GdalRasterReader {
    fn descriptor(&self) -> &RasterDescriptor {
        &self.descriptor
    }

    fn read_window<T: ArrayNum>(&self, window: &Window) -> Result<Vec<T>> {
        check_window(window, self.descriptor.size, None)?;
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let buffer = {
            let ds = self.ds.lock().map_err(|_| Error::Runtime("GDAL dataset lock poisoned".to_string()))?;
            let band = ds.rasterband(BAND_INDEX)?;
            band.read_as::<f64>(
                (window.col_off as isize, window.row_off as isize),
                (window.cols, window.rows),
                (window.cols, window.rows),
                None,
            )?
        };

        Ok(buffer.data().iter().map(|&v| inf::cast::value_or(v, T::NODATA)).collect())
    }
}

/// Creates a GeoTIFF and writes windows into its single band.
pub struct GdalRasterWriter {
    ds: gdal::Dataset,
    descriptor: RasterDescriptor,
}

impl GdalRasterWriter {
    pub fn create(path: impl AsRef<Path>, descriptor: RasterDescriptor, options: &GdalWriteOptions) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let driver = gdal::DriverManager::get_driver_by_name("GTiff")?;
        let creation_options = options.to_csl()?;
        let (cols, rows) = (descriptor.size.cols, descriptor.size.rows);

        let mut ds = match descriptor.data_type {
            ArrayDataType::Uint8 => driver.create_with_band_type_with_options::<u8, _>(path, cols, rows, 1, &creation_options)?,
            ArrayDataType::Uint16 => driver.create_with_band_type_with_options::<u16, _>(path, cols, rows, 1, &creation_options)?,
            ArrayDataType::Uint32 => driver.create_with_band_type_with_options::<u32, _>(path, cols, rows, 1, &creation_options)?,
            ArrayDataType::Uint64 => driver.create_with_band_type_with_options::<u64, _>(path, cols, rows, 1, &creation_options)?,
            ArrayDataType::Int8 => {
                log::warn!("Int8 output is stored as Int16");
                driver.create_with_band_type_with_options::<i16, _>(path, cols, rows, 1, &creation_options)?
            }
            ArrayDataType::Int16 => driver.create_with_band_type_with_options::<i16, _>(path, cols, rows, 1, &creation_options)?,
            ArrayDataType::Int32 => driver.create_with_band_type_with_options::<i32, _>(path, cols, rows, 1, &creation_options)?,
            ArrayDataType::Int64 => driver.create_with_band_type_with_options::<i64, _>(path, cols, rows, 1, &creation_options)?,
            ArrayDataType::Float32 => driver.create_with_band_type_with_options::<f32, _>(path, cols, rows, 1, &creation_options)?,
            ArrayDataType::Float64 => driver.create_with_band_type_with_options::<f64, _>(path, cols, rows, 1, &creation_options)?,
        };

        ds.set_geo_transform(&descriptor.geo_transform.coefficients())?;
        if !descriptor.projection.is_empty() {
            ds.set_projection(&descriptor.projection)?;
        }

        if let Some(nodata) = descriptor.nodata {
            ds.rasterband(BAND_INDEX)?.set_no_data_value(Some(nodata))?;
        }

        log::debug!("Created {}: {}", path.to_string_lossy(), descriptor);
        Ok(GdalRasterWriter { ds, descriptor })
    }
}

impl RasterWriter for GdalRasterWriter {
    fn descriptor(&self) -> &RasterDescriptor {
        &self.descriptor
    }

    fn write_window<T: ArrayNum>(&mut self, window: &Window, data: &[T]) -> Result {
        check_window(window, self.descriptor.size, Some(data.len()))?;
        if window.is_empty() {
            return Ok(());
        }

        let values: Vec<f64> = data.iter().map(|v| v.to_f64_lossy()).collect();
        let mut buffer = Buffer::new((window.cols, window.rows), values);
        let mut band = self.ds.rasterband(BAND_INDEX)?;
        band.write((window.col_off as isize, window.row_off as isize), (window.cols, window.rows), &mut buffer)?;

        Ok(())
    }

    fn flush(&mut self) -> Result {
        self.ds.flush_cache()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::MemoryRaster;

    #[test]
    fn open_invalid_path() {
        let path = PathBuf::from("/this/does/not/exist.tif");
        let res = GdalRasterReader::open(&path);
        assert!(matches!(res, Err(Error::InvalidPath(p)) if p == path));
    }

    #[test_log::test]
    fn write_then_read_windows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.tif");

        let desc = RasterDescriptor::new(RasterSize::with_rows_cols(4, 6), ArrayDataType::Int16)
            .with_nodata(Some(-1.0))
            .with_geo_transform(GeoTransform::new([100.0, 10.0, 0.0, 200.0, 0.0, -10.0]));
        let source = MemoryRaster::<i16>::new(desc.clone(), (0..24).collect()).unwrap();

        {
            let mut writer = GdalRasterWriter::create(&path, desc.clone(), &GdalWriteOptions::default()).unwrap();
            let left = Window::new(0, 0, 3, 4);
            let right = Window::new(3, 0, 3, 4);
            writer.write_window(&right, &source.read_window::<i16>(&right).unwrap()).unwrap();
            writer.write_window(&left, &source.read_window::<i16>(&left).unwrap()).unwrap();
            writer.flush().unwrap();
        }

        let reader = GdalRasterReader::open(&path).unwrap();
        assert_eq!(reader.descriptor().size, desc.size);
        assert_eq!(reader.descriptor().data_type, ArrayDataType::Int16);
        assert_eq!(reader.descriptor().nodata, Some(-1.0));
        assert_eq!(reader.descriptor().geo_transform, desc.geo_transform);
        assert_eq!(reader.read_window::<i16>(&Window::new(0, 0, 6, 4)).unwrap(), source.as_slice());
        assert_eq!(reader.read_window::<i16>(&Window::new(4, 2, 2, 1)).unwrap(), vec![16, 17]);
    }
}
