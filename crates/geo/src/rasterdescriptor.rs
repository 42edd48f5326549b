use approx::relative_eq;

use crate::{ArrayDataType, ArrayNum, GeoTransform, RasterSize, Window};

/// Describes a single raster band: its dimensions, pixel type, nodata sentinel and georeferencing.
/// Descriptors are immutable once a raster is opened, the engine only reads them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RasterDescriptor {
    pub size: RasterSize,
    pub data_type: ArrayDataType,
    /// The declared nodata sentinel, `None` means every pixel holds valid data
    pub nodata: Option<f64>,
    pub geo_transform: GeoTransform,
    /// Spatial reference (WKT or authority code)
    pub projection: String,
}

impl RasterDescriptor {
    pub fn new(size: RasterSize, data_type: ArrayDataType) -> Self {
        RasterDescriptor {
            size,
            data_type,
            nodata: None,
            geo_transform: GeoTransform::default(),
            projection: String::new(),
        }
    }

    pub fn with_nodata(self, nodata: Option<f64>) -> Self {
        Self { nodata, ..self }
    }

    pub fn with_geo_transform(self, geo_transform: GeoTransform) -> Self {
        Self { geo_transform, ..self }
    }

    pub fn with_projection(self, projection: impl Into<String>) -> Self {
        Self {
            projection: projection.into(),
            ..self
        }
    }

    pub fn width(&self) -> usize {
        self.size.cols
    }

    pub fn height(&self) -> usize {
        self.size.rows
    }

    pub fn window(&self) -> Window {
        Window::for_raster(self.size)
    }

    /// The nodata sentinel converted to the pixel type, `None` if not declared or not representable.
    pub fn nodata_as<T: ArrayNum>(&self) -> Option<T> {
        match self.nodata {
            Some(nd) if nd.is_nan() => T::TYPE.is_floating().then_some(T::NODATA),
            Some(nd) => T::from_f64_exact(nd),
            None => None,
        }
    }

    /// Descriptor for an output raster on the same grid, georeferencing is passed through unchanged.
    pub fn output_like(&self, data_type: ArrayDataType, nodata: Option<f64>) -> Self {
        RasterDescriptor {
            size: self.size,
            data_type,
            nodata,
            geo_transform: self.geo_transform,
            projection: self.projection.clone(),
        }
    }

    /// True if both rasters cover the same pixel grid (size, transform and projection).
    pub fn same_grid(&self, other: &RasterDescriptor) -> bool {
        self.size == other.size && relative_eq!(self.geo_transform, other.geo_transform) && self.projection == other.projection
    }
}

impl std::fmt::Display for RasterDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}, nodata: {:?}", self.size, self.data_type, self.nodata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodata_conversion() {
        let desc = RasterDescriptor::new(RasterSize::square(10), ArrayDataType::Int16).with_nodata(Some(-9999.0));
        assert_eq!(desc.nodata_as::<i16>(), Some(-9999));
        assert_eq!(desc.nodata_as::<u8>(), None);
        assert_eq!(desc.clone().with_nodata(Some(2.5)).nodata_as::<u8>(), None);
        assert_eq!(desc.clone().with_nodata(Some(2.5)).nodata_as::<f32>(), Some(2.5));
        assert_eq!(desc.nodata_as::<f32>(), Some(-9999.0));

        let nan_desc = desc.clone().with_nodata(Some(f64::NAN));
        assert!(nan_desc.nodata_as::<f32>().is_some_and(|v| v.is_nan()));
        assert_eq!(nan_desc.nodata_as::<i32>(), None);

        assert_eq!(desc.with_nodata(None).nodata_as::<i16>(), None);
    }

    #[test]
    fn output_passes_georeference() {
        let input = RasterDescriptor::new(RasterSize::with_rows_cols(4, 5), ArrayDataType::Uint8)
            .with_nodata(Some(255.0))
            .with_geo_transform(GeoTransform::new([10.0, 2.0, 0.0, 20.0, 0.0, -2.0]))
            .with_projection("EPSG:31370");

        let output = input.output_like(ArrayDataType::Float32, Some(-9999.0));
        assert_eq!(output.size, input.size);
        assert_eq!(output.geo_transform, input.geo_transform);
        assert_eq!(output.projection, "EPSG:31370");
        assert_eq!(output.data_type, ArrayDataType::Float32);
        assert!(output.same_grid(&input));

        let other = input.clone().with_projection("EPSG:4326");
        assert!(!other.same_grid(&input));
    }
}
