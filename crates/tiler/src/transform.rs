use std::ops::RangeInclusive;

use geo::{ArrayDataType, RasterDescriptor, RasterReader, Window};

use crate::{Error, HaloWindow, InputNodata, NodataNormalizer, Result, TileBlock};

/// Per tile computation run by the [`crate::TileEngine`].
///
/// The input block covers the tile expanded with `halo_radius()` cells (synthetic cells are missing),
/// the returned block must cover exactly the unpadded tile.
/// Transforms are shared between the worker threads and must not keep per tile state.
pub trait TileTransform: Sync {
    /// Number of neighbouring cells needed on every side of a tile
    fn halo_radius(&self) -> usize {
        0
    }

    /// Transforms that rely on missing value semantics refuse to run on rasters without declared nodata
    fn requires_nodata(&self) -> bool {
        false
    }

    fn apply(&self, halo: &HaloWindow, block: &TileBlock) -> Result<TileBlock>;
}

impl<X: TileTransform> TileTransform for &X {
    fn halo_radius(&self) -> usize {
        (**self).halo_radius()
    }

    fn requires_nodata(&self) -> bool {
        (**self).requires_nodata()
    }

    fn apply(&self, halo: &HaloWindow, block: &TileBlock) -> Result<TileBlock> {
        (**self).apply(halo, block)
    }
}

/// Applies `f` to every cell of a block without halo
fn map_cells(block: &TileBlock, f: impl Fn(Option<f64>) -> Option<f64>) -> Result<TileBlock> {
    let mut result = TileBlock::missing(block.size());
    for (index, value) in block.iter().enumerate() {
        result.set(index, f(value));
    }

    Ok(result)
}

/// Which cells a [`MaskTransform`] marks as valid.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum MaskRule {
    /// Every cell that is not missing after normalization
    #[default]
    Validity,
    /// Cells equal to the lowest or highest value of the pixel type are invalid as well
    TypeBounds { min: f64, max: f64 },
}

/// Marks valid cells with 1, invalid cells become missing (and the mask nodata value 0 on output).
#[derive(Debug, Default, Clone, Copy)]
pub struct MaskTransform {
    rule: MaskRule,
}

impl MaskTransform {
    pub const VALID: f64 = 1.0;
    pub const NODATA: f64 = 0.0;

    pub fn new(rule: MaskRule) -> Self {
        MaskTransform { rule }
    }

    /// Treats the extremes of `data_type` as nodata, for rasters that do not declare a nodata value
    pub fn with_type_bounds(data_type: ArrayDataType) -> Self {
        Self::new(MaskRule::TypeBounds {
            min: data_type.min_value(),
            max: data_type.max_value(),
        })
    }

    /// Mask of the declared nodata, or of the type bounds when the raster declares none
    pub fn for_raster(input: &RasterDescriptor) -> Self {
        match InputNodata::from_descriptor(input) {
            InputNodata::Sentinel(_) => Self::default(),
            InputNodata::Undeclared => Self::with_type_bounds(input.data_type),
        }
    }

    pub fn rule(&self) -> MaskRule {
        self.rule
    }

    /// Byte raster on the input grid with 0 as nodata
    pub fn output_descriptor(input: &RasterDescriptor) -> RasterDescriptor {
        input.output_like(ArrayDataType::Uint8, Some(Self::NODATA))
    }
}

impl TileTransform for MaskTransform {
    fn apply(&self, _halo: &HaloWindow, block: &TileBlock) -> Result<TileBlock> {
        match self.rule {
            MaskRule::Validity => map_cells(block, |value| value.map(|_| Self::VALID)),
            MaskRule::TypeBounds { min, max } => {
                map_cells(block, |value| value.filter(|&v| v != min && v != max).map(|_| Self::VALID))
            }
        }
    }
}

/// Replaces source cells equal to `value_to_replace` with the cell of a reference raster on the same grid.
/// When the value to replace is the source nodata value, the missing source cells are replaced.
/// Missing reference cells yield missing output cells.
pub struct SubstituteTransform<'a, R: RasterReader> {
    reference: &'a R,
    normalizer: NodataNormalizer,
    value_to_replace: f64,
    replaces_missing: bool,
}

impl<'a, R: RasterReader> SubstituteTransform<'a, R> {
    pub fn new(source: &RasterDescriptor, reference: &'a R, value_to_replace: f64) -> Result<Self> {
        let reference_desc = reference.descriptor();
        if source.size != reference_desc.size {
            return Err(Error::SizeMismatch {
                size1: (source.size.rows, source.size.cols),
                size2: (reference_desc.size.rows, reference_desc.size.cols),
            });
        }

        if !source.same_grid(reference_desc) {
            return Err(Error::Configuration(
                "Source and reference raster must share the same georeferencing and projection".to_string(),
            ));
        }

        // Source cells holding the nodata value arrive as missing cells
        let replaces_missing = match InputNodata::from_descriptor(source) {
            InputNodata::Sentinel(nodata) => nodata == value_to_replace || (nodata.is_nan() && value_to_replace.is_nan()),
            InputNodata::Undeclared => value_to_replace.is_nan() && source.data_type.is_floating(),
        };

        Ok(SubstituteTransform {
            reference,
            normalizer: NodataNormalizer::for_raster(reference_desc),
            value_to_replace,
            replaces_missing,
        })
    }

    fn read_reference(&self, tile: Window) -> Result<TileBlock> {
        let halo = HaloWindow::expand(tile, 0, self.reference.descriptor().size)?;
        let raw = self.reference.read_window::<f64>(&tile)?;
        self.normalizer.to_internal(&raw, &halo)
    }
}

impl<R: RasterReader> TileTransform for SubstituteTransform<'_, R> {
    fn apply(&self, halo: &HaloWindow, block: &TileBlock) -> Result<TileBlock> {
        let reference = self.read_reference(halo.tile)?;
        let mut result = block.clone();
        for index in 0..block.len() {
            let replace = match block.value(index) {
                Some(value) => value == self.value_to_replace,
                None => self.replaces_missing,
            };

            if replace {
                result.set(index, reference.value(index));
            }
        }

        Ok(result)
    }
}

/// Marks cells holding the phenomenon value with 1 and other valid cells with 0.
#[derive(Debug, Clone, Copy)]
pub struct OccurrenceTransform {
    value: f64,
}

impl OccurrenceTransform {
    pub fn new(value: f64) -> Self {
        OccurrenceTransform { value }
    }
}

impl TileTransform for OccurrenceTransform {
    fn apply(&self, _halo: &HaloWindow, block: &TileBlock) -> Result<TileBlock> {
        map_cells(block, |value| value.map(|v| if v == self.value { 1.0 } else { 0.0 }))
    }
}

/// Passes the normalized input through unchanged, for passes that only collect statistics in their sink
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransform;

impl TileTransform for IdentityTransform {
    fn apply(&self, _halo: &HaloWindow, block: &TileBlock) -> Result<TileBlock> {
        Ok(block.clone())
    }
}

/// Linear stretch of an input value range onto the byte range 0..=255.
///
/// Values are truncated towards zero after scaling and clamped to the byte range.
/// Missing cells become 0, a range without extent maps every cell to 0.
#[derive(Debug, Clone)]
pub struct RescaleTransform {
    min: f64,
    scale: f64,
}

impl RescaleTransform {
    pub fn new(range: RangeInclusive<f64>) -> Self {
        let (min, max) = range.into_inner();
        let scale = if max > min { 255.0 / (max - min) } else { 0.0 };
        RescaleTransform { min, scale }
    }

    /// Byte raster on the input grid, every output value is valid data
    pub fn output_descriptor(input: &RasterDescriptor) -> RasterDescriptor {
        input.output_like(ArrayDataType::Uint8, None)
    }

    pub fn rescale(&self, value: f64) -> f64 {
        ((value - self.min) * self.scale).trunc().clamp(0.0, 255.0)
    }
}

impl TileTransform for RescaleTransform {
    fn apply(&self, _halo: &HaloWindow, block: &TileBlock) -> Result<TileBlock> {
        map_cells(block, |value| Some(value.map_or(0.0, |v| self.rescale(v))))
    }
}

#[cfg(test)]
mod tests {
    use geo::{GeoTransform, MemoryRaster, RasterSize};

    use super::*;

    fn tile_halo(size: RasterSize) -> HaloWindow {
        HaloWindow::expand(Window::for_raster(size), 0, size).unwrap()
    }

    #[test]
    fn mask() {
        let size = RasterSize::with_rows_cols(1, 3);
        let block = TileBlock::from_parts(size, vec![4.0, 0.0, -2.0], vec![true, false, true]).unwrap();
        let mask = MaskTransform::default().apply(&tile_halo(size), &block).unwrap();

        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![Some(1.0), None, Some(1.0)]);
        assert_eq!(NodataNormalizer::to_external::<u8>(&mask, Some(MaskTransform::NODATA)).unwrap(), vec![1, 0, 1]);
    }

    #[test]
    fn substitute() {
        let size = RasterSize::with_rows_cols(2, 2);
        let ref_desc = RasterDescriptor::new(size, ArrayDataType::Int16).with_nodata(Some(-1.0));
        let reference = MemoryRaster::<i16>::new(ref_desc.clone(), vec![10, 20, -1, 40]).unwrap();

        let source_desc = ref_desc.output_like(ArrayDataType::Uint8, Some(255.0));
        let transform = SubstituteTransform::new(&source_desc, &reference, 3.0).unwrap();

        let block = TileBlock::from_parts(size, vec![3.0, 5.0, 3.0, 0.0], vec![true, true, true, false]).unwrap();
        let result = transform.apply(&tile_halo(size), &block).unwrap();
        assert_eq!(result.iter().collect::<Vec<_>>(), vec![Some(10.0), Some(5.0), None, None]);
    }

    #[test]
    fn mask_without_declared_nodata_uses_type_bounds() {
        let size = RasterSize::with_rows_cols(1, 4);
        let desc = RasterDescriptor::new(size, ArrayDataType::Uint8);
        let transform = MaskTransform::for_raster(&desc);
        assert_eq!(transform.rule(), MaskRule::TypeBounds { min: 0.0, max: 255.0 });

        let block = TileBlock::from_values(size, vec![0.0, 5.0, 255.0, 7.0]).unwrap();
        let mask = transform.apply(&tile_halo(size), &block).unwrap();
        assert_eq!(NodataNormalizer::to_external::<u8>(&mask, Some(MaskTransform::NODATA)).unwrap(), vec![0, 1, 0, 1]);

        let declared = MaskTransform::for_raster(&desc.with_nodata(Some(7.0)));
        assert_eq!(declared.rule(), MaskRule::Validity);
    }

    #[test]
    fn substitute_source_nodata() {
        let size = RasterSize::with_rows_cols(1, 3);
        let source_desc = RasterDescriptor::new(size, ArrayDataType::Uint8).with_nodata(Some(2.0));
        let reference = MemoryRaster::<u8>::new(source_desc.clone().with_nodata(None), vec![10, 20, 30]).unwrap();
        let transform = SubstituteTransform::new(&source_desc, &reference, 2.0).unwrap();

        // the normalizer turned the source value 2 into a missing cell
        let block = TileBlock::from_parts(size, vec![1.0, 2.0, 3.0], vec![true, false, true]).unwrap();
        let result = transform.apply(&tile_halo(size), &block).unwrap();
        assert_eq!(result.iter().collect::<Vec<_>>(), vec![Some(1.0), Some(20.0), Some(3.0)]);

        // other missing cells stay missing when another value is replaced
        let transform = SubstituteTransform::new(&source_desc, &reference, 3.0).unwrap();
        let result = transform.apply(&tile_halo(size), &block).unwrap();
        assert_eq!(result.iter().collect::<Vec<_>>(), vec![Some(1.0), None, Some(30.0)]);
    }

    #[test]
    fn substitute_requires_same_grid() {
        let desc = RasterDescriptor::new(RasterSize::square(2), ArrayDataType::Float32);
        let reference = MemoryRaster::<f32>::filled(desc.clone(), 1.0).unwrap();

        let other_size = RasterDescriptor::new(RasterSize::square(3), ArrayDataType::Float32);
        assert!(matches!(
            SubstituteTransform::new(&other_size, &reference, 0.0),
            Err(Error::SizeMismatch { .. })
        ));

        let shifted = desc.with_geo_transform(GeoTransform::new([10.0, 1.0, 0.0, 0.0, 0.0, -1.0]));
        assert!(matches!(
            SubstituteTransform::new(&shifted, &reference, 0.0),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn rescale_to_bytes() {
        let size = RasterSize::with_rows_cols(1, 5);
        let block = TileBlock::from_parts(size, vec![-10.0, 0.0, 5.0, 10.0, 3.0], vec![true, true, true, true, false]).unwrap();
        let result = RescaleTransform::new(-10.0..=10.0).apply(&tile_halo(size), &block).unwrap();
        assert_eq!(NodataNormalizer::to_external::<u8>(&result, None).unwrap(), vec![0, 127, 191, 255, 0]);

        let flat = RescaleTransform::new(4.0..=4.0);
        assert_eq!(flat.rescale(4.0), 0.0);
    }

    #[test]
    fn occurrence() {
        let size = RasterSize::with_rows_cols(1, 4);
        let block = TileBlock::from_parts(size, vec![2.0, 7.0, 2.0, 2.0], vec![true, true, false, true]).unwrap();
        let result = OccurrenceTransform::new(2.0).apply(&tile_halo(size), &block).unwrap();
        assert_eq!(result.iter().collect::<Vec<_>>(), vec![Some(1.0), Some(0.0), None, Some(1.0)]);
    }
}
