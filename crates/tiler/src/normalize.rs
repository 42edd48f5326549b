//! Conversion between raster pixel values with their nodata sentinel and the normalized [`TileBlock`].

use geo::{ArrayNum, RasterDescriptor};

use crate::{Error, HaloWindow, Result, TileBlock};

/// How missing input cells are recognized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputNodata {
    /// The raster declares no nodata value: every value read from the raster is valid
    Undeclared,
    /// Cells equal to the sentinel are missing
    Sentinel(f64),
}

impl InputNodata {
    pub fn from_descriptor(descriptor: &RasterDescriptor) -> Self {
        match descriptor.nodata {
            Some(nodata) => InputNodata::Sentinel(nodata),
            None => InputNodata::Undeclared,
        }
    }

    pub fn is_declared(&self) -> bool {
        matches!(self, InputNodata::Sentinel(_))
    }
}

/// Maps raw pixel buffers to normalized tile blocks and back.
///
/// On input, synthetic halo cells and cells matching the declared sentinel become missing.
/// NaN is never a valid sample, floating point NaN cells are missing even without a declared sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodataNormalizer {
    input: InputNodata,
}

impl NodataNormalizer {
    pub fn new(input: InputNodata) -> Self {
        NodataNormalizer { input }
    }

    pub fn for_raster(descriptor: &RasterDescriptor) -> Self {
        Self::new(InputNodata::from_descriptor(descriptor))
    }

    pub fn input_nodata(&self) -> InputNodata {
        self.input
    }

    /// Normalizes the raw buffer of an expanded tile window, `raw` covers `halo.outer_size()` in row major order.
    pub fn to_internal<T: ArrayNum>(&self, raw: &[T], halo: &HaloWindow) -> Result<TileBlock> {
        let size = halo.outer_size();
        if raw.len() != size.cell_count() {
            return Err(Error::InvalidArgument(format!(
                "Raw tile buffer has {} cells, expected {} for {}",
                raw.len(),
                size.cell_count(),
                size
            )));
        }

        let sentinel = match self.input {
            InputNodata::Sentinel(nodata) if nodata.is_nan() => Some(T::NODATA).filter(|_| T::has_nan()),
            InputNodata::Sentinel(nodata) => {
                let sentinel = T::from_f64_exact(nodata);
                if sentinel.is_none() {
                    log::warn!("Nodata value {nodata} is not representable as {}, no cell will match it", T::TYPE);
                }
                sentinel
            }
            InputNodata::Undeclared => None,
        };

        let mut values = Vec::with_capacity(raw.len());
        let mut valid = Vec::with_capacity(raw.len());
        for (index, &v) in raw.iter().enumerate() {
            let missing = (halo.has_synthetic_cells() && halo.is_synthetic(index / size.cols, index % size.cols))
                || v.is_nan()
                || sentinel.is_some_and(|nd| v.matches_sentinel(nd));

            values.push(v.to_f64_lossy());
            valid.push(!missing);
        }

        TileBlock::from_parts(size, values, valid)
    }

    /// Converts a normalized block to output pixels, missing cells and values that can not be represented
    /// in the output type become `output_nodata` (or the type default when no output nodata is given).
    pub fn to_external<O: ArrayNum>(block: &TileBlock, output_nodata: Option<f64>) -> Result<Vec<O>> {
        let nodata = output_nodata_value::<O>(output_nodata)?;
        Ok(block
            .iter()
            .map(|value| value.and_then(|v| inf::cast::option::<O>(Some(v))).unwrap_or(nodata))
            .collect())
    }
}

/// The output nodata value as pixel type, it is a configuration error when it does not fit the type.
pub fn output_nodata_value<O: ArrayNum>(output_nodata: Option<f64>) -> Result<O> {
    match output_nodata {
        Some(nodata) if nodata.is_nan() && O::has_nan() => Ok(O::NODATA),
        Some(nodata) => O::from_f64_exact(nodata)
            .ok_or_else(|| Error::Configuration(format!("Output nodata value {nodata} does not fit the output type {}", O::TYPE))),
        None => Ok(O::NODATA),
    }
}
