use geo::RasterSize;

use crate::{Error, Result};

/// Normalized sample buffer of a tile (optionally including its halo).
///
/// Every cell carries an explicit validity flag, the value of a missing cell is NaN.
/// Values are kept as `f64` regardless of the pixel type of the raster they were read from.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBlock {
    size: RasterSize,
    values: Vec<f64>,
    valid: Vec<bool>,
}

impl TileBlock {
    /// A block of the given size where every cell is missing
    pub fn missing(size: RasterSize) -> Self {
        TileBlock {
            size,
            values: vec![f64::NAN; size.cell_count()],
            valid: vec![false; size.cell_count()],
        }
    }

    pub fn from_parts(size: RasterSize, mut values: Vec<f64>, valid: Vec<bool>) -> Result<Self> {
        if values.len() != size.cell_count() || valid.len() != size.cell_count() {
            return Err(Error::InvalidArgument(format!(
                "Tile block of size {size} needs {} cells (got {} values and {} flags)",
                size.cell_count(),
                values.len(),
                valid.len()
            )));
        }

        for (value, _) in values.iter_mut().zip(&valid).filter(|(_, valid)| !**valid) {
            *value = f64::NAN;
        }

        Ok(TileBlock { size, values, valid })
    }

    /// Cells holding NaN are missing
    pub fn from_values(size: RasterSize, values: Vec<f64>) -> Result<Self> {
        let valid = values.iter().map(|v| !v.is_nan()).collect();
        Self::from_parts(size, values, valid)
    }

    pub fn size(&self) -> RasterSize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        self.valid[index]
    }

    /// The value at the row major index, `None` when missing
    #[inline]
    pub fn value(&self, index: usize) -> Option<f64> {
        self.valid[index].then(|| self.values[index])
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.value(row * self.size.cols + col)
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: Option<f64>) {
        match value {
            Some(v) => {
                self.values[index] = v;
                self.valid[index] = true;
            }
            None => {
                self.values[index] = f64::NAN;
                self.valid[index] = false;
            }
        }
    }

    /// The raw values, missing cells contain NaN
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn validity(&self) -> &[bool] {
        &self.valid
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values.iter().zip(&self.valid).map(|(&v, &valid)| valid.then_some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cells_hold_nan() {
        let block = TileBlock::from_parts(RasterSize::with_rows_cols(1, 3), vec![1.0, 2.0, 3.0], vec![true, false, true]).unwrap();
        assert_eq!(block.value(0), Some(1.0));
        assert_eq!(block.value(1), None);
        assert!(block.values()[1].is_nan());
        assert_eq!(block.valid_count(), 2);
        assert_eq!(block.iter().collect::<Vec<_>>(), vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn set_and_get() {
        let mut block = TileBlock::missing(RasterSize::with_rows_cols(2, 2));
        assert_eq!(block.valid_count(), 0);

        block.set(3, Some(-9999.0));
        assert_eq!(block.get(1, 1), Some(-9999.0));
        block.set(3, None);
        assert_eq!(block.get(1, 1), None);
    }

    #[test]
    fn size_mismatch() {
        assert!(TileBlock::from_values(RasterSize::square(2), vec![1.0; 3]).is_err());
        assert!(TileBlock::from_parts(RasterSize::square(1), vec![1.0], vec![]).is_err());
    }
}
