use geo::{ArrayDataType, RasterDescriptor, RasterSize};

use crate::{Error, HaloWindow, ReduceFn, Reducer, Result, TileBlock, TileTransform};

/// Focal statistics configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FocalOptions {
    /// Width and height of the square window, must be a positive odd number
    pub kernel_size: usize,
    pub reducer: Reducer,
    pub output_nodata: f64,
    pub output_type: ArrayDataType,
}

impl Default for FocalOptions {
    fn default() -> Self {
        FocalOptions {
            kernel_size: 3,
            reducer: Reducer::Mean,
            output_nodata: -9999.0,
            output_type: ArrayDataType::Float32,
        }
    }
}

impl FocalOptions {
    pub fn validate(&self) -> Result {
        validate_kernel_size(self.kernel_size)?;
        if !self.output_type.can_represent(self.output_nodata) {
            return Err(Error::Configuration(format!(
                "Output nodata value {} does not fit the output type {}",
                self.output_nodata, self.output_type
            )));
        }

        Ok(())
    }

    /// Output raster on the input grid with the configured type and nodata
    pub fn output_descriptor(&self, input: &RasterDescriptor) -> RasterDescriptor {
        input.output_like(self.output_type, Some(self.output_nodata))
    }
}

fn validate_kernel_size(kernel_size: usize) -> Result {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(Error::Configuration(format!(
            "Kernel size must be a positive odd number, got {kernel_size}"
        )));
    }

    Ok(())
}

/// The square neighbourhood of the cells in a padded block.
/// The block must be padded with `radius` cells on every side, so every window of an output cell is complete.
pub struct WindowView<'a> {
    block: &'a TileBlock,
    radius: usize,
}

impl<'a> WindowView<'a> {
    pub fn new(block: &'a TileBlock, radius: usize) -> Result<Self> {
        let size = block.size();
        if size.rows < 2 * radius + 1 || size.cols < 2 * radius + 1 {
            return Err(Error::InvalidArgument(format!(
                "Block of size {size} is too small for a window radius of {radius}"
            )));
        }

        Ok(WindowView { block, radius })
    }

    /// Size of the unpadded output region
    pub fn output_size(&self) -> RasterSize {
        let size = self.block.size();
        RasterSize::with_rows_cols(size.rows - 2 * self.radius, size.cols - 2 * self.radius)
    }

    /// Collects the valid values of the window centered on output cell (row, col) into `values`.
    pub fn collect_valid(&self, row: usize, col: usize, values: &mut Vec<f64>) {
        values.clear();

        let cols = self.block.size().cols;
        let window_size = 2 * self.radius + 1;
        // Output cell (row, col) sits at (row + radius, col + radius) in the padded block
        for r in row..row + window_size {
            let start = r * cols + col;
            for index in start..start + window_size {
                if let Some(v) = self.block.value(index) {
                    values.push(v);
                }
            }
        }
    }
}

/// Moving window statistic that ignores missing cells.
#[derive(Debug, Clone)]
pub struct FocalTransform {
    reducer: Reducer,
    reduce: ReduceFn,
    radius: usize,
}

impl FocalTransform {
    pub fn new(kernel_size: usize, reducer: Reducer) -> Result<Self> {
        validate_kernel_size(kernel_size)?;

        Ok(FocalTransform {
            reducer,
            reduce: reducer.function(),
            radius: kernel_size / 2,
        })
    }

    pub fn from_options(options: &FocalOptions) -> Result<Self> {
        options.validate()?;
        Self::new(options.kernel_size, options.reducer)
    }

    pub fn reducer(&self) -> Reducer {
        self.reducer
    }

    pub fn kernel_size(&self) -> usize {
        2 * self.radius + 1
    }
}

impl TileTransform for FocalTransform {
    fn halo_radius(&self) -> usize {
        self.radius
    }

    fn requires_nodata(&self) -> bool {
        true
    }

    fn apply(&self, halo: &HaloWindow, block: &TileBlock) -> Result<TileBlock> {
        let view = WindowView::new(block, self.radius)?;
        let size = view.output_size();
        debug_assert_eq!(size, halo.tile.size());

        let mut result = TileBlock::missing(size);
        let mut values = Vec::with_capacity(self.kernel_size() * self.kernel_size());
        for row in 0..size.rows {
            for col in 0..size.cols {
                view.collect_valid(row, col, &mut values);
                result.set(row * size.cols + col, (self.reduce)(&mut values));
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use geo::Window;

    use super::*;

    fn padded_block(size: RasterSize, values: &[f64]) -> TileBlock {
        TileBlock::from_values(size, values.to_vec()).unwrap()
    }

    #[test]
    fn even_kernel_is_rejected() {
        assert!(matches!(FocalTransform::new(4, Reducer::Mean), Err(Error::Configuration(_))));
        assert!(matches!(FocalTransform::new(0, Reducer::Mean), Err(Error::Configuration(_))));
        assert!(FocalTransform::new(1, Reducer::Mean).is_ok());
        assert_eq!(FocalTransform::new(5, Reducer::Max).unwrap().halo_radius(), 2);
    }

    #[test]
    fn options() {
        assert!(FocalOptions::default().validate().is_ok());

        let options = FocalOptions {
            output_type: ArrayDataType::Uint8,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(Error::Configuration(_))));

        let options = FocalOptions {
            kernel_size: 2,
            ..Default::default()
        };
        assert!(matches!(FocalTransform::from_options(&options), Err(Error::Configuration(_))));
    }

    #[test]
    fn window_view_skips_missing() {
        let nan = f64::NAN;

        #[rustfmt::skip]
        let block = padded_block(RasterSize::square(4), &[
            nan, nan, nan, nan,
            nan, 1.0, 2.0, 3.0,
            nan, 4.0, nan, 6.0,
            nan, 7.0, 8.0, 9.0,
        ]);

        let view = WindowView::new(&block, 1).unwrap();
        assert_eq!(view.output_size(), RasterSize::square(2));

        let mut values = Vec::new();
        view.collect_valid(0, 0, &mut values);
        assert_eq!(values, vec![1.0, 2.0, 4.0]);

        view.collect_valid(1, 1, &mut values);
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn focal_mean_over_padded_tile() {
        let nan = f64::NAN;
        let raster_size = RasterSize::square(3);
        let halo = HaloWindow::expand(Window::for_raster(raster_size), 1, raster_size).unwrap();

        #[rustfmt::skip]
        let block = padded_block(halo.outer_size(), &[
            nan, nan, nan, nan, nan,
            nan, 1.0, 2.0, 3.0, nan,
            nan, 4.0, 5.0, 6.0, nan,
            nan, 7.0, 8.0, 9.0, nan,
            nan, nan, nan, nan, nan,
        ]);

        let result = FocalTransform::new(3, Reducer::Mean).unwrap().apply(&halo, &block).unwrap();
        assert_eq!(result.size(), raster_size);
        assert_relative_eq!(result.get(0, 0).unwrap(), 3.0);
        assert_relative_eq!(result.get(1, 1).unwrap(), 5.0);
        assert_relative_eq!(result.get(2, 1).unwrap(), 6.5);
    }

    #[test]
    fn window_without_valid_values_is_missing() {
        let raster_size = RasterSize::square(1);
        let halo = HaloWindow::expand(Window::for_raster(raster_size), 1, raster_size).unwrap();
        let block = TileBlock::missing(halo.outer_size());

        for reducer in [Reducer::Mean, Reducer::Majority, Reducer::UniqueCount] {
            let result = FocalTransform::new(3, reducer).unwrap().apply(&halo, &block).unwrap();
            assert_eq!(result.get(0, 0), None);
        }
    }
}
