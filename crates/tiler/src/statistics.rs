use std::ops::RangeInclusive;

use geo::Window;

use crate::{Result, TileBlock, TileSink};

/// Sink that only keeps the value range of the valid cells of the tiles it receives.
///
/// Used as the first pass of a two pass operation that needs a global statistic of the input,
/// it holds no tile data so its memory use does not depend on the raster size.
#[derive(Debug, Clone, Default)]
pub struct RangeAccumulator {
    range: Option<(f64, f64)>,
    value_count: usize,
}

impl RangeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smallest and largest valid value seen, `None` when every cell was missing
    pub fn range(&self) -> Option<RangeInclusive<f64>> {
        self.range.map(|(min, max)| min..=max)
    }

    /// Number of valid cells seen
    pub fn value_count(&self) -> usize {
        self.value_count
    }
}

impl TileSink for RangeAccumulator {
    fn write_tile(&mut self, _tile: &Window, block: TileBlock) -> Result {
        for value in block.iter().flatten() {
            self.value_count += 1;
            self.range = Some(match self.range {
                Some((min, max)) => (min.min(value), max.max(value)),
                None => (value, value),
            });
        }

        Ok(())
    }
}
