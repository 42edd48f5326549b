//! Complete passes built on the [`TileEngine`], each writing one output raster.

use geo::{ArrayNum, RasterDescriptor, RasterReader, RasterWriter};
use inf::progressinfo::{ProgressNotification, SubProgress};

use crate::{
    Error, FocalOptions, FocalTransform, IdentityTransform, MaskTransform, OccurrenceAccumulator, OccurrenceTransform, PassSummary,
    RangeAccumulator, RasterSink, RescaleTransform, Result, SubstituteTransform, TileEngine, TileGrid,
};

fn check_same_size(input: &RasterDescriptor, output: &RasterDescriptor) -> Result {
    if input.size != output.size {
        return Err(Error::SizeMismatch {
            size1: (input.size.rows, input.size.cols),
            size2: (output.size.rows, output.size.cols),
        });
    }

    Ok(())
}

/// Moving window statistic of `input`, the output should be created from [`FocalOptions::output_descriptor`].
pub fn focal_statistics<T: ArrayNum>(
    engine: &TileEngine,
    input: &impl RasterReader,
    output: &mut impl RasterWriter,
    options: &FocalOptions,
    progress: &impl ProgressNotification,
) -> Result<PassSummary> {
    let transform = FocalTransform::from_options(options)?;
    check_same_size(input.descriptor(), output.descriptor())?;

    let mut sink = RasterSink::new(output)?;
    engine.run::<T, _, _, _>(input, &transform, &mut sink, progress)
}

/// Validity mask of `input`: 1 for valid cells, 0 for nodata.
/// When `input` declares no nodata value, cells holding the lowest or highest value of its pixel type are nodata.
pub fn create_mask<T: ArrayNum>(
    engine: &TileEngine,
    input: &impl RasterReader,
    output: &mut impl RasterWriter,
    progress: &impl ProgressNotification,
) -> Result<PassSummary> {
    check_same_size(input.descriptor(), output.descriptor())?;

    let mut sink = RasterSink::new(output)?;
    engine.run::<T, _, _, _>(input, &MaskTransform::for_raster(input.descriptor()), &mut sink, progress)
}

/// Copy of `source` where cells equal to `value_to_replace` take the value of the `reference` raster.
pub fn substitute_values<T: ArrayNum>(
    engine: &TileEngine,
    source: &impl RasterReader,
    reference: &impl RasterReader,
    value_to_replace: f64,
    output: &mut impl RasterWriter,
    progress: &impl ProgressNotification,
) -> Result<PassSummary> {
    let transform = SubstituteTransform::new(source.descriptor(), reference, value_to_replace)?;
    check_same_size(source.descriptor(), output.descriptor())?;

    let mut sink = RasterSink::new(output)?;
    engine.run::<T, _, _, _>(source, &transform, &mut sink, progress)
}

/// Fraction of the input rasters in which every cell holds the phenomenon `value`.
/// All inputs must share the grid of the first one, returns the number of accumulated rasters.
pub fn probability_of_phenomenon<T: ArrayNum, R: RasterReader>(
    engine: &TileEngine,
    inputs: &[R],
    value: f64,
    output: &mut impl RasterWriter,
    progress: &impl ProgressNotification,
) -> Result<usize> {
    let first = inputs
        .first()
        .ok_or_else(|| Error::Configuration("No input rasters provided".to_string()))?
        .descriptor();

    for input in inputs {
        let desc = input.descriptor();
        check_same_size(first, desc)?;
        if !first.same_grid(desc) {
            return Err(Error::Configuration(
                "All input rasters must share the georeferencing and projection of the first raster".to_string(),
            ));
        }
    }
    check_same_size(first, output.descriptor())?;

    // one pass per input and the final write, reported as a single computation
    let tile_count = TileGrid::new(first.size, engine.options().tile_size)?.tile_count();
    progress.reset((tile_count * (inputs.len() + 1)) as u64);
    let stage_progress = SubProgress::new(progress);

    let mut accumulator = OccurrenceAccumulator::new(first.size);
    let transform = OccurrenceTransform::new(value);
    for (index, input) in inputs.iter().enumerate() {
        log::info!("Accumulating raster {}/{}", index + 1, inputs.len());
        engine.run::<T, _, _, _>(input, &transform, &mut accumulator, &stage_progress)?;
    }

    accumulator.write_probability(output, engine.options().tile_size, &stage_progress)?;
    Ok(accumulator.raster_count())
}

/// Linear stretch of `input` onto an 8 bit raster, the output should be created from [`RescaleTransform::output_descriptor`].
///
/// A first pass collects the value range of the valid cells, the second pass maps that range onto 0..=255.
/// Missing cells are written as 0.
pub fn convert_to_8bit<T: ArrayNum>(
    engine: &TileEngine,
    input: &impl RasterReader,
    output: &mut impl RasterWriter,
    progress: &impl ProgressNotification,
) -> Result<PassSummary> {
    check_same_size(input.descriptor(), output.descriptor())?;

    let tile_count = TileGrid::new(input.descriptor().size, engine.options().tile_size)?.tile_count();
    progress.reset(2 * tile_count as u64);
    let stage_progress = SubProgress::new(progress);

    let mut statistics = RangeAccumulator::new();
    engine.run::<T, _, _, _>(input, &IdentityTransform, &mut statistics, &stage_progress)?;

    let range = statistics.range().unwrap_or_else(|| {
        log::warn!("Input raster contains no valid cells, the output will be all zeros");
        0.0..=0.0
    });
    log::info!("Rescaling value range [{}, {}] to 8 bit", range.start(), range.end());

    let mut sink = RasterSink::new(output)?;
    engine.run::<T, _, _, _>(input, &RescaleTransform::new(range), &mut sink, &stage_progress)
}
