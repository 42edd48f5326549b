#![warn(clippy::unwrap_used)]

//! Tiled raster transform engine.
//!
//! Rasters are processed tile by tile: every tile is read with an optional halo, its nodata cells are normalized
//! to missing values, a [`TileTransform`] computes the output tile and a [`TileSink`] stores it.
//! Memory use is bounded by the tile size and the number of workers, not by the raster size.

mod accumulator;
mod block;
mod engine;
mod focal;
mod halo;
mod normalize;
pub mod passes;
pub mod reducer;
mod sink;
mod statistics;
mod tilegrid;
mod transform;

pub use accumulator::OccurrenceAccumulator;
pub use block::TileBlock;
pub use engine::{EngineOptions, PassSummary, TileEngine};
pub use focal::{FocalOptions, FocalTransform, WindowView};
pub use halo::HaloWindow;
pub use normalize::{InputNodata, NodataNormalizer, output_nodata_value};
pub use passes::{convert_to_8bit, create_mask, focal_statistics, probability_of_phenomenon, substitute_values};
pub use reducer::{ReduceFn, Reducer};
pub use sink::{RasterSink, TileSink};
pub use statistics::RangeAccumulator;
pub use tilegrid::{TileGrid, TileIter};
pub use transform::{
    IdentityTransform, MaskRule, MaskTransform, OccurrenceTransform, RescaleTransform, SubstituteTransform, TileTransform,
};

pub type Error = inf::Error;
pub type Result<T = ()> = inf::Result<T>;
