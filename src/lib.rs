//! Tiled raster processing with bounded memory.
//!
//! [`geo`] holds the raster data model and the windowed I/O traits, [`tiler`] the tile engine and its transforms,
//! [`inf`] the shared error, progress and cancellation types.

pub use geo;
pub use inf;
pub use tiler;

pub use inf::{Error, Result};
