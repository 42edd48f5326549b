use std::{
    sync::mpsc,
    time::{Duration, Instant},
};

use geo::{ArrayNum, RasterReader, RasterSize, Window};
use inf::{CancellationToken, progressinfo::ProgressNotification};
use rayon::prelude::*;

use crate::{Error, HaloWindow, NodataNormalizer, Result, TileBlock, TileGrid, TileSink, TileTransform};

/// Static engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineOptions {
    pub tile_size: RasterSize,
    /// Number of tiles processed concurrently, 1 processes all tiles on the calling thread
    pub worker_count: usize,
    /// Number of finished tiles that can wait for the writer
    pub queue_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        let worker_count = std::thread::available_parallelism().map_or(1, |n| n.get());
        EngineOptions {
            tile_size: RasterSize::square(256),
            worker_count,
            queue_depth: 2 * worker_count,
        }
    }
}

impl EngineOptions {
    pub fn with_tile_size(self, tile_size: RasterSize) -> Self {
        Self { tile_size, ..self }
    }

    pub fn with_worker_count(self, worker_count: usize) -> Self {
        Self {
            worker_count,
            queue_depth: 2 * worker_count,
            ..self
        }
    }

    pub fn validate(&self) -> Result {
        if self.tile_size.is_empty() {
            return Err(Error::Configuration(format!(
                "Tile size must be positive in both dimensions, got {}",
                self.tile_size
            )));
        }

        if self.worker_count == 0 {
            return Err(Error::Configuration("Worker count must be at least 1".to_string()));
        }

        if self.queue_depth == 0 {
            return Err(Error::Configuration("Queue depth must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Outcome of a completed pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub raster_size: RasterSize,
    pub tile_count: usize,
    pub halo_radius: usize,
    pub worker_count: usize,
    pub elapsed: Duration,
}

fn tile_error(tile: &Window, err: Error) -> Error {
    match err {
        Error::Cancelled | Error::TileIo { .. } => err,
        _ => Error::tile_io(tile.col_off, tile.row_off, tile.cols, tile.rows, err),
    }
}

/// Drives a tile transform over a complete raster.
///
/// Tiles are read with their halo, normalized, transformed and handed to a [`TileSink`].
/// With multiple workers the tiles are computed on a dedicated thread pool and funneled through a bounded
/// channel to a single writer thread that owns the sink, so at most `worker_count + queue_depth` finished tiles
/// are held in memory at any time.
pub struct TileEngine {
    options: EngineOptions,
    cancel: CancellationToken,
}

impl TileEngine {
    pub fn new(options: EngineOptions) -> Result<Self> {
        options.validate()?;
        Ok(TileEngine {
            options,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an external token to cancel passes, cancellation is checked before every tile
    pub fn with_cancellation(self, cancel: CancellationToken) -> Self {
        Self { cancel, ..self }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs one full pass of `transform` over `input`, reading the pixels as `T`.
    /// A pass either writes every tile or returns the first error, cancellation yields `Error::Cancelled`.
    pub fn run<T, R, X, S>(&self, input: &R, transform: &X, sink: &mut S, progress: &impl ProgressNotification) -> Result<PassSummary>
    where
        T: ArrayNum,
        R: RasterReader,
        X: TileTransform,
        S: TileSink,
    {
        let start = Instant::now();
        let desc = input.descriptor();
        if transform.requires_nodata() && desc.nodata.is_none() {
            return Err(Error::MissingNodata(desc.to_string()));
        }

        let grid = TileGrid::new(desc.size, self.options.tile_size)?;
        let pass = TilePass {
            input,
            transform,
            normalizer: NodataNormalizer::for_raster(desc),
            raster_size: desc.size,
        };

        log::info!(
            "Processing {} tiles of {} for raster {} (halo: {}, workers: {})",
            grid.tile_count(),
            grid.tile_size(),
            desc.size,
            transform.halo_radius(),
            self.options.worker_count
        );

        progress.reset(grid.tile_count() as u64);
        if self.options.worker_count <= 1 {
            self.run_inline::<T, _, _, _>(&pass, &grid, sink, progress)?;
        } else {
            self.run_parallel::<T, _, _, _>(&pass, &grid, sink, progress)?;
        }
        sink.finish()?;

        let summary = PassSummary {
            raster_size: desc.size,
            tile_count: grid.tile_count(),
            halo_radius: transform.halo_radius(),
            worker_count: self.options.worker_count,
            elapsed: start.elapsed(),
        };

        log::info!("Processed {} tiles in {:.2?}", summary.tile_count, summary.elapsed);
        Ok(summary)
    }

    fn run_inline<T: ArrayNum, R: RasterReader, X: TileTransform, S: TileSink>(
        &self,
        pass: &TilePass<'_, R, X>,
        grid: &TileGrid,
        sink: &mut S,
        progress: &impl ProgressNotification,
    ) -> Result {
        for tile in grid.iter() {
            self.cancel.check()?;
            let block = pass.process::<T>(&tile)?;
            sink.write_tile(&tile, block).map_err(|e| tile_error(&tile, e))?;
            progress.tick()?;
        }

        Ok(())
    }

    fn run_parallel<T: ArrayNum, R: RasterReader, X: TileTransform, S: TileSink>(
        &self,
        pass: &TilePass<'_, R, X>,
        grid: &TileGrid,
        sink: &mut S,
        progress: &impl ProgressNotification,
    ) -> Result {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.worker_count)
            .thread_name(|index| format!("tile-worker-{index}"))
            .build()
            .map_err(|e| Error::Runtime(format!("Failed to create tile worker pool: {e}")))?;

        // Stops the workers when the writer fails, without touching the caller's token
        let abort = CancellationToken::new();
        let (tx, rx) = mpsc::sync_channel::<(Window, TileBlock)>(self.options.queue_depth);

        std::thread::scope(|scope| {
            let writer_abort = abort.clone();
            let writer = scope.spawn(move || -> Result {
                for (tile, block) in rx {
                    log::debug!("Write tile {tile}");
                    let written = sink
                        .write_tile(&tile, block)
                        .map_err(|e| tile_error(&tile, e))
                        .and_then(|_| progress.tick());

                    if let Err(err) = written {
                        writer_abort.cancel();
                        return Err(err);
                    }
                }

                Ok(())
            });

            let worker_result = pool.install(|| {
                (0..grid.tile_count()).into_par_iter().try_for_each_with(tx, |tx, index| -> Result {
                    if abort.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    self.cancel.check()?;

                    let tile = grid
                        .tile(index)
                        .ok_or_else(|| Error::BoundsViolation(format!("Tile index {index} outside of the grid")))?;
                    let block = pass.process::<T>(&tile)?;
                    // A closed channel means the writer stopped, its error is reported instead
                    tx.send((tile, block)).map_err(|_| Error::Cancelled)
                })
            });

            let writer_result = writer
                .join()
                .map_err(|_| Error::Runtime("Tile writer thread panicked".to_string()))?;

            match (worker_result, writer_result) {
                (_, Err(writer_err)) => Err(writer_err),
                (Err(worker_err), Ok(())) => Err(worker_err),
                (Ok(()), Ok(())) => Ok(()),
            }
        })
    }
}

/// Per pass state shared by all workers
struct TilePass<'a, R: RasterReader, X: TileTransform> {
    input: &'a R,
    transform: &'a X,
    normalizer: NodataNormalizer,
    raster_size: RasterSize,
}

impl<R: RasterReader, X: TileTransform> TilePass<'_, R, X> {
    /// Read, normalize and transform a single tile
    fn process<T: ArrayNum>(&self, tile: &Window) -> Result<TileBlock> {
        let halo = HaloWindow::expand(*tile, self.transform.halo_radius(), self.raster_size)?;
        let (col_off, row_off) = halo.outer_origin();

        log::debug!("Process tile {tile}");
        let raw = self
            .input
            .read_window_boundless::<T>(col_off, row_off, halo.outer_size(), T::NODATA)
            .map_err(|e| tile_error(tile, e))?;

        let block = self.normalizer.to_internal(&raw, &halo)?;
        let result = self.transform.apply(&halo, &block).map_err(|e| tile_error(tile, e))?;
        if result.size() != tile.size() {
            return Err(Error::BoundsViolation(format!(
                "Transform produced a block of size {} for tile {tile}",
                result.size()
            )));
        }

        Ok(result)
    }
}
