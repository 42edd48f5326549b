use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Raster '{0}' declares no nodata value, but the transform requires missing value semantics")]
    MissingNodata(String),
    #[error("IO failure on tile (col: {col_off}, row: {row_off}, {cols}x{rows}): {source}")]
    TileIo {
        col_off: usize,
        row_off: usize,
        cols: usize,
        rows: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("Bounds violation: {0}")]
    BoundsViolation(String),
    #[error("Raster dimensions do not match ({}x{}) <-> ({}x{})", .size1.0, .size1.1, .size2.0, .size2.1)]
    SizeMismatch {
        size1: (usize, usize),
        size2: (usize, usize),
    },
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Invalid path: {0}")]
    InvalidPath(std::path::PathBuf),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    GdalError(#[from] gdal::errors::GdalError),
}

impl Error {
    /// Wraps a read or write failure with the pixel window of the tile that was being processed.
    pub fn tile_io(col_off: usize, row_off: usize, cols: usize, rows: usize, source: Error) -> Self {
        Error::TileIo {
            col_off,
            row_off,
            cols,
            rows,
            source: Box::new(source),
        }
    }

    /// The (col_off, row_off, cols, rows) of the failed tile, if this is a tile IO failure.
    pub fn tile_coordinates(&self) -> Option<(usize, usize, usize, usize)> {
        match self {
            Error::TileIo {
                col_off, row_off, cols, rows, ..
            } => Some((*col_off, *row_off, *cols, *rows)),
            _ => None,
        }
    }

    /// Configuration and pre-flight errors are detected before any raster IO takes place.
    pub fn is_preflight(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::MissingNodata(_))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::InvalidArgument(err.to_string())
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::InvalidArgument(err.to_string())
    }
}
