#![warn(clippy::unwrap_used)]

pub type Result<T = ()> = std::result::Result<T, Error>;
mod arraydatatype;
mod arraynum;
mod geotransform;
mod macros;
mod nodata;
pub mod raster;
mod rasterdescriptor;
mod rastersize;
mod window;

#[doc(inline)]
pub use arraydatatype::ArrayDataType;
#[doc(inline)]
pub use arraynum::ArrayNum;
#[doc(inline)]
pub use geotransform::GeoTransform;
#[doc(inline)]
pub use nodata::Nodata;
#[doc(inline)]
pub use raster::{MemoryRaster, RasterReader, RasterWriter};
#[doc(inline)]
pub use rasterdescriptor::RasterDescriptor;
#[doc(inline)]
pub use rastersize::RasterSize;
#[doc(inline)]
pub use window::Window;

pub use inf::Error;

pub type Point<T = f64> = geo_types::Point<T>;
