#![warn(clippy::unwrap_used)]

pub use error::Error;
pub type Result<T = ()> = std::result::Result<T, Error>;

pub mod cancellation;
pub mod cast;
mod error;
pub mod progressinfo;

#[doc(inline)]
pub use cancellation::CancellationToken;
