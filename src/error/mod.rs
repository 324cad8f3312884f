mod error;
mod rejection;

pub use error::*;
pub use rejection::*;
