mod mix;
mod ratio;

pub use mix::*;
pub use ratio::*;
