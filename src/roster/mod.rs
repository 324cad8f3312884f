mod choice;
mod player;
mod seat;

pub use choice::*;
pub use player::*;
pub use seat::*;
