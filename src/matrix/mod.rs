mod game;
mod role;

pub use game::*;
pub use role::*;
