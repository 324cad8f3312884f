mod experiment;
mod phase;

#[cfg(feature = "server")]
mod config;

#[cfg(feature = "server")]
pub use config::*;
pub use experiment::*;
pub use phase::*;
