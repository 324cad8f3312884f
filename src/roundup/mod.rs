mod aggregator;
mod roundup;

pub use roundup::*;
