mod calculator;
mod payoff;

pub use payoff::*;
