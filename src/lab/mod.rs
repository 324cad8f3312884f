mod lab;

pub use lab::*;

#[cfg(test)]
mod tests;
