mod controller;
mod policy;

pub use policy::*;
