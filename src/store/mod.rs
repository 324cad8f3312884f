mod backoff;
mod memory;
mod outcome;
mod store;

#[cfg(feature = "database")]
mod postgres;
#[cfg(feature = "database")]
mod schema;

pub use backoff::*;
pub use memory::*;
pub use outcome::*;
#[cfg(feature = "database")]
pub use postgres::*;
#[cfg(feature = "database")]
pub use schema::*;
pub use store::*;
