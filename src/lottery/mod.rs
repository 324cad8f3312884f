mod allotment;
mod draw;
mod entry;
mod ledger;
mod selector;
mod winner;

pub use allotment::*;
pub use draw::*;
pub use entry::*;
pub use winner::*;
