mod interface;
mod snapshot;

pub use interface::*;
pub use snapshot::*;
