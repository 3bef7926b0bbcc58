mod base;
mod connection;
mod consolidator;
mod source;
mod store;

pub use base::*;
pub use connection::*;
pub use consolidator::*;
pub use source::*;
pub use store::*;
