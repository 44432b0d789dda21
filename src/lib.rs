mod buffer;
mod checkpoint;
mod config;
mod errors;
mod slave;

pub(crate) mod constants;

pub use buffer::*;
pub use checkpoint::*;
pub use config::*;
pub use errors::*;
pub use slave::*;
