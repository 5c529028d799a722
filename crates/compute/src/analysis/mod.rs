pub mod allocation;
pub mod statistics;

pub use allocation::*;
pub use statistics::*;
