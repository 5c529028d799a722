pub mod category;
pub mod export;
pub mod feature;
pub mod symbology;

pub use category::*;
pub use feature::*;
pub use symbology::*;
