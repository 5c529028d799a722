pub mod interaction;
pub mod picking;
pub mod visibility;

pub use interaction::*;
pub use picking::*;
pub use visibility::*;
