pub mod ids;
pub mod math;
pub mod point;

// Foundation crate: small, well-tested primitives only.
pub use ids::*;
pub use point::*;
