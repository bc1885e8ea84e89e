//! Factory Metrics math utilities.

pub mod math;

pub use math::accumulate::*;
pub use math::round::*;
pub use math::stable::*;
