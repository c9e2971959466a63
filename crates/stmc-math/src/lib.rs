//! STMC math utilities.

pub mod math;

pub use math::bernoulli;
pub use math::evidence;
pub use math::stable::*;
