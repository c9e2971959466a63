//! Core math modules.

pub mod bernoulli;
pub mod evidence;
pub mod stable;
