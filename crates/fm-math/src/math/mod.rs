//! Core math modules.

pub mod accumulate;
pub mod round;
pub mod stable;
