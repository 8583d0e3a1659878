//! Fedisample math utilities.

pub mod math;

pub use math::correlation::*;
pub use math::describe::*;
pub use math::lognormal::*;
pub use math::stable::*;
