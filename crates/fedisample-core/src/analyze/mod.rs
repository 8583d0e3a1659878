//! Statistical analysis over a loaded dataset: correlation-driven choice of
//! stratification statistics, and per-instance likelihood weighting.

pub mod correlate;
pub mod fit;

pub use correlate::{correlate, CorrelationReport};
pub use fit::{assign_weights, FittedStat};
