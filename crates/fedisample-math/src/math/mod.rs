pub mod correlation;
pub mod describe;
pub mod lognormal;
pub mod stable;
