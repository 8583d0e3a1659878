//! Fedisample core — instance statistics, sampling and crawling.
//!
//! The pipeline: raw per-instance JSONL goes through the [`load`] module
//! into a tabular [`fedisample_common::Dataset`]; [`analyze`] picks
//! stratification statistics and assigns inverse-likelihood weights;
//! [`select`] draws either a weighted sample with probe-driven rejection
//! top-up or a percentile-stratified sample; [`crawl`] and [`store`] follow
//! the chosen instances' public timelines into a line-delimited file.

pub mod analyze;
pub mod crawl;
pub mod exit_codes;
pub mod load;
pub mod logging;
pub mod obtain;
pub mod probe;
pub mod select;
pub mod store;
