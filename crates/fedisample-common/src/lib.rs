//! Fedisample common types, errors and configuration.
//!
//! This crate provides foundational pieces shared across fedisample-core
//! modules:
//! - The tabular instance dataset and its statistic keys
//! - Common error types with stable codes
//! - Configuration loading and validation
//! - Output artifact writers (sample CSV, instance list, rejected ids)

pub mod config;
pub mod error;
pub mod output;
pub mod types;

pub use config::{Config, CrawlConfig, ProbeConfig, SampleConfig, StoreConfig};
pub use error::{Error, ErrorCategory, Result};
pub use output::{write_instance_list, write_rejected_json, write_sample_csv};
pub use types::{Dataset, InstanceRecord, LoadStats, SampleResult, StatKey};
