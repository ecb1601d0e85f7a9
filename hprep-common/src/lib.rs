//! # hprep Common Library
//!
//! Shared code for the hash-training data preparation pipelines:
//! - Error type
//! - Configuration loading
//! - Tracing setup
//! - Pair keys and the `{dataset}_{id}_{md5}` naming scheme
//! - Alignment diagnostics records
//! - Feature matrix and training example codecs

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod features;
pub mod logging;
pub mod pairs;

pub use config::HprepConfig;
pub use diagnostics::AlignmentDiagnostics;
pub use error::{Error, Result};
pub use pairs::{CandidatePair, PairKey};
