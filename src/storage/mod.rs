//! Local persistence.
//!
//! ```text
//! {data_dir}/
//! ├── failed_episodes.log      # unmatched episodes awaiting manual mapping
//! └── failed_episodes.log.bak  # previous version, written by clean-failures
//! ```

pub mod failure_log;

pub use failure_log::{FailureEntry, FailureLog};
