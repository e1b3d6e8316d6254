//! Orchestration from source images to a downloaded video.

pub mod executor;
pub mod providers;

pub use executor::{compose_files, Outcome, Pipeline, ProgressCallback, Staging, REFERENCE_FILENAME};
pub use providers::create_client;
