//! Vidstage - staged before/after references and video-generation jobs
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod pipeline;
pub mod prompts;
