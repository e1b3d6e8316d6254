//! # vidstage-jobs
//!
//! Submits long-running generation jobs to a provider, polls them to a
//! terminal state and downloads the result.
//!
//! - [`client`] defines the provider-agnostic [`GenerationJobClient`].
//! - [`providers`] adapts concrete APIs (OpenAI videos, Veo and Gemini on
//!   Vertex AI).
//! - [`poller`] drives a job to `completed` or `failed` under a timeout.
//! - [`clock`] lets tests simulate elapsed time.
//!
//! ## Example
//!
//! ```no_run
//! use vidstage_jobs::providers::{OpenAiConfig, OpenAiVideoClient};
//! use vidstage_jobs::{GenerationJobClient, JobPoller, JobRequest, PollConfig};
//!
//! # async fn run() -> vidstage_common::Result<()> {
//! let client = OpenAiVideoClient::new(OpenAiConfig::new("sk-..."))?;
//! let request = JobRequest::new("sora-2", "a slow sunrise", 4, "720x1280".parse()?);
//! let job = client.submit(&request).await?;
//! let done = JobPoller::new(PollConfig::default()).poll(&client, &job.id).await?;
//! let video = client.fetch_result(&done.id).await?;
//! # let _ = video;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod clock;
pub mod job;
pub mod poller;
pub mod providers;

pub use client::GenerationJobClient;
pub use clock::{Clock, ManualClock, TokioClock};
pub use job::{GenerationJob, JobRequest, JobStatus, ReferenceImage};
pub use poller::{JobPoller, PollConfig, PollTick, DEFAULT_INTERVAL, DEFAULT_TIMEOUT};
pub use providers::ProviderKind;
