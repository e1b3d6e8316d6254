//! Provider-agnostic job client contract.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use vidstage_common::Result;

use crate::job::{GenerationJob, JobRequest};

/// Async trait that all generation providers implement.
///
/// Each implementation wraps a single external API and maps its status
/// vocabulary onto [`JobStatus`](crate::JobStatus). Implementations hold
/// credentials passed to their constructor; none read process environment.
#[async_trait]
pub trait GenerationJobClient: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"openai"`).
    fn name(&self) -> &'static str;

    /// Create a job. The request is validated before any network traffic.
    async fn submit(&self, request: &JobRequest) -> Result<GenerationJob>;

    /// Fetch a fresh status snapshot. Read-only and safe to repeat.
    async fn fetch_status(&self, id: &str) -> Result<GenerationJob>;

    /// Download the finished artifact.
    ///
    /// Every implementation confirms the job is `completed` before touching
    /// the artifact, and fails with a request error otherwise, instead of
    /// relying on the provider to reject the download.
    async fn fetch_result(&self, id: &str) -> Result<Bytes>;
}

#[async_trait]
impl<T: GenerationJobClient + ?Sized> GenerationJobClient for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn submit(&self, request: &JobRequest) -> Result<GenerationJob> {
        (**self).submit(request).await
    }

    async fn fetch_status(&self, id: &str) -> Result<GenerationJob> {
        (**self).fetch_status(id).await
    }

    async fn fetch_result(&self, id: &str) -> Result<Bytes> {
        (**self).fetch_result(id).await
    }
}
