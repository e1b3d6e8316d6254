//! OpenAI video generation (`/v1/videos`) adapter.
//!
//! Jobs are created with a single multipart request, polled with
//! `GET /videos/{id}` and downloaded from `GET /videos/{id}/content`.
//! Downloads check the status first, so an unfinished or failed job never
//! reaches the content endpoint.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use vidstage_common::{Error, Result};

use super::http::{self, REQUEST_TIMEOUT};
use crate::client::GenerationJobClient;
use crate::job::{GenerationJob, JobRequest, JobStatus, ReferenceImage};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for [`OpenAiVideoClient`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// API root including the version segment.
    pub base_url: String,
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Video object as returned by create and status calls.
#[derive(Debug, Deserialize)]
struct VideoObject {
    id: String,
    status: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    error: Option<Value>,
}

impl VideoObject {
    fn into_job(self) -> GenerationJob {
        GenerationJob {
            status: map_status(&self.status),
            id: self.id,
            progress: self.progress,
            error: self.error.filter(|e| !e.is_null()),
        }
    }
}

/// Map the OpenAI status vocabulary onto [`JobStatus`].
fn map_status(raw: &str) -> JobStatus {
    match raw {
        "queued" => JobStatus::Queued,
        "in_progress" => JobStatus::InProgress,
        "completed" => JobStatus::Completed,
        "failed" | "cancelled" | "expired" => JobStatus::Failed,
        other => {
            warn!(status = other, "unknown OpenAI video status; treating as in_progress");
            JobStatus::InProgress
        }
    }
}

/// [`GenerationJobClient`] for the OpenAI videos API.
pub struct OpenAiVideoClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl OpenAiVideoClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::config("OpenAI api_key is empty"));
        }
        Ok(Self {
            client: http::build_client(config.request_timeout)?,
            base_url: http::parse_base(&config.base_url)?,
            api_key: config.api_key,
        })
    }

    fn url<const N: usize>(&self, segments: [&str; N]) -> Url {
        http::endpoint(&self.base_url, segments)
    }

    fn image_part(image: &ReferenceImage) -> Result<Part> {
        Part::bytes(image.bytes.to_vec())
            .file_name(image.filename.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| Error::config(format!("invalid mime type {}: {e}", image.mime_type)))
    }
}

#[async_trait]
impl GenerationJobClient for OpenAiVideoClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn submit(&self, request: &JobRequest) -> Result<GenerationJob> {
        request.validate()?;
        if request.last_frame.is_some() {
            return Err(Error::config("the OpenAI videos API does not accept a last_frame image"));
        }

        let mut form = Form::new()
            .text("model", request.model.clone())
            .text("prompt", request.prompt.clone())
            .text("seconds", request.seconds.to_string())
            .text("size", request.size.to_string());
        if let Some(image) = &request.input_reference {
            form = form.part("input_reference", Self::image_part(image)?);
        }

        let response = http::send(
            "create",
            self.client
                .post(self.url(["videos"]))
                .bearer_auth(&self.api_key)
                .multipart(form),
        )
        .await?;
        let job = http::json::<VideoObject>("create", response).await?.into_job();

        info!(provider = "openai", job_id = %job.id, status = %job.status, "video job created");
        Ok(job)
    }

    async fn fetch_status(&self, id: &str) -> Result<GenerationJob> {
        let response = http::send(
            "status",
            self.client
                .get(self.url(["videos", id]))
                .bearer_auth(&self.api_key),
        )
        .await?;
        Ok(http::json::<VideoObject>("status", response).await?.into_job())
    }

    async fn fetch_result(&self, id: &str) -> Result<Bytes> {
        let job = self.fetch_status(id).await?;
        if job.status != JobStatus::Completed {
            return Err(Error::transport(
                "download",
                format!("video {id} is {}, not completed: {}", job.status, job.error_detail()),
            ));
        }

        let response = http::send(
            "download",
            self.client
                .get(self.url(["videos", id, "content"]))
                .bearer_auth(&self.api_key),
        )
        .await?;
        let bytes = http::bytes("download", response).await?;
        info!(provider = "openai", job_id = id, bytes = bytes.len(), "video downloaded");
        Ok(bytes)
    }
}
