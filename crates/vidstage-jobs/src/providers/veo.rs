//! Veo on Vertex AI adapter.
//!
//! Veo jobs are long-running operations. The job id is the full operation
//! name (`projects/../models/{model}/operations/{uuid}`), which also names
//! the model resource used to fetch the operation again.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use vidstage_common::{Error, Result, Size};

use super::http::{self, REQUEST_TIMEOUT};
use crate::client::GenerationJobClient;
use crate::job::{GenerationJob, JobRequest, JobStatus, ReferenceImage};

pub const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// Connection settings for [`VeoClient`].
#[derive(Debug, Clone)]
pub struct VeoConfig {
    pub project: String,
    pub location: String,
    /// OAuth access token sent as a bearer credential.
    pub access_token: String,
    /// Regional Vertex endpoint; derived from `location` by default.
    pub base_url: String,
    /// Endpoint used to download `gs://` results.
    pub storage_base_url: String,
    /// Optional `gs://` prefix where Vertex writes results instead of
    /// returning them inline.
    pub storage_uri: Option<String>,
    pub request_timeout: Duration,
}

impl VeoConfig {
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        let location = location.into();
        Self {
            project: project.into(),
            base_url: format!("https://{location}-aiplatform.googleapis.com"),
            location,
            access_token: access_token.into(),
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
            storage_uri: None,
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_storage_base_url(mut self, url: impl Into<String>) -> Self {
        self.storage_base_url = url.into();
        self
    }

    pub fn with_storage_uri(mut self, uri: impl Into<String>) -> Self {
        self.storage_uri = Some(uri.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Instance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_frame: Option<InlineImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

impl From<&ReferenceImage> for InlineImage {
    fn from(image: &ReferenceImage) -> Self {
        Self {
            bytes_base64_encoded: STANDARD.encode(&image.bytes),
            mime_type: image.mime_type.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters<'a> {
    duration_seconds: u32,
    aspect_ratio: &'static str,
    resolution: &'static str,
    sample_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_uri: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchOperationRequest<'a> {
    operation_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    videos: Vec<GeneratedVideo>,
    #[serde(default)]
    rai_media_filtered_count: Option<u32>,
    #[serde(default)]
    rai_media_filtered_reasons: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedVideo {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    gcs_uri: Option<String>,
}

impl Operation {
    /// Explicit mapping from operation state onto [`JobStatus`]:
    ///
    /// | `done` | `error` | videos | status        |
    /// |--------|---------|--------|---------------|
    /// | false  | any     | any    | `in_progress` |
    /// | true   | present | any    | `failed`      |
    /// | true   | absent  | none   | `failed`      |
    /// | true   | absent  | >= 1   | `completed`   |
    fn status(&self) -> JobStatus {
        if !self.done {
            JobStatus::InProgress
        } else if self.error.is_some() || self.videos().is_empty() {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        }
    }

    fn videos(&self) -> &[GeneratedVideo] {
        match &self.response {
            Some(response) => &response.videos,
            None => &[],
        }
    }

    fn error_payload(&self) -> Option<Value> {
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        if self.done && self.videos().is_empty() {
            let response = self.response.as_ref();
            return Some(serde_json::json!({
                "message": "operation finished without videos",
                "raiMediaFilteredCount": response.and_then(|r| r.rai_media_filtered_count),
                "raiMediaFilteredReasons": response.and_then(|r| r.rai_media_filtered_reasons.clone()),
            }));
        }
        None
    }

    fn to_job(&self) -> GenerationJob {
        GenerationJob {
            id: self.name.clone(),
            status: self.status(),
            progress: None,
            error: self.error_payload(),
        }
    }
}

/// Veo accepts portrait, landscape and square framings only.
fn aspect_ratio(size: Size) -> &'static str {
    use std::cmp::Ordering;
    match size.width.cmp(&size.height) {
        Ordering::Less => "9:16",
        Ordering::Greater => "16:9",
        Ordering::Equal => "1:1",
    }
}

fn resolution(size: Size) -> &'static str {
    if size.width.min(size.height) >= 1080 {
        "1080p"
    } else {
        "720p"
    }
}

/// Model resource path embedded in an operation name.
fn model_resource(operation: &str) -> Result<&str> {
    operation
        .split_once("/operations/")
        .map(|(model, _)| model)
        .filter(|model| model.contains("/models/"))
        .ok_or_else(|| Error::config(format!("not a Veo operation name: {operation}")))
}

/// Split `gs://bucket/object` into its parts.
fn parse_gcs_uri(uri: &str) -> Result<(&str, &str)> {
    uri.strip_prefix("gs://")
        .and_then(|rest| rest.split_once('/'))
        .filter(|(bucket, object)| !bucket.is_empty() && !object.is_empty())
        .ok_or_else(|| Error::transport("download", format!("unsupported result uri: {uri}")))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`GenerationJobClient`] for Veo long-running predictions.
pub struct VeoClient {
    client: reqwest::Client,
    base_url: Url,
    storage_base_url: Url,
    project: String,
    location: String,
    access_token: String,
    storage_uri: Option<String>,
}

impl VeoClient {
    pub fn new(config: VeoConfig) -> Result<Self> {
        if config.project.trim().is_empty() || config.location.trim().is_empty() {
            return Err(Error::config("Veo project and location are required"));
        }
        if config.access_token.trim().is_empty() {
            return Err(Error::config("Veo access_token is empty"));
        }
        Ok(Self {
            client: http::build_client(config.request_timeout)?,
            base_url: http::parse_base(&config.base_url)?,
            storage_base_url: http::parse_base(&config.storage_base_url)?,
            project: config.project,
            location: config.location,
            access_token: config.access_token,
            storage_uri: config.storage_uri,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> Url {
        let action = format!("{model}:{method}");
        http::endpoint(
            &self.base_url,
            [
                "v1",
                "projects",
                self.project.as_str(),
                "locations",
                self.location.as_str(),
                "publishers",
                "google",
                "models",
                action.as_str(),
            ],
        )
    }

    async fn fetch_operation(&self, operation: &str) -> Result<Operation> {
        let (parent, model) = model_resource(operation)?
            .rsplit_once('/')
            .ok_or_else(|| Error::config(format!("not a Veo operation name: {operation}")))?;
        let action = format!("{model}:fetchPredictOperation");
        let url = http::endpoint(
            &self.base_url,
            std::iter::once("v1")
                .chain(parent.split('/'))
                .chain(std::iter::once(action.as_str())),
        );
        let response = http::send(
            "status",
            self.client
                .post(url)
                .bearer_auth(&self.access_token)
                .json(&FetchOperationRequest {
                    operation_name: operation,
                }),
        )
        .await?;
        http::json("status", response).await
    }

    async fn download_gcs(&self, uri: &str) -> Result<Bytes> {
        let (bucket, object) = parse_gcs_uri(uri)?;
        debug!(bucket, object, "downloading Veo result from storage");
        let response = http::send(
            "download",
            self.client
                .get(http::endpoint(
                    &self.storage_base_url,
                    std::iter::once(bucket).chain(object.split('/')),
                ))
                .bearer_auth(&self.access_token),
        )
        .await?;
        http::bytes("download", response).await
    }
}

#[async_trait]
impl GenerationJobClient for VeoClient {
    fn name(&self) -> &'static str {
        "veo"
    }

    async fn submit(&self, request: &JobRequest) -> Result<GenerationJob> {
        request.validate()?;

        let body = PredictRequest {
            instances: [Instance {
                prompt: &request.prompt,
                image: request.input_reference.as_ref().map(InlineImage::from),
                last_frame: request.last_frame.as_ref().map(InlineImage::from),
            }],
            parameters: Parameters {
                duration_seconds: request.seconds,
                aspect_ratio: aspect_ratio(request.size),
                resolution: resolution(request.size),
                sample_count: 1,
                storage_uri: self.storage_uri.as_deref(),
            },
        };

        let response = http::send(
            "create",
            self.client
                .post(self.model_url(&request.model, "predictLongRunning"))
                .bearer_auth(&self.access_token)
                .json(&body),
        )
        .await?;
        let operation: Operation = http::json("create", response).await?;
        let job = operation.to_job();

        let job = if job.is_terminal() {
            job
        } else {
            GenerationJob::new(job.id, JobStatus::Queued)
        };
        info!(provider = "veo", job_id = %job.id, status = %job.status, "video operation started");
        Ok(job)
    }

    async fn fetch_status(&self, id: &str) -> Result<GenerationJob> {
        Ok(self.fetch_operation(id).await?.to_job())
    }

    async fn fetch_result(&self, id: &str) -> Result<Bytes> {
        let operation = self.fetch_operation(id).await?;
        let job = operation.to_job();
        if job.status != JobStatus::Completed {
            return Err(Error::transport(
                "download",
                format!("operation {id} is {}, not completed: {}", job.status, job.error_detail()),
            ));
        }

        let video = &operation.videos()[0];
        let bytes = match (&video.bytes_base64_encoded, &video.gcs_uri) {
            (Some(encoded), _) => STANDARD
                .decode(encoded)
                .map(Bytes::from)
                .map_err(|e| Error::transport("download", format!("invalid base64 video: {e}")))?,
            (None, Some(uri)) => self.download_gcs(uri).await?,
            (None, None) => {
                return Err(Error::transport(
                    "download",
                    "operation response has neither video bytes nor a storage uri",
                ))
            }
        };

        info!(provider = "veo", job_id = id, bytes = bytes.len(), "video downloaded");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use vidstage_common::ErrorKind;
    use wiremock::matchers::{body_json, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "veo-3.1-generate-preview";
    const OP: &str =
        "projects/demo/locations/us-central1/publishers/google/models/veo-3.1-generate-preview/operations/op-1";
    const FETCH_PATH: &str =
        "/v1/projects/demo/locations/us-central1/publishers/google/models/veo-3.1-generate-preview:fetchPredictOperation";

    async fn client(server: &MockServer) -> VeoClient {
        VeoClient::new(
            VeoConfig::new("demo", "us-central1", "ya29.token")
                .with_base_url(server.uri())
                .with_storage_base_url(format!("{}/storage", server.uri())),
        )
        .unwrap()
    }

    fn request() -> JobRequest {
        JobRequest::new(MODEL, "evolve from first to second", 8, "1280x720".parse().unwrap())
    }

    async fn mount_operation(server: &MockServer, body: Value) {
        Mock::given(method("POST"))
            .and(path(FETCH_PATH))
            .and(body_json(json!({"operationName": OP})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_framing_from_size() {
        assert_eq!(aspect_ratio("720x1280".parse().unwrap()), "9:16");
        assert_eq!(aspect_ratio("1920x1080".parse().unwrap()), "16:9");
        assert_eq!(aspect_ratio("512x512".parse().unwrap()), "1:1");
        assert_eq!(resolution("720x1280".parse().unwrap()), "720p");
        assert_eq!(resolution("1920x1080".parse().unwrap()), "1080p");
    }

    #[test]
    fn test_model_resource_from_operation_name() {
        assert_eq!(
            model_resource(OP).unwrap(),
            "projects/demo/locations/us-central1/publishers/google/models/veo-3.1-generate-preview"
        );
        assert_eq!(model_resource("video_123").unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn test_operation_status_table() {
        let op = |v: Value| serde_json::from_value::<Operation>(v).unwrap().status();
        assert_eq!(op(json!({"name": OP})), JobStatus::InProgress);
        assert_eq!(op(json!({"name": OP, "done": false})), JobStatus::InProgress);
        assert_eq!(
            op(json!({"name": OP, "done": true, "error": {"code": 3, "message": "bad image"}})),
            JobStatus::Failed
        );
        assert_eq!(
            op(json!({"name": OP, "done": true, "response": {"raiMediaFilteredCount": 1}})),
            JobStatus::Failed
        );
        assert_eq!(
            op(json!({"name": OP, "done": true, "response": {"videos": [{"gcsUri": "gs://b/o.mp4"}]}})),
            JobStatus::Completed
        );
    }

    #[test]
    fn test_parse_gcs_uri() {
        assert_eq!(parse_gcs_uri("gs://bucket/a/b.mp4").unwrap(), ("bucket", "a/b.mp4"));
        assert!(parse_gcs_uri("https://bucket/a.mp4").is_err());
        assert!(parse_gcs_uri("gs://bucket").is_err());
    }

    #[tokio::test]
    async fn test_submit_posts_predict_long_running() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/demo/locations/us-central1/publishers/google/models/veo-3.1-generate-preview:predictLongRunning",
            ))
            .and(header("authorization", "Bearer ya29.token"))
            .and(body_partial_json(json!({
                "instances": [{
                    "prompt": "evolve from first to second",
                    "image": {"bytesBase64Encoded": "Zmlyc3Q=", "mimeType": "image/png"},
                    "lastFrame": {"bytesBase64Encoded": "bGFzdA==", "mimeType": "image/png"}
                }],
                "parameters": {
                    "durationSeconds": 8,
                    "aspectRatio": "16:9",
                    "resolution": "720p",
                    "sampleCount": 1
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": OP})))
            .expect(1)
            .mount(&server)
            .await;

        let req = request()
            .with_reference(ReferenceImage::png(b"first".to_vec(), "before.png"))
            .with_last_frame(ReferenceImage::png(b"last".to_vec(), "after.png"));
        let job = client(&server).await.submit(&req).await.unwrap();

        assert_eq!(job.id, OP);
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_fetch_status_reports_failure_detail() {
        let server = MockServer::start().await;
        mount_operation(
            &server,
            json!({"name": OP, "done": true, "error": {"code": 3, "message": "image rejected"}}),
        )
        .await;

        let job = client(&server).await.fetch_status(OP).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_detail(), "image rejected");
    }

    #[tokio::test]
    async fn test_fetch_result_decodes_inline_bytes() {
        let server = MockServer::start().await;
        mount_operation(
            &server,
            json!({
                "name": OP,
                "done": true,
                "response": {"videos": [{"bytesBase64Encoded": STANDARD.encode(b"mp4-bytes"), "mimeType": "video/mp4"}]}
            }),
        )
        .await;

        let bytes = client(&server).await.fetch_result(OP).await.unwrap();
        assert_eq!(&bytes[..], b"mp4-bytes");
    }

    #[tokio::test]
    async fn test_fetch_result_downloads_storage_uri() {
        let server = MockServer::start().await;
        mount_operation(
            &server,
            json!({
                "name": OP,
                "done": true,
                "response": {"videos": [{"gcsUri": "gs://renders/veo/sample_0.mp4", "mimeType": "video/mp4"}]}
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/storage/renders/veo/sample_0.mp4"))
            .and(header("authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"gcs-video".to_vec()))
            .mount(&server)
            .await;

        let bytes = client(&server).await.fetch_result(OP).await.unwrap();
        assert_eq!(&bytes[..], b"gcs-video");
    }

    #[tokio::test]
    async fn test_storage_object_names_are_percent_encoded() {
        let server = MockServer::start().await;
        mount_operation(
            &server,
            json!({
                "name": OP,
                "done": true,
                "response": {"videos": [{"gcsUri": "gs://renders/veo/take 1?.mp4"}]}
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/storage/renders/veo/take%201%3F.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"gcs-video".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = client(&server).await.fetch_result(OP).await.unwrap();
        assert_eq!(&bytes[..], b"gcs-video");
    }

    #[tokio::test]
    async fn test_fetch_result_before_done_is_request_error() {
        let server = MockServer::start().await;
        mount_operation(&server, json!({"name": OP, "done": false})).await;

        let err = client(&server).await.fetch_result(OP).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request);
        assert!(err.to_string().contains("in_progress"));
    }
}
