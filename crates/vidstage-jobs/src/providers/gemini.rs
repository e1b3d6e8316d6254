//! Gemini image generation (`generateContent`) on Vertex AI.
//!
//! Image models answer in a single round trip, so `submit` runs the whole
//! generation and returns a job that is already terminal. The decoded image
//! is held in memory under the job id until `fetch_result` asks for it;
//! another client instance cannot see it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use vidstage_common::{Error, Result};

use super::http::{self, REQUEST_TIMEOUT};
use crate::client::GenerationJobClient;
use crate::job::{GenerationJob, JobRequest, JobStatus, ReferenceImage};

/// Mime type assumed for image parts that do not name one.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Connection settings for [`GeminiImageClient`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub project: String,
    pub location: String,
    /// OAuth access token sent as a bearer credential.
    pub access_token: String,
    /// Regional Vertex endpoint; derived from `location` by default.
    pub base_url: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
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
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Parts
// ---------------------------------------------------------------------------

/// One element of a `contents[].parts` array: text, inline data, or both
/// absent for part kinds this client ignores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// Inline image part; `mime_type` defaults to PNG.
    pub fn image(bytes: &[u8], mime_type: Option<&str>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.unwrap_or(DEFAULT_IMAGE_MIME).to_string(),
                data: STANDARD.encode(bytes),
            }),
        }
    }
}

/// A prompt and/or image contributed to a parts payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartInput<'a> {
    pub prompt: Option<&'a str>,
    pub image: Option<&'a [u8]>,
    pub mime_type: Option<&'a str>,
}

/// Flatten inputs into parts, each input's text ahead of its image.
/// Blank prompts are skipped.
pub fn build_parts<'a>(inputs: impl IntoIterator<Item = PartInput<'a>>) -> Vec<ContentPart> {
    let mut parts = Vec::new();
    for input in inputs {
        if let Some(prompt) = input.prompt.filter(|p| !p.trim().is_empty()) {
            parts.push(ContentPart::text(prompt));
        }
        if let Some(image) = input.image {
            parts.push(ContentPart::image(image, input.mime_type));
        }
    }
    parts
}

fn image_input(image: &ReferenceImage) -> PartInput<'_> {
    PartInput {
        prompt: None,
        image: Some(&image.bytes[..]),
        mime_type: Some(image.mime_type.as_str()),
    }
}

fn request_parts(request: &JobRequest) -> Vec<ContentPart> {
    let prompt = PartInput {
        prompt: Some(request.prompt.as_str()),
        ..PartInput::default()
    };

    build_parts(
        std::iter::once(prompt)
            .chain(request.input_reference.as_ref().map(image_input))
            .chain(request.last_frame.as_ref().map(image_input)),
    )
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: [Content; 1],
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
    #[serde(default)]
    response_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl GenerateResponse {
    fn first_parts(&self) -> &[ContentPart] {
        match self.candidates.first().and_then(|c| c.content.as_ref()) {
            Some(content) => &content.parts,
            None => &[],
        }
    }

    /// First inline data part of the first candidate.
    fn first_image(&self) -> Option<&InlineData> {
        self.first_parts().iter().find_map(|p| p.inline_data.as_ref())
    }

    /// Error payload for a response that carried no image.
    fn missing_image_error(&self) -> Value {
        let text: Vec<&str> = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        json!({
            "message": "response contained no image data",
            "finishReason": self.candidates.first().and_then(|c| c.finish_reason.clone()),
            "text": text.join("\n"),
            "promptFeedback": self.prompt_feedback,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

struct StoredResult {
    job: GenerationJob,
    image: Option<Bytes>,
}

/// [`GenerationJobClient`] for Gemini image models.
pub struct GeminiImageClient {
    client: reqwest::Client,
    base_url: Url,
    project: String,
    location: String,
    access_token: String,
    results: Mutex<HashMap<String, StoredResult>>,
    next_id: AtomicU64,
}

impl GeminiImageClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.project.trim().is_empty() || config.location.trim().is_empty() {
            return Err(Error::config("Gemini project and location are required"));
        }
        if config.access_token.trim().is_empty() {
            return Err(Error::config("Gemini access_token is empty"));
        }
        Ok(Self {
            client: http::build_client(config.request_timeout)?,
            base_url: http::parse_base(&config.base_url)?,
            project: config.project,
            location: config.location,
            access_token: config.access_token,
            results: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    fn generate_url(&self, model: &str) -> Url {
        let action = format!("{model}:generateContent");
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

    fn job_id(&self, response: &GenerateResponse) -> String {
        match &response.response_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("gemini-{}", self.next_id.fetch_add(1, Ordering::Relaxed)),
        }
    }

    fn stored<T>(&self, op: &str, id: &str, f: impl FnOnce(&StoredResult) -> T) -> Result<T> {
        self.results
            .lock()
            .get(id)
            .map(f)
            .ok_or_else(|| Error::transport(op, format!("no Gemini result held for job {id}")))
    }
}

#[async_trait]
impl GenerationJobClient for GeminiImageClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn submit(&self, request: &JobRequest) -> Result<GenerationJob> {
        request.validate()?;

        let body = GenerateRequest {
            contents: [Content {
                role: Some("user".to_string()),
                parts: request_parts(request),
            }],
        };
        let response = http::send(
            "create",
            self.client
                .post(self.generate_url(&request.model))
                .bearer_auth(&self.access_token)
                .json(&body),
        )
        .await?;
        let response: GenerateResponse = http::json("create", response).await?;
        let id = self.job_id(&response);

        let (job, image) = match response.first_image() {
            Some(inline) => {
                let bytes = STANDARD
                    .decode(&inline.data)
                    .map_err(|e| Error::transport("create", format!("invalid base64 image: {e}")))?;
                info!(provider = "gemini", job_id = %id, bytes = bytes.len(), mime = %inline.mime_type, "image generated");
                (GenerationJob::new(&id, JobStatus::Completed), Some(Bytes::from(bytes)))
            }
            None => {
                warn!(provider = "gemini", job_id = %id, "response contained no image data");
                let job = GenerationJob::new(&id, JobStatus::Failed).with_error(response.missing_image_error());
                (job, None)
            }
        };

        self.results.lock().insert(
            id,
            StoredResult {
                job: job.clone(),
                image,
            },
        );
        Ok(job)
    }

    async fn fetch_status(&self, id: &str) -> Result<GenerationJob> {
        self.stored("status", id, |stored| stored.job.clone())
    }

    async fn fetch_result(&self, id: &str) -> Result<Bytes> {
        let (job, image) = self.stored("download", id, |stored| (stored.job.clone(), stored.image.clone()))?;
        match image {
            Some(bytes) if job.status == JobStatus::Completed => Ok(bytes),
            _ => Err(Error::transport(
                "download",
                format!("job {id} is {}, not completed: {}", job.status, job.error_detail()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use vidstage_common::ErrorKind;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str =
        "/v1/projects/demo/locations/us-central1/publishers/google/models/gemini-2.5-flash-image:generateContent";

    fn client(server: &MockServer) -> GeminiImageClient {
        GeminiImageClient::new(GeminiConfig::new("demo", "us-central1", "ya29.token").with_base_url(server.uri()))
            .unwrap()
    }

    fn request() -> JobRequest {
        JobRequest::new("gemini-2.5-flash-image", "render the bench at dusk", 4, "1024x1024".parse().unwrap())
    }

    #[test]
    fn test_build_parts_orders_text_before_image() {
        let parts = build_parts([
            PartInput {
                prompt: Some("scene"),
                image: Some(&b"png"[..]),
                mime_type: None,
            },
            PartInput {
                prompt: Some("  "),
                image: Some(&b"jpg"[..]),
                mime_type: Some("image/jpeg"),
            },
        ]);

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], ContentPart::text("scene"));
        let first = parts[1].inline_data.as_ref().unwrap();
        assert_eq!(first.mime_type, DEFAULT_IMAGE_MIME);
        assert_eq!(first.data, STANDARD.encode(b"png"));
        assert_eq!(parts[2].inline_data.as_ref().unwrap().mime_type, "image/jpeg");
    }

    #[test]
    fn test_parts_serialize_as_inline_data() {
        let value = serde_json::to_value(ContentPart::image(b"x", None)).unwrap();
        assert_eq!(value, json!({"inlineData": {"mimeType": "image/png", "data": "eA=="}}));
        let value = serde_json::to_value(ContentPart::text("hi")).unwrap();
        assert_eq!(value, json!({"text": "hi"}));
    }

    #[test]
    fn test_request_parts_include_both_references() {
        let req = request()
            .with_reference(ReferenceImage::png(b"before".to_vec(), "before.png"))
            .with_last_frame(ReferenceImage::png(b"after".to_vec(), "after.png"));
        let parts = request_parts(&req);

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].text.as_deref(), Some("render the bench at dusk"));
        assert_eq!(parts[2].inline_data.as_ref().unwrap().data, STANDARD.encode(b"after"));
    }

    #[tokio::test]
    async fn test_submit_returns_completed_job_with_first_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("authorization", "Bearer ya29.token"))
            .and(body_partial_json(json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "render the bench at dusk"},
                        {"inlineData": {"mimeType": "image/png", "data": STANDARD.encode(b"bench")}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responseId": "resp-1",
                "candidates": [{
                    "content": {"role": "model", "parts": [
                        {"text": "Here is the bench."},
                        {"inlineData": {"mimeType": "image/png", "data": STANDARD.encode(b"first")}},
                        {"inlineData": {"mimeType": "image/png", "data": STANDARD.encode(b"second")}}
                    ]},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gemini = client(&server);
        let req = request().with_reference(ReferenceImage::png(b"bench".to_vec(), "bench.png"));
        let job = gemini.submit(&req).await.unwrap();

        assert_eq!(job.id, "resp-1");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(gemini.fetch_status("resp-1").await.unwrap(), job);
        assert_eq!(&gemini.fetch_result("resp-1").await.unwrap()[..], b"first");
    }

    #[tokio::test]
    async fn test_response_without_image_is_failed_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "I can't draw that."}]},
                    "finishReason": "SAFETY"
                }]
            })))
            .mount(&server)
            .await;

        let gemini = client(&server);
        let job = gemini.submit(&request()).await.unwrap();

        assert_eq!(job.id, "gemini-1");
        assert_eq!(job.status, JobStatus::Failed);
        let error = job.error.as_ref().unwrap();
        assert_eq!(error["finishReason"], "SAFETY");
        assert_eq!(error["text"], "I can't draw that.");

        let err = gemini.fetch_result(&job.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request);
        assert!(err.to_string().contains("failed"));
    }

    #[tokio::test]
    async fn test_unknown_job_is_request_error() {
        let server = MockServer::start().await;
        let err = client(&server).fetch_status("resp-404").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request);
    }

    #[tokio::test]
    async fn test_http_error_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
            .mount(&server)
            .await;

        let err = client(&server).submit(&request()).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("permission denied"));
    }
}
