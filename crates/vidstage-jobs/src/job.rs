//! Normalized job model shared by every provider.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vidstage_common::{Error, Result, Size};

/// Four-state lifecycle every provider vocabulary is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// No further provider transitions happen from a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a job as last reported by its provider.
///
/// Never patched locally: a newer snapshot only comes from fetching status
/// again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Opaque provider identifier.
    pub id: String,
    pub status: JobStatus,
    /// Provider-reported progress, when available (OpenAI reports 0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Provider error detail, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl GenerationJob {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            progress: None,
            error: None,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Human-readable failure detail, falling back to the status itself.
    pub fn error_detail(&self) -> String {
        match &self.error {
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            Some(other) => other.to_string(),
            None => format!("status {}", self.status),
        }
    }
}

/// Image attached to a creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceImage {
    pub bytes: Bytes,
    pub mime_type: String,
    pub filename: String,
    /// Pixel size, when known. Must equal the request size if set.
    pub dimensions: Option<Size>,
}

impl ReferenceImage {
    pub fn png(bytes: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: "image/png".to_string(),
            filename: filename.into(),
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, size: Size) -> Self {
        self.dimensions = Some(size);
        self
    }
}

/// Everything a provider needs to create a generation job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub model: String,
    pub prompt: String,
    /// Clip length in seconds.
    pub seconds: u32,
    pub size: Size,
    /// Conditioning image (first frame for providers that distinguish).
    pub input_reference: Option<ReferenceImage>,
    /// Final-frame image, for providers that accept one.
    pub last_frame: Option<ReferenceImage>,
}

impl JobRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, seconds: u32, size: Size) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            seconds,
            size,
            input_reference: None,
            last_frame: None,
        }
    }

    pub fn with_reference(mut self, image: ReferenceImage) -> Self {
        self.input_reference = Some(image);
        self
    }

    pub fn with_last_frame(mut self, image: ReferenceImage) -> Self {
        self.last_frame = Some(image);
        self
    }

    /// Structural checks run before anything goes over the wire.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::config("model must not be empty"));
        }
        if self.prompt.trim().is_empty() {
            return Err(Error::config("prompt must not be empty"));
        }
        if self.seconds == 0 {
            return Err(Error::config("seconds must be positive"));
        }
        for (name, image) in [
            ("input_reference", &self.input_reference),
            ("last_frame", &self.last_frame),
        ] {
            let Some(image) = image else { continue };
            if image.bytes.is_empty() {
                return Err(Error::config(format!("{name} is empty")));
            }
            if let Some(dims) = image.dimensions {
                if dims != self.size {
                    return Err(Error::config(format!(
                        "{name} is {dims} but the request size is {}",
                        self.size
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vidstage_common::ErrorKind;

    fn size() -> Size {
        "720x1280".parse().unwrap()
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(serde_json::to_string(&JobStatus::InProgress).unwrap(), "\"in_progress\"");
        assert_eq!(JobStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn test_validate_requires_model_and_prompt() {
        let err = JobRequest::new(" ", "go", 4, size()).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = JobRequest::new("sora-2", "", 4, size()).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(JobRequest::new("sora-2", "go", 4, size()).validate().is_ok());
    }

    #[test]
    fn test_validate_reference_size_must_match() {
        let wrong = ReferenceImage::png(vec![1, 2, 3], "ref.png")
            .with_dimensions("1280x720".parse().unwrap());
        let err = JobRequest::new("sora-2", "go", 4, size())
            .with_reference(wrong)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("1280x720"));

        let right = ReferenceImage::png(vec![1, 2, 3], "ref.png").with_dimensions(size());
        assert!(JobRequest::new("sora-2", "go", 4, size())
            .with_reference(right)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_error_detail_prefers_message() {
        let job = GenerationJob::new("v1", JobStatus::Failed)
            .with_error(json!({"code": "moderation", "message": "blocked"}));
        assert_eq!(job.error_detail(), "blocked");

        let job = GenerationJob::new("v1", JobStatus::Failed).with_error(json!({"code": 3}));
        assert_eq!(job.error_detail(), "{\"code\":3}");

        let job = GenerationJob::new("v1", JobStatus::Failed);
        assert_eq!(job.error_detail(), "status failed");
    }
}
