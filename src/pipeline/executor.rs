use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vidstage_common::{Error, Result, Size};
use vidstage_compose::{geometry, Composite, Compositor};
use vidstage_jobs::{
    GenerationJob, GenerationJobClient, JobPoller, JobRequest, JobStatus, PollTick, ProviderKind,
    ReferenceImage,
};

use crate::config::Config;
use crate::prompts;

use super::providers::create_client;

/// Filename attached to composite reference uploads.
pub const REFERENCE_FILENAME: &str = "before_after.png";

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(&PollTick<'_>) + Send + Sync>;

/// How the two source images reach the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staging {
    /// One side-by-side composite as the input reference.
    Composite,
    /// Before and after as separate images; video providers use them as
    /// the first and last frame.
    FirstLast,
}

impl Staging {
    pub fn for_provider(provider: ProviderKind) -> Self {
        match provider {
            ProviderKind::OpenAi => Self::Composite,
            ProviderKind::Veo | ProviderKind::Gemini => Self::FirstLast,
        }
    }
}

/// Result of a completed generation.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub job: GenerationJob,
    pub output: PathBuf,
    pub bytes: u64,
    /// Composite written alongside the video, if one was requested.
    pub composite: Option<PathBuf>,
}

/// Compose two image files into a PNG at `output`.
pub fn compose_files(config: &Config, before: &Path, after: &Path, output: &Path) -> Result<Composite> {
    let spec = config.canvas.to_spec()?;
    let compositor = Compositor::new(config.style.to_options()?)?;

    let geometry = geometry::plan(&spec)?;
    let before_image = vidstage_compose::open(before)?;
    let after_image = vidstage_compose::open(after)?;
    let composite = compositor.compose(&before_image, &after_image, &geometry)?;

    ensure_parent(output)?;
    composite.save_png(output)?;
    tracing::info!(
        "Wrote {} composite to {:?}",
        composite.size(),
        output
    );
    Ok(composite)
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(std::fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

fn reference_from_file(path: &Path) -> Result<ReferenceImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::decode(format!("cannot read {}: {e}", path.display())))?;
    let format = image::guess_format(&bytes)
        .map_err(|e| Error::decode(format!("unrecognized image {}: {e}", path.display())))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());

    Ok(ReferenceImage {
        bytes: bytes.into(),
        mime_type: format.to_mime_type().to_string(),
        filename,
        dimensions: None,
    })
}

/// Drives compose, submit, poll and download against one provider.
pub struct Pipeline {
    config: Config,
    client: Arc<dyn GenerationJobClient>,
    poller: JobPoller,
    progress_callback: Option<ProgressCallback>,
}

impl Pipeline {
    /// Build the provider client and poller described by `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let client = create_client(&config)?;
        let poller = JobPoller::new(config.poll.to_poll_config()?);
        Ok(Self::new(config, client, poller))
    }

    pub fn new(config: Config, client: Arc<dyn GenerationJobClient>, poller: JobPoller) -> Self {
        Self {
            config,
            client,
            poller,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Stop any poll in progress when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.poller = self.poller.with_cancellation(token);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &dyn GenerationJobClient {
        self.client.as_ref()
    }

    pub fn staging(&self) -> Staging {
        Staging::for_provider(self.config.generation.provider)
    }

    /// Request carrying the configured model, duration and size.
    pub fn request(&self, prompt: Option<&str>) -> Result<JobRequest> {
        let generation = &self.config.generation;
        let prompt = prompt
            .or(generation.prompt.as_deref())
            .unwrap_or_else(|| prompts::default_prompt(generation.provider));
        Ok(JobRequest::new(
            generation.model(),
            prompt,
            generation.seconds,
            self.config.video_size()?,
        ))
    }

    /// Stage two images, generate a transition video and save it to `output`.
    ///
    /// A provider-reported failure becomes [`Error::JobFailed`] carrying the
    /// provider's detail.
    pub async fn run_before_after(
        &self,
        before: &Path,
        after: &Path,
        output: &Path,
        composite_out: Option<&Path>,
        prompt: Option<&str>,
    ) -> Result<Outcome> {
        let mut request = self.request(prompt)?;
        request.validate()?;
        let mut composite_path = None;

        match self.staging() {
            Staging::Composite => {
                let canvas = self.config.canvas.size()?;
                if canvas != request.size {
                    return Err(Error::config(format!(
                        "composite canvas is {canvas} but the requested video size is {}",
                        request.size
                    )));
                }
                let path = match composite_out {
                    Some(path) => path.to_path_buf(),
                    None => output.with_file_name(REFERENCE_FILENAME),
                };
                let (png, rendered) = self.compose_in_background(before, after, &path).await?;
                request = request
                    .with_reference(ReferenceImage::png(png, REFERENCE_FILENAME).with_dimensions(rendered));
                composite_path = Some(path);
            }
            Staging::FirstLast => {
                request = request
                    .with_reference(reference_from_file(before)?)
                    .with_last_frame(reference_from_file(after)?);
            }
        }

        request.validate()?;
        let mut outcome = self.generate(&request, output).await?;
        outcome.composite = composite_path;
        Ok(outcome)
    }

    /// Render the composite off the async runtime; returns the PNG and the
    /// size it was actually rendered at.
    async fn compose_in_background(&self, before: &Path, after: &Path, output: &Path) -> Result<(Vec<u8>, Size)> {
        let config = self.config.clone();
        let (before, after, output) = (before.to_path_buf(), after.to_path_buf(), output.to_path_buf());
        tokio::task::spawn_blocking(move || {
            let composite = compose_files(&config, &before, &after, &output)?;
            Ok((composite.to_png()?, composite.size()))
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?
    }

    /// Submit `request`, poll it to completion and download the result.
    pub async fn generate(&self, request: &JobRequest, output: &Path) -> Result<Outcome> {
        let job = self.submit_only(request).await?;
        let done = self.watch_job(&job.id).await?;
        if done.status == JobStatus::Failed {
            return Err(Error::JobFailed {
                job_id: done.id.clone(),
                detail: done.error_detail(),
            });
        }

        let bytes = self.save_result(&done.id, output).await?;
        Ok(Outcome {
            job: done,
            output: output.to_path_buf(),
            bytes,
            composite: None,
        })
    }

    /// Submit without waiting.
    pub async fn submit_only(&self, request: &JobRequest) -> Result<GenerationJob> {
        let job = self.client.submit(request).await?;
        tracing::info!(
            provider = self.client.name(),
            job_id = %job.id,
            status = %job.status,
            "Job submitted"
        );
        Ok(job)
    }

    /// Poll an existing job until it reaches a terminal status.
    pub async fn watch_job(&self, job_id: &str) -> Result<GenerationJob> {
        let callback = self.progress_callback.as_ref();
        self.poller
            .poll_with(self.client.as_ref(), job_id, |tick| {
                if let Some(cb) = callback {
                    cb(tick);
                }
            })
            .await
    }

    /// Download a finished job to `output`, checking its status first.
    pub async fn download_job(&self, job_id: &str, output: &Path) -> Result<u64> {
        let job = self.client.fetch_status(job_id).await?;
        match job.status {
            JobStatus::Completed => self.save_result(job_id, output).await,
            JobStatus::Failed => Err(Error::JobFailed {
                job_id: job.id.clone(),
                detail: job.error_detail(),
            }),
            status => Err(Error::transport(
                "download",
                format!("job {job_id} is {status}, not completed"),
            )),
        }
    }

    async fn save_result(&self, job_id: &str, output: &Path) -> Result<u64> {
        let bytes = self.client.fetch_result(job_id).await?;
        ensure_parent(output)?;
        tokio::fs::write(output, &bytes).await?;
        tracing::info!("Saved {} bytes to {:?}", bytes.len(), output);
        Ok(bytes.len() as u64)
    }
}
