use serde::{Deserialize, Serialize};
use std::time::Duration;

use vidstage_common::{Error, Result, Size};
use vidstage_compose::{
    geometry, CanvasSpec, CaptionOptions, CaptionStyle, Color, CompositeOptions, SideStyle,
};
use vidstage_jobs::providers::{openai, REQUEST_TIMEOUT};
use vidstage_jobs::{PollConfig, ProviderKind};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub canvas: CanvasConfig,

    #[serde(default)]
    pub style: StyleConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub poll: PollSettings,

    #[serde(default)]
    pub openai: OpenAiSettings,

    #[serde(default)]
    pub veo: VeoSettings,

    #[serde(default)]
    pub gemini: GeminiSettings,
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Canvas size and layout fractions. Unset pixel values are derived from
/// the canvas size.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CanvasConfig {
    /// Output size, `"<width>x<height>"`.
    #[serde(default = "default_canvas_size")]
    pub size: String,

    #[serde(default = "default_margin_top")]
    pub margin_top: f64,

    #[serde(default = "default_margin_bottom")]
    pub margin_bottom: f64,

    #[serde(default = "default_margin_x")]
    pub margin_x: f64,

    #[serde(default = "default_gutter")]
    pub gutter: f64,

    #[serde(default)]
    pub label_band_height: Option<u32>,

    #[serde(default)]
    pub label_gap: Option<u32>,

    #[serde(default)]
    pub border_width: Option<u32>,
}

fn default_canvas_size() -> String {
    "720x1280".to_string()
}
fn default_margin_top() -> f64 {
    geometry::DEFAULT_MARGIN_TOP
}
fn default_margin_bottom() -> f64 {
    geometry::DEFAULT_MARGIN_BOTTOM
}
fn default_margin_x() -> f64 {
    geometry::DEFAULT_MARGIN_X
}
fn default_gutter() -> f64 {
    geometry::DEFAULT_GUTTER
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            size: default_canvas_size(),
            margin_top: default_margin_top(),
            margin_bottom: default_margin_bottom(),
            margin_x: default_margin_x(),
            gutter: default_gutter(),
            label_band_height: None,
            label_gap: None,
            border_width: None,
        }
    }
}

impl CanvasConfig {
    pub fn size(&self) -> Result<Size> {
        self.size.parse()
    }

    /// Resolve into a validated [`CanvasSpec`].
    pub fn to_spec(&self) -> Result<CanvasSpec> {
        let mut spec = CanvasSpec::new(self.size()?);
        spec.margin_top = self.margin_top;
        spec.margin_bottom = self.margin_bottom;
        spec.margin_x = self.margin_x;
        spec.gutter = self.gutter;
        if let Some(h) = self.label_band_height {
            spec.label_band_height = h;
        }
        if let Some(gap) = self.label_gap {
            spec.label_gap = gap;
        }
        if let Some(w) = self.border_width {
            spec.border_width = w;
        }
        spec.validate()?;
        Ok(spec)
    }
}

// ---------------------------------------------------------------------------
// Style
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StyleConfig {
    /// Canvas fill color.
    #[serde(default = "default_background")]
    pub background: String,

    /// Frame corner radius in pixels.
    #[serde(default = "default_frame_radius")]
    pub frame_radius: u32,

    /// Caption weight used when a side has no explicit caption options.
    #[serde(default = "default_font_weight")]
    pub font_weight: u16,

    /// Solid bar behind captions when a side has no explicit caption options.
    #[serde(default)]
    pub caption_bar: Option<String>,

    #[serde(default = "default_before_side")]
    pub before: SideConfig,

    #[serde(default = "default_after_side")]
    pub after: SideConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SideConfig {
    pub label: String,

    /// Frame color, also the caption text color unless `caption` says otherwise.
    pub color: String,

    /// Either a bar color (`"#E5E7EB"`) or `{ bg_color, text_color, font_weight }`.
    #[serde(default)]
    pub caption: Option<CaptionOptions>,
}

fn default_background() -> String {
    "#FFFFFF".to_string()
}
fn default_frame_radius() -> u32 {
    vidstage_compose::frame::DEFAULT_RADIUS
}
fn default_font_weight() -> u16 {
    vidstage_compose::caption::DEFAULT_FONT_WEIGHT
}
fn default_before_side() -> SideConfig {
    SideConfig {
        label: "BEFORE".to_string(),
        color: Color::GREEN.to_string(),
        caption: None,
    }
}
fn default_after_side() -> SideConfig {
    SideConfig {
        label: "AFTER".to_string(),
        color: Color::RED.to_string(),
        caption: None,
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            frame_radius: default_frame_radius(),
            font_weight: default_font_weight(),
            caption_bar: None,
            before: default_before_side(),
            after: default_after_side(),
        }
    }
}

impl StyleConfig {
    /// Parse every color and caption option into [`CompositeOptions`].
    pub fn to_options(&self) -> Result<CompositeOptions> {
        let background: Color = self.background.parse()?;
        Ok(CompositeOptions {
            background,
            matte: if background.is_opaque() {
                background
            } else {
                Color::WHITE
            },
            frame_radius: self.frame_radius,
            before: self.side_style(&self.before)?,
            after: self.side_style(&self.after)?,
        })
    }

    fn side_style(&self, side: &SideConfig) -> Result<SideStyle> {
        let color: Color = side.color.parse()?;
        let caption = match &side.caption {
            Some(options) => CaptionStyle::try_from(options)?,
            None => CaptionStyle::try_from(&CaptionOptions::Styled {
                bg_color: self.caption_bar.clone(),
                text_color: Some(side.color.clone()),
                font_weight: Some(self.font_weight),
            })?,
        };
        Ok(SideStyle {
            label: side.label.clone(),
            frame_color: color,
            caption,
        })
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Defaults to the provider's own default model.
    #[serde(default)]
    pub model: Option<String>,

    /// Clip length in seconds.
    #[serde(default = "default_seconds")]
    pub seconds: u32,

    /// Video size; defaults to the canvas size.
    #[serde(default)]
    pub size: Option<String>,

    /// Replaces the built-in prompt.
    #[serde(default)]
    pub prompt: Option<String>,
}

fn default_seconds() -> u32 {
    4
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            seconds: default_seconds(),
            size: None,
            prompt: None,
        }
    }
}

impl GenerationConfig {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_interval_ms() -> u64 {
    vidstage_jobs::DEFAULT_INTERVAL.as_millis() as u64
}
fn default_timeout_secs() -> u64 {
    vidstage_jobs::DEFAULT_TIMEOUT.as_secs()
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PollSettings {
    pub fn to_poll_config(&self) -> Result<PollConfig> {
        PollConfig::new(
            Duration::from_millis(self.interval_ms),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenAiSettings {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_openai_base_url() -> String {
    openai::DEFAULT_BASE_URL.to_string()
}
fn default_request_timeout_secs() -> u64 {
    REQUEST_TIMEOUT.as_secs()
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VeoSettings {
    /// Regional Vertex endpoint override.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub storage_base_url: Option<String>,

    /// `gs://` prefix for results instead of inline bytes.
    #[serde(default)]
    pub storage_uri: Option<String>,

    #[serde(default)]
    pub project: Option<String>,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_location() -> String {
    "us-central1".to_string()
}

impl Default for VeoSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            storage_base_url: None,
            storage_uri: None,
            project: None,
            location: default_location(),
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Gemini runs on the same Vertex project as Veo; unset values fall back
/// to `[veo]`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GeminiSettings {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub project: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn gemini_project(&self) -> Option<&str> {
        self.gemini.project.as_deref().or(self.veo.project.as_deref())
    }

    pub fn gemini_location(&self) -> &str {
        self.gemini.location.as_deref().unwrap_or(self.veo.location.as_str())
    }

    pub fn gemini_access_token(&self) -> Option<&str> {
        self.gemini
            .access_token
            .as_deref()
            .or(self.veo.access_token.as_deref())
    }

    pub fn gemini_base_url(&self) -> Option<&str> {
        self.gemini.base_url.as_deref().or(self.veo.base_url.as_deref())
    }

    pub fn gemini_request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.gemini
                .request_timeout_secs
                .unwrap_or(self.veo.request_timeout_secs),
        )
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Size requested from the provider.
    pub fn video_size(&self) -> Result<Size> {
        match &self.generation.size {
            Some(size) => size.parse(),
            None => self.canvas.size(),
        }
    }

    /// Check everything that can be checked without network access.
    ///
    /// Structural problems are returned as errors; anything that may still
    /// work (missing credentials that the environment can supply, unusual
    /// durations) comes back as warnings.
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        let spec = self.canvas.to_spec()?;
        geometry::plan(&spec)?;
        self.style.to_options()?;
        self.poll.to_poll_config()?;

        let video_size = self.video_size()?;
        if self.generation.provider == ProviderKind::OpenAi && video_size != spec.size {
            warnings.push(format!(
                "generation size {video_size} differs from canvas size {}; composite references will be rejected",
                spec.size
            ));
        }

        if self.generation.seconds == 0 {
            return Err(Error::config("generation.seconds must be positive"));
        }
        if self.generation.model().trim().is_empty() {
            return Err(Error::config("generation.model must not be empty"));
        }

        match self.generation.provider {
            ProviderKind::OpenAi => {
                if !matches!(self.generation.seconds, 4 | 8 | 12) {
                    warnings.push(format!(
                        "OpenAI video lengths are 4, 8 or 12 seconds; got {}",
                        self.generation.seconds
                    ));
                }
                if self.openai.api_key.is_none() {
                    warnings.push("openai.api_key is not set; OPENAI_API_KEY will be used".to_string());
                }
            }
            ProviderKind::Veo => {
                if self.veo.project.is_none() {
                    return Err(Error::config("veo.project is required when provider = \"veo\""));
                }
                if self.veo.access_token.is_none() {
                    warnings.push("veo.access_token is not set; VEO_ACCESS_TOKEN will be used".to_string());
                }
            }
            ProviderKind::Gemini => {
                if self.gemini_project().is_none() {
                    return Err(Error::config(
                        "gemini.project (or veo.project) is required when provider = \"gemini\"",
                    ));
                }
                if self.gemini_access_token().is_none() {
                    warnings.push(
                        "gemini.access_token and veo.access_token are not set; VEO_ACCESS_TOKEN will be used"
                            .to_string(),
                    );
                }
            }
        }

        Ok(warnings)
    }
}
