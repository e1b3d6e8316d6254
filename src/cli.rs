use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vidstage_jobs::ProviderKind;

#[derive(Parser)]
#[command(name = "vidstage")]
#[command(author, version, about = "Stage before/after images and generate transition videos")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Generation provider (overrides generation.provider)
    #[arg(short, long, global = true)]
    pub provider: Option<ProviderKind>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose two images side by side into a labelled PNG
    Compose {
        /// Image shown on the left (before)
        #[arg(long)]
        before: PathBuf,

        /// Image shown on the right (after)
        #[arg(long)]
        after: PathBuf,

        /// Output PNG
        #[arg(short, long, default_value = "before_after.png")]
        output: PathBuf,

        /// Canvas size, e.g. 720x1280 (overrides canvas.size)
        #[arg(long)]
        size: Option<String>,
    },

    /// Stage two images and generate a before-to-after video
    BeforeAfter {
        #[arg(long)]
        before: PathBuf,

        #[arg(long)]
        after: PathBuf,

        /// Output video
        #[arg(short, long, default_value = "before_after.mp4")]
        output: PathBuf,

        /// Where to keep the composite reference image
        #[arg(long)]
        composite: Option<PathBuf>,

        /// Prompt text (overrides the built-in prompt)
        #[arg(long)]
        prompt: Option<String>,

        /// Clip length in seconds
        #[arg(long)]
        seconds: Option<u32>,

        /// Model identifier
        #[arg(long)]
        model: Option<String>,
    },

    /// Generate a video from a prompt, optionally with a reference image
    Generate {
        /// Prompt text
        #[arg(long, required = true)]
        prompt: String,

        /// Output video
        #[arg(short, long, default_value = "output.mp4")]
        output: PathBuf,

        /// Reference image; its pixel size must match --size
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Video size, e.g. 1280x720
        #[arg(long)]
        size: Option<String>,

        #[arg(long)]
        seconds: Option<u32>,

        #[arg(long)]
        model: Option<String>,

        /// Submit and print the job id without waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// Show the status of a job
    Status {
        /// Job identifier
        #[arg(required = true)]
        id: String,

        /// Poll until the job finishes
        #[arg(long)]
        watch: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a completed job's video
    Download {
        /// Job identifier
        #[arg(required = true)]
        id: String,

        #[arg(short, long, default_value = "output.mp4")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
