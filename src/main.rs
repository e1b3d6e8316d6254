mod cli;

use vidstage::config::{self, Config};
use vidstage::pipeline::{self, Pipeline};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use vidstage_jobs::{JobRequest, PollTick, ProviderKind, ReferenceImage};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidstage=trace,vidstage_jobs=trace,vidstage_compose=debug,reqwest=debug".to_string()
        } else {
            "vidstage=info,vidstage_jobs=info,vidstage_compose=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidstage {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let config = load(cli.config.as_deref(), cli.provider)?;
            run_command(command, config)
        }
    }
}

/// Load config, apply the provider override and resolve credentials.
fn load(path: Option<&Path>, provider: Option<ProviderKind>) -> Result<Config> {
    let mut config = config::load_config_or_default(path)?;
    if let Some(provider) = provider {
        config.generation.provider = provider;
    }

    if config.openai.api_key.is_none() {
        config.openai.api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
    }
    if config.veo.access_token.is_none() {
        config.veo.access_token = std::env::var("VEO_ACCESS_TOKEN").ok().filter(|k| !k.is_empty());
    }
    Ok(config)
}

fn run_command(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Compose {
            before,
            after,
            output,
            size,
        } => {
            if let Some(size) = size {
                config.canvas.size = size;
            }
            let composite = pipeline::compose_files(&config, &before, &after, &output)?;
            println!("Composite: {} ({})", output.display(), composite.size());
            Ok(())
        }
        Commands::BeforeAfter {
            before,
            after,
            output,
            composite,
            prompt,
            seconds,
            model,
        } => {
            override_generation(&mut config, seconds, model, None);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(before_after(
                config,
                &before,
                &after,
                &output,
                composite.as_deref(),
                prompt.as_deref(),
            ))
        }
        Commands::Generate {
            prompt,
            output,
            reference,
            size,
            seconds,
            model,
            no_wait,
        } => {
            override_generation(&mut config, seconds, model, size);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(generate(config, &prompt, &output, reference.as_deref(), no_wait))
        }
        Commands::Status { id, watch, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_status(config, &id, watch, json))
        }
        Commands::Download { id, output } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(download(config, &id, &output))
        }
        Commands::Validate { .. } | Commands::Version => Ok(()),
    }
}

async fn before_after(
    config: Config,
    before: &Path,
    after: &Path,
    output: &Path,
    composite: Option<&Path>,
    prompt: Option<&str>,
) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?.with_progress_callback(progress_printer());
    let outcome = pipeline
        .run_before_after(before, after, output, composite, prompt)
        .await
        .context("Before/after generation failed")?;

    if let Some(path) = &outcome.composite {
        println!("Composite: {}", path.display());
    }
    println!("Job: {} ({})", outcome.job.id, outcome.job.status);
    println!("Saved {} bytes to {}", outcome.bytes, outcome.output.display());
    Ok(())
}

async fn generate(
    config: Config,
    prompt: &str,
    output: &Path,
    reference: Option<&Path>,
    no_wait: bool,
) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?.with_progress_callback(progress_printer());
    let request = build_request(&pipeline, prompt, reference)?;

    if no_wait {
        let job = pipeline.submit_only(&request).await?;
        println!("{}", job.id);
        return Ok(());
    }

    let outcome = pipeline
        .generate(&request, output)
        .await
        .context("Generation failed")?;
    println!("Job: {} ({})", outcome.job.id, outcome.job.status);
    println!("Saved {} bytes to {}", outcome.bytes, outcome.output.display());
    Ok(())
}

async fn show_status(config: Config, id: &str, watch: bool, json: bool) -> Result<()> {
    let mut pipeline = Pipeline::from_config(config)?;
    if watch && !json {
        pipeline = pipeline.with_progress_callback(progress_printer());
    }
    let job = if watch {
        pipeline.watch_job(id).await?
    } else {
        pipeline.client().fetch_status(id).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        println!("Job: {}", job.id);
        println!("Status: {}", job.status);
        if let Some(progress) = job.progress {
            println!("Progress: {:.0}%", progress);
        }
        if job.error.is_some() {
            println!("Error: {}", job.error_detail());
        }
    }
    Ok(())
}

async fn download(config: Config, id: &str, output: &Path) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let bytes = pipeline
        .download_job(id, output)
        .await
        .with_context(|| format!("Failed to download job {id}"))?;
    println!("Saved {} bytes to {}", bytes, output.display());
    Ok(())
}

fn override_generation(
    config: &mut Config,
    seconds: Option<u32>,
    model: Option<String>,
    size: Option<String>,
) {
    if let Some(seconds) = seconds {
        config.generation.seconds = seconds;
    }
    if model.is_some() {
        config.generation.model = model;
    }
    if size.is_some() {
        config.generation.size = size;
    }
}

fn build_request(pipeline: &Pipeline, prompt: &str, reference: Option<&Path>) -> Result<JobRequest> {
    let mut request = pipeline.request(Some(prompt))?;
    if let Some(path) = reference {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
        let decoded = vidstage_compose::decode(&bytes)?;
        let dimensions = vidstage_common::Size::new(decoded.width(), decoded.height())?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| pipeline::REFERENCE_FILENAME.to_string());
        let format = image::guess_format(&bytes)?;

        request = request.with_reference(ReferenceImage {
            bytes: bytes.into(),
            mime_type: format.to_mime_type().to_string(),
            filename,
            dimensions: Some(dimensions),
        });
    }
    Ok(request)
}

fn progress_printer() -> pipeline::ProgressCallback {
    Box::new(|tick: &PollTick<'_>| match tick.job.progress {
        Some(progress) => eprintln!(
            "[{:>5.1}s] {} {:.0}%",
            tick.elapsed.as_secs_f64(),
            tick.job.status,
            progress
        ),
        None => eprintln!("[{:>5.1}s] {}", tick.elapsed.as_secs_f64(), tick.job.status),
    })
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config::validate_config(&config)?;
    println!("✓ Configuration is valid");
    println!("  Canvas: {}", config.canvas.size);
    println!("  Provider: {}", config.generation.provider);
    println!("  Model: {}", config.generation.model());
    println!("  Seconds: {}", config.generation.seconds);
    println!(
        "  Poll: every {}ms, timeout {}s",
        config.poll.interval_ms, config.poll.timeout_secs
    );
    for warning in warnings {
        println!("  warning: {}", warning);
    }

    Ok(())
}
