use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use skill_gap::config::Config;
use skill_gap::extract::{Artifact, DocumentFormat};
use skill_gap::{run, ComparisonReport, SkillGapAnalyzer};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "skill-gap")]
#[command(about = "Compare a resume against a job description and report missing skills")]
#[command(group(ArgGroup::new("resume_input").required(true).args(["resume", "resume_text"])))]
#[command(group(ArgGroup::new("job_input").required(true).args(["job", "job_text"])))]
struct Args {
    /// Resume file (txt, md, pdf, docx)
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Resume given inline as plain text
    #[arg(long)]
    resume_text: Option<String>,

    /// Job description file (txt, md, pdf, docx)
    #[arg(long)]
    job: Option<PathBuf>,

    /// Job description given inline as plain text
    #[arg(long)]
    job_text: Option<String>,

    /// Resume format tag or MIME type, overrides the file extension
    #[arg(long)]
    resume_format: Option<String>,

    /// Job description format tag or MIME type, overrides the file extension
    #[arg(long)]
    job_format: Option<String>,

    /// Skill vocabulary CSV, overrides `vocabulary.path`
    #[arg(long)]
    vocabulary: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.log_format)?;

    info!("Starting skill-gap v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = &args.vocabulary {
        config.vocabulary.path = path.clone();
    }
    config.validate().context("Invalid configuration")?;
    info!("Configuration loaded");

    let resume = load_artifact(
        args.resume.as_deref(),
        args.resume_text.clone(),
        args.resume_format.as_deref(),
    )
    .await
    .context("Failed to read resume")?;
    let job = load_artifact(
        args.job.as_deref(),
        args.job_text.clone(),
        args.job_format.as_deref(),
    )
    .await
    .context("Failed to read job description")?;

    // Model loading and matching are CPU bound
    let report = tokio::task::spawn_blocking(move || -> Result<ComparisonReport> {
        let analyzer =
            SkillGapAnalyzer::from_config(&config).context("Failed to initialize analyzer")?;
        run(&resume, &job, &analyzer).context("Skill gap analysis failed")
    })
    .await
    .context("Analysis task failed")??;

    match args.output {
        OutputFormat::Text => println!("{}", report),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        ),
    }

    Ok(())
}

fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(log_level).into())
    });

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .context("Failed to set tracing subscriber")
}

async fn load_artifact(
    path: Option<&Path>,
    text: Option<String>,
    format: Option<&str>,
) -> Result<Artifact> {
    if let Some(text) = text {
        return Ok(Artifact::plain_text(text));
    }

    let path = path.context("No input given")?;
    let format = match format {
        Some(tag) => DocumentFormat::from_tag(tag)?,
        None => DocumentFormat::from_path(path)?,
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;

    info!("Read {:?} as {} ({} bytes)", path, format, bytes.len());
    Ok(Artifact::new(bytes, format))
}
