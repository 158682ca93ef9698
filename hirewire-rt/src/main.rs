//! HireWire realtime core - command-line entry point
//!
//! Operator tooling around the interview core: run the safety filter or the
//! context assembler offline, push recorded chunks through the upload path,
//! and inspect the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hirewire_common::events::EventBus;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use hirewire_rt::assembler::{AnswerEvaluation, ContextAssembler};
use hirewire_rt::config::RuntimeConfig;
use hirewire_rt::recorder::RecordingChunk;
use hirewire_rt::safety::SafetyMonitor;
use hirewire_rt::upload::{HttpBlockStore, UploadCoordinator, UploadMetadata};

#[derive(Parser, Debug)]
#[command(name = "hirewire-rt")]
#[command(about = "HireWire realtime interview core tools")]
#[command(version)]
struct Args {
    /// Configuration file (overrides HIREWIRE_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a model response through the content safety filter
    Filter {
        #[arg(long)]
        response: String,

        /// Question the response answers
        #[arg(long)]
        question: Option<String>,
    },

    /// Assemble the interviewer context from a JSON file of answer evaluations
    Assemble {
        #[arg(long)]
        evaluations: PathBuf,

        /// Required skills; defaults to the configured list
        #[arg(long, value_delimiter = ',')]
        skills: Vec<String>,

        #[arg(long, default_value_t = 3)]
        tier: u8,

        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Upload recorded chunk files in order and commit them
    Upload {
        #[arg(long)]
        session: Uuid,

        /// Recording length in seconds
        #[arg(long, default_value_t = 0.0)]
        duration: f64,

        /// Chunk files, in capture order
        #[arg(required = true)]
        chunks: Vec<PathBuf>,
    },

    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (file_config, config) = RuntimeConfig::load(args.config.as_deref());

    let default_filter = format!(
        "hirewire_rt={},hirewire_common=info",
        if file_config.logging.level.is_empty() {
            "debug"
        } else {
            file_config.logging.level.as_str()
        }
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match args.command {
        Command::Filter { response, question } => {
            let monitor = SafetyMonitor::new();
            let result = monitor.check(&response, question.as_deref());
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Assemble {
            evaluations,
            skills,
            tier,
            max_tokens,
        } => {
            let raw = std::fs::read_to_string(&evaluations)
                .with_context(|| format!("Failed to read {}", evaluations.display()))?;
            let answers: Vec<AnswerEvaluation> = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid evaluations in {}", evaluations.display()))?;
            let required = if skills.is_empty() {
                config.required_skills.clone()
            } else {
                skills
            };

            let assembler = ContextAssembler::new(config.context.clone());
            let bundle = assembler.assemble(&answers, &required, tier, max_tokens);
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        }

        Command::Upload {
            session,
            duration,
            chunks,
        } => {
            if config.upload.chunk_endpoint.is_empty()
                || config.upload.finalize_endpoint.is_empty()
            {
                bail!("[upload] chunk_endpoint and finalize_endpoint must be configured");
            }
            let store = HttpBlockStore::new(
                config.upload.chunk_endpoint.clone(),
                config.upload.finalize_endpoint.clone(),
                config.upload.request_timeout,
            )
            .context("Failed to build upload client")?;
            let coordinator = UploadCoordinator::new(
                session,
                Arc::new(store),
                config.upload.clone(),
                EventBus::new(config.event_bus_capacity),
            );

            let format = chunks
                .first()
                .and_then(|p| p.extension())
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_else(|| "webm".to_string());
            let mime_type = format!("video/{}", format);

            for (i, path) in chunks.iter().enumerate() {
                let data = std::fs::read(path)
                    .with_context(|| format!("Failed to read chunk {}", path.display()))?;
                coordinator.enqueue(RecordingChunk {
                    session_id: session,
                    sequence_index: i as u64 + 1,
                    data,
                    mime_type: mime_type.clone(),
                    recorded_at: chrono::Utc::now(),
                });
            }
            info!(session_id = %session, chunks = chunks.len(), "Chunks queued");

            let report = coordinator
                .finalize(UploadMetadata {
                    duration: Duration::from_secs_f64(duration.max(0.0)),
                    format,
                    resolution: config.recorder.resolution.clone(),
                    frame_rate: config.recorder.frame_rate,
                })
                .await
                .context("Upload commit failed")?;

            println!(
                "committed {} block(s), {} pending at commit, {} bytes",
                report.committed.len(),
                report.pending_at_commit,
                report.file_size
            );
        }

        Command::Config => {
            let rendered = toml::to_string_pretty(&file_config)
                .context("Failed to render configuration")?;
            println!("{}", rendered);
        }
    }

    Ok(())
}
