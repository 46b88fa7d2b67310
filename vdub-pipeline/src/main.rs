//! vdub - command-line entry point
//!
//! Dubs one audio file into another language:
//!
//! ```text
//! vdub --input talk.mp3 --lang es --output talk.es.mp3
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vdub_common::config::TomlConfig;
use vdub_pipeline::audio::FfmpegEncoder;
use vdub_pipeline::collaborators::{HttpSynthesizer, HttpTranscriber, HttpTranslator, SpeechServiceClient};
use vdub_pipeline::logging::{init_tracing, BOOTSTRAP_LEVEL};
use vdub_pipeline::{Collaborators, PipelineOrchestrator, PipelineRequest, PipelineSettings};

/// Command-line arguments for vdub
#[derive(Parser, Debug)]
#[command(name = "vdub")]
#[command(about = "Replace the narration of an audio file with a dubbed voice")]
#[command(version)]
struct Args {
    /// Input audio file (mp3, wav, flac, ogg, m4a, ...)
    #[arg(short, long)]
    input: PathBuf,

    /// Target language code (en, es, fr, de, it, pt)
    #[arg(short, long)]
    lang: String,

    /// Where to write the dubbed MP3
    #[arg(short, long)]
    output: PathBuf,

    /// Config file (overrides VDUB_CONFIG and the platform config path)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parent directory for scratch workspaces
    #[arg(long, env = "VDUB_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// Speech model service base URL
    #[arg(long, env = "VDUB_SERVICE_URL")]
    service_url: Option<String>,

    /// Give up after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vdub: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    // Subscriber first so config resolution warnings are visible
    let log_handle = init_tracing(BOOTSTRAP_LEVEL);

    let mut config = TomlConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(root) = args.workspace_root {
        config.workspace_root = root;
    }
    if let Some(url) = args.service_url {
        config.services.base_url = url;
    }

    log_handle.set_level(&config.logging.level);
    info!("Starting vdub {}", env!("CARGO_PKG_VERSION"));
    info!("Workspace root: {}", config.workspace_root.display());
    info!("Speech service: {}", config.services.base_url);

    let client = Arc::new(SpeechServiceClient::new(
        &config.services.base_url,
        Duration::from_secs(config.services.timeout_secs),
    )?);
    let collaborators = Collaborators {
        transcriber: Arc::new(HttpTranscriber::new(client.clone())),
        translator: Arc::new(HttpTranslator::new(client.clone())),
        synthesizer: Arc::new(HttpSynthesizer::new(client)),
    };

    let encoder = FfmpegEncoder::new(&config.audio.ffmpeg_path, config.audio.bitrate_kbps);
    if !encoder.is_available().await {
        warn!(
            "ffmpeg not found at {}, encoding will fail",
            config.audio.ffmpeg_path.display()
        );
    }

    let orchestrator = PipelineOrchestrator::new(
        PipelineSettings::from_config(&config),
        collaborators,
        Arc::new(encoder),
    );

    let audio = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let mut request = PipelineRequest::new(audio, args.lang);
    if let Some(name) = args.input.file_name().and_then(|n| n.to_str()) {
        request = request.with_filename_hint(name);
    }

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_signal_or_timeout(cancel.clone(), args.timeout_secs));

    let result = orchestrator.run_with_cancellation(request, cancel).await;
    watcher.abort();

    let dubbed = result.map_err(|e| anyhow::anyhow!("{}", e.public_message()))?;
    tokio::fs::write(&args.output, &dubbed.bytes)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        "Wrote {} ({:.1}s, {} -> {})",
        args.output.display(),
        dubbed.duration_secs,
        dubbed.source_language,
        dubbed.target_language
    );
    Ok(())
}

/// Cancel `token` on Ctrl+C, SIGTERM, or after `timeout_secs`
async fn cancel_on_signal_or_timeout(token: CancellationToken, timeout_secs: Option<u64>) {
    let timeout = async {
        match timeout_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = shutdown_signal() => {},
        _ = timeout => {
            warn!("Request timed out, cancelling");
        },
    }
    token.cancel();
}

/// Ctrl+C / SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling");
        },
        _ = terminate => {
            info!("Received terminate signal, cancelling");
        },
    }
}
