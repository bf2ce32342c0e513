use std::{env, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use neurolock_capture::{DirectoryFrameSource, FrameSource, SyntheticFrameSource};
use neurolock_network::{
    BroadcastBus, EventBus, HttpVerifier, HttpVerifierConfig, LocalVerifier, VerifierClient,
};
use neurolock_ops::{init_tracing, AttemptJournal};
use neurolock_orchestrator::{AttemptRunner, Authenticator, CaptureSettings, FeaturePipeline};
use neurolock_types::{
    config::{
        CaptureConfig, FrameSourceKind, NeuroLockConfig, OpsConfig, VerifierConfig, VisionConfig,
    },
    events::{AttemptEvent, EventPayload},
    NeuroLockError,
};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "neurolock", about = "Challenge-response liveness feature extraction")]
struct Cli {
    /// Path to a TOML config; falls back to NEUROLOCK_CONFIG, then configs/dev.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Request a challenge, capture, and submit features to the verifier.
    Authenticate {
        /// Use the in-process loopback verifier.
        #[arg(long)]
        local: bool,
        #[arg(long)]
        verifier_url: Option<String>,
        /// Replay frames from this directory instead of the configured source.
        #[arg(long)]
        frames_dir: Option<PathBuf>,
    },
    /// Run the feature pipeline only and print the result as JSON.
    Extract {
        #[arg(long)]
        frames_dir: Option<PathBuf>,
        #[arg(long)]
        duration: Option<f64>,
        #[arg(long)]
        fps: Option<u32>,
        /// Write the representative JPEG here.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = load_config(cli.config.clone());
    if let Err(err) = init_tracing(&config.ops) {
        eprintln!("Logging disabled: {err}");
    }

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}

async fn run(command: Command, mut config: NeuroLockConfig) -> Result<()> {
    match command {
        Command::Authenticate {
            local,
            verifier_url,
            frames_dir,
        } => {
            config.verifier.local |= local;
            if let Some(url) = verifier_url {
                config.verifier.base_url = url;
            }
            apply_frames_dir(&mut config.capture, frames_dir);
            config.validate()?;
            authenticate(&config).await
        }
        Command::Extract {
            frames_dir,
            duration,
            fps,
            out,
        } => {
            apply_frames_dir(&mut config.capture, frames_dir);
            if let Some(duration) = duration {
                config.capture.duration_secs = duration;
            }
            if let Some(fps) = fps {
                config.capture.target_fps = fps;
            }
            config.validate()?;
            extract(&config, out).await
        }
    }
}

async fn authenticate(config: &NeuroLockConfig) -> Result<()> {
    let bus = BroadcastBus::new(64);
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            debug!("{}", format_event(&event));
        }
    });

    let mut authenticator = Authenticator::new(
        CaptureSettings::from(&config.capture),
        FeaturePipeline::from_config(&config.vision),
        build_source(&config.capture),
        build_verifier(&config.verifier)?,
        bus,
        AttemptJournal::new(),
    );
    authenticator.prepare().await?;
    let outcome = authenticator.run_attempt().await?;
    info!("Authentication success for attempt {}", outcome.attempt_id);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn extract(config: &NeuroLockConfig, out: Option<PathBuf>) -> Result<()> {
    let mut source = build_source(&config.capture);
    source.open().await?;
    let settings = CaptureSettings::from(&config.capture);
    let features = FeaturePipeline::from_config(&config.vision)
        .run(&mut source, settings.duration_secs, settings.target_fps)
        .await?;

    if let Some(path) = out {
        std::fs::write(&path, &features.representative_frame.jpeg)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Representative frame written to {}", path.display());
    }
    let summary = features.summary(FeaturePipeline::total_frames(
        settings.duration_secs,
        settings.target_fps,
    ));
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn apply_frames_dir(capture: &mut CaptureConfig, frames_dir: Option<PathBuf>) {
    if let Some(dir) = frames_dir {
        capture.source = FrameSourceKind::Directory;
        capture.frame_dir = Some(dir.to_string_lossy().into_owned());
    }
}

fn build_source(config: &CaptureConfig) -> Box<dyn FrameSource> {
    match (config.source, &config.frame_dir) {
        (FrameSourceKind::Directory, Some(dir)) => {
            Box::new(DirectoryFrameSource::new(dir, config.loop_frames))
        }
        _ => Box::new(
            SyntheticFrameSource::new(config.width, config.height)
                .with_blinks(config.synthetic_blinks.iter().copied()),
        ),
    }
}

fn build_verifier(config: &VerifierConfig) -> Result<Box<dyn VerifierClient>> {
    if config.local {
        info!("Using in-process loopback verifier");
        return Ok(Box::new(LocalVerifier::default()));
    }
    Ok(Box::new(HttpVerifier::new(HttpVerifierConfig::from(config))?))
}

fn report_failure(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<NeuroLockError>() {
        Some(NeuroLockError::CaptureUnavailable(detail)) => {
            eprintln!("Could not capture frames: {detail}");
            ExitCode::from(2)
        }
        Some(NeuroLockError::VerificationRejected { reason, .. }) => {
            eprintln!("Authentication failed: {reason}");
            ExitCode::from(3)
        }
        Some(NeuroLockError::ChallengeUnavailable(detail)) => {
            eprintln!("Could not obtain a challenge: {detail}");
            ExitCode::from(4)
        }
        Some(NeuroLockError::VerificationTransport(detail)) => {
            eprintln!("Could not reach the verifier: {detail}");
            ExitCode::from(5)
        }
        _ => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn format_event(event: &AttemptEvent) -> String {
    let timestamp = event.timestamp.format("%H:%M:%S%.3f");
    match &event.payload {
        EventPayload::Challenge {
            challenge_id,
            label,
        } => format!("[{}] Challenge {} ({})", timestamp, challenge_id, label),
        EventPayload::Capture {
            total_frames,
            target_fps,
        } => format!(
            "[{}] Capture {} frames @ {} fps",
            timestamp, total_frames, target_fps
        ),
        EventPayload::Features(summary) => format!(
            "[{}] Features blink={} head_motion={:.2} focus={:.2}",
            timestamp, summary.blink_count, summary.head_motion, summary.focus_score
        ),
        EventPayload::Verified { message } => format!(
            "[{}] Verified {}",
            timestamp,
            message.clone().unwrap_or_default()
        ),
        EventPayload::Failed { category, detail } => {
            format!("[{}] Failed [{}] {}", timestamp, category, detail)
        }
    }
}

fn load_config(from_args: Option<PathBuf>) -> NeuroLockConfig {
    let from_env = env::var("NEUROLOCK_CONFIG").ok().map(PathBuf::from);
    let path = from_args
        .or(from_env)
        .unwrap_or_else(|| PathBuf::from("configs/dev.toml"));
    match NeuroLockConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                );
                default_config()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            default_config()
        }
    }
}

fn default_config() -> NeuroLockConfig {
    let config = NeuroLockConfig {
        capture: CaptureConfig {
            duration_secs: 4.0,
            target_fps: 15,
            source: FrameSourceKind::Synthetic,
            frame_dir: None,
            loop_frames: false,
            width: 640,
            height: 480,
            synthetic_blinks: vec![12, 40],
        },
        vision: VisionConfig {
            jpeg_quality: 70,
            archive_dir: None,
        },
        verifier: VerifierConfig {
            base_url: "http://127.0.0.1:5000".into(),
            timeout_secs: 10,
            local: false,
        },
        ops: OpsConfig {
            log_level: "info".into(),
        },
    };
    debug_assert!(config.validate().is_ok());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(default_config().validate().is_ok());
    }

    #[test]
    fn frames_dir_switches_source() {
        let mut capture = default_config().capture;
        apply_frames_dir(&mut capture, Some(PathBuf::from("frames")));
        assert_eq!(capture.source, FrameSourceKind::Directory);
        assert_eq!(capture.frame_dir.as_deref(), Some("frames"));
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["neurolock", "authenticate", "--local"]).expect("parse");
        assert!(matches!(cli.command, Command::Authenticate { local: true, .. }));

        let cli = Cli::try_parse_from([
            "neurolock", "--config", "x.toml", "extract", "--fps", "30", "--out", "face.jpg",
        ])
        .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Command::Extract { fps: Some(30), .. }));
    }

    #[test]
    fn exit_codes_distinguish_capture_from_rejection() {
        let capture = anyhow::Error::from(NeuroLockError::CaptureUnavailable("gone".into()));
        let rejected = anyhow::Error::from(NeuroLockError::VerificationRejected {
            status: "fail".into(),
            reason: "low_focus".into(),
        });
        let code = |err: &anyhow::Error| format!("{:?}", report_failure(err));
        assert_eq!(code(&capture), format!("{:?}", ExitCode::from(2)));
        assert_eq!(code(&rejected), format!("{:?}", ExitCode::from(3)));
    }
}
