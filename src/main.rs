use anyhow::{Context, Result};
use audio_recorder::session::EventSender;
use audio_recorder::{
    Config, FinishedRecording, NoiseCaptureEngine, SessionController, SessionMode, SessionRuntime,
    WavPlaybackEngine,
};
use clap::Parser;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "audio-recorder")]
#[command(about = "Record a noise clip, then play it back to the end")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/audio-recorder")]
    config: String,

    /// Seconds to record
    #[arg(short, long, default_value = "5")]
    seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Audio recorder v0.1.0");
    info!("Recording to {}", cfg.destination().display());

    let (events, inbox) = EventSender::channel();
    let mut controller = SessionController::new(
        cfg.session_config(),
        Box::new(NoiseCaptureEngine::new(cfg.capture_config())),
        Box::new(WavPlaybackEngine::new()),
        events,
    );
    controller.subscribe(|recording: &FinishedRecording| {
        info!(
            "Finished recording {} ({})",
            recording.path.display(),
            recording.duration_formatted()
        );
    });

    let session = SessionRuntime::spawn(controller, inbox);

    session.record().await?;
    sleep(Duration::from_secs(args.seconds)).await;
    session.stop().await?;

    session.play().await?;
    loop {
        sleep(Duration::from_millis(250)).await;
        let snapshot = session.snapshot().await?;
        info!("{} ({}%)", snapshot.timer, snapshot.percent);

        if let Some(error) = &snapshot.last_error {
            anyhow::bail!("Playback failed: {}", error);
        }
        if snapshot.mode == SessionMode::Recorded {
            break;
        }
    }

    let snapshot = session.snapshot().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?
    );

    session.shutdown().await;
    Ok(())
}
