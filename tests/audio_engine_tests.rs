// Integration tests for the concrete capture and playback engines
//
// These run against real WAV files in a temp directory and real tokio
// timers, so timing assertions are deliberately loose.

use anyhow::Result;
use audio_recorder::audio::{
    AudioFile, CaptureConfig, CaptureEngine, CaptureState, NoiseCaptureEngine, PlaybackEngine,
    WavPlaybackEngine,
};
use audio_recorder::session::{EventSender, PlaybackId, RecordingId, SessionEvent};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

fn write_wav(path: &Path, sample_rate: u32, duration_ms: u64) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let samples = sample_rate as u64 * duration_ms / 1000;
    for i in 0..samples {
        writer.write_sample((i % 100) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

fn drain(inbox: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = inbox.try_recv() {
        events.push(event);
    }
    events
}

async fn next_prepared(
    inbox: &mut mpsc::UnboundedReceiver<SessionEvent>,
) -> Option<(PlaybackId, Result<u64, String>)> {
    timeout(Duration::from_secs(5), async {
        while let Some(event) = inbox.recv().await {
            if let SessionEvent::Prepared { playback, result } = event {
                return Some((playback, result));
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

#[tokio::test]
async fn test_noise_capture_writes_wav_and_reports_progress() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let destination = temp_dir.path().join("takes").join("noise.wav");
    let config = CaptureConfig {
        sample_rate: 16000,
        channels: 1,
        buffer_duration_ms: 20,
        tick_interval_ms: 40,
    };

    let (events, mut inbox) = EventSender::channel();
    let mut engine = NoiseCaptureEngine::new(config);
    let recording = RecordingId(7);

    engine.start(recording, &destination, events).await?;
    assert!(engine.is_capturing());

    sleep(Duration::from_millis(250)).await;
    engine.stop().await?;
    assert!(!engine.is_capturing());

    let received = drain(&mut inbox);
    assert!(matches!(
        received.first(),
        Some(SessionEvent::CaptureStateChanged { state: CaptureState::Started, .. })
    ));
    assert!(matches!(
        received.last(),
        Some(SessionEvent::CaptureStateChanged { state: CaptureState::Stopped, .. })
    ));

    let mut chunks = 0;
    let mut last_tick = 0;
    for event in &received {
        match event {
            SessionEvent::Chunk { recording: id, chunk } => {
                assert_eq!(*id, recording);
                assert_eq!(chunk.len(), 320 * 2, "20ms of 16kHz mono i16");
                chunks += 1;
            }
            SessionEvent::Tick { elapsed_ms, .. } => {
                assert!(*elapsed_ms >= last_tick, "Ticks must not go backwards");
                assert_eq!(elapsed_ms % 40, 0);
                last_tick = *elapsed_ms;
            }
            _ => {}
        }
    }
    assert!(chunks > 0, "Should have produced chunks");
    assert!(last_tick > 0, "Should have produced ticks");

    let file = AudioFile::probe(&destination)?;
    assert_eq!(file.sample_rate, 16000);
    assert_eq!(file.channels, 1);
    assert_eq!(file.duration_ms, chunks * 20);

    Ok(())
}

#[tokio::test]
async fn test_noise_capture_rejects_double_start() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let destination = temp_dir.path().join("noise.wav");
    let (events, _inbox) = EventSender::channel();
    let mut engine = NoiseCaptureEngine::new(CaptureConfig::default());

    engine.start(RecordingId(1), &destination, events.clone()).await?;
    let second = engine.start(RecordingId(2), &destination, events).await;
    engine.stop().await?;

    assert!(second.is_err(), "Second start should fail while capturing");
    Ok(())
}

#[tokio::test]
async fn test_noise_capture_stop_when_idle_is_noop() -> Result<()> {
    let mut engine = NoiseCaptureEngine::new(CaptureConfig::default());
    engine.stop().await?;
    assert!(!engine.is_capturing());
    Ok(())
}

#[test]
fn test_capture_config_default() {
    let config = CaptureConfig::default();

    assert_eq!(config.sample_rate, 16000);
    assert_eq!(config.channels, 1);
    assert_eq!(config.buffer_duration_ms, 100);
    assert_eq!(config.samples_per_buffer(), 1600);
}

#[test]
fn test_audio_file_probe_duration() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("half-second.wav");
    write_wav(&path, 16000, 500)?;

    let file = AudioFile::probe(&path)?;

    assert_eq!(file.duration_ms, 500);
    assert_eq!(file.frame_count, 8000);
    assert_eq!(file.path, path);
    Ok(())
}

#[test]
fn test_audio_file_probe_nonexistent() {
    let result = AudioFile::probe("/nonexistent/path/to/audio.wav");
    assert!(result.is_err(), "Probing a missing file should fail");
}

#[tokio::test]
async fn test_wav_playback_prepares_with_duration() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("clip.wav");
    write_wav(&path, 8000, 300)?;

    let (events, mut inbox) = EventSender::channel();
    let mut engine = WavPlaybackEngine::new();
    engine.open(PlaybackId(3), &path, events).await?;

    let (id, result) = next_prepared(&mut inbox).await.expect("prepare result");
    assert_eq!(id, PlaybackId(3));
    assert_eq!(result, Ok(300));
    assert!(engine.is_prepared());
    assert_eq!(engine.duration_ms(), 300);
    Ok(())
}

#[tokio::test]
async fn test_wav_playback_reports_missing_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (events, mut inbox) = EventSender::channel();
    let mut engine = WavPlaybackEngine::new();

    engine
        .open(PlaybackId(1), &temp_dir.path().join("missing.wav"), events)
        .await?;

    let (_, result) = next_prepared(&mut inbox).await.expect("prepare result");
    assert!(result.is_err());
    assert!(!engine.is_prepared());
    Ok(())
}

#[tokio::test]
async fn test_wav_playback_requires_prepare() {
    let mut engine = WavPlaybackEngine::new();
    assert!(engine.play().await.is_err());
    assert!(!engine.is_playing());
}

#[tokio::test]
async fn test_wav_playback_transport() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("clip.wav");
    write_wav(&path, 8000, 400)?;

    let (events, mut inbox) = EventSender::channel();
    let mut engine = WavPlaybackEngine::new();
    engine.open(PlaybackId(9), &path, events).await?;
    next_prepared(&mut inbox).await.expect("prepare result");

    engine.play().await?;
    sleep(Duration::from_millis(100)).await;
    assert!(engine.is_playing());
    assert!(engine.current_position_ms() >= 90);

    engine.pause().await?;
    let paused_at = engine.current_position_ms();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.current_position_ms(), paused_at, "Position holds while paused");
    assert!(!engine.is_playing());

    engine.seek_to(10_000).await?;
    assert_eq!(engine.current_position_ms(), 400, "Seek clamps to duration");

    engine.seek_to(300).await?;
    engine.play().await?;

    let completed = timeout(Duration::from_secs(5), async {
        while let Some(event) = inbox.recv().await {
            if let SessionEvent::PlaybackCompleted { playback } = event {
                return Some(playback);
            }
        }
        None
    })
    .await?;
    assert_eq!(completed, Some(PlaybackId(9)));
    assert!(!engine.is_playing());
    assert_eq!(engine.current_position_ms(), 400);

    engine.reset().await?;
    assert!(!engine.is_prepared());
    assert_eq!(engine.current_position_ms(), 0);
    Ok(())
}

#[tokio::test]
async fn test_wav_playback_pause_cancels_completion() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("short.wav");
    write_wav(&path, 8000, 100)?;

    let (events, mut inbox) = EventSender::channel();
    let mut engine = WavPlaybackEngine::new();
    engine.open(PlaybackId(4), &path, events).await?;
    next_prepared(&mut inbox).await.expect("prepare result");

    engine.play().await?;
    sleep(Duration::from_millis(20)).await;
    engine.pause().await?;
    sleep(Duration::from_millis(200)).await;

    let completions = drain(&mut inbox)
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::PlaybackCompleted { .. }))
        .count();
    assert_eq!(completions, 0, "Paused transport must not complete");
    Ok(())
}
