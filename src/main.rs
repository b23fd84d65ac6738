//! Command-line recorder and player.
//!
//! Ties the capture and playback sessions together behind a small set of
//! actions: record, play a WAV file, record-then-play, and record-then-save.
//! Devices are selected interactively when more than one is available.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use pcm_stream::{
    list_input_devices, list_output_devices, wav::WavReader, AudioDevice, CaptureSession,
    PlaybackSession, Recording, Sample, SessionConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Capture from an input device and report what was recorded.
    Record,
    /// Play an existing WAV file.
    Play,
    /// Capture, then immediately play the recording back.
    RecordPlay,
    /// Capture, then save the recording as a WAV file.
    RecordSave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SampleFormat {
    /// 16-bit signed integer PCM.
    I16,
    /// 32-bit IEEE float PCM.
    F32,
}

/// Record and play PCM audio through a bounded lock-free sample queue.
#[derive(Debug, Parser)]
#[command(name = "pcm-stream", version, about)]
struct Args {
    /// What to do.
    #[arg(value_enum, default_value_t = Action::RecordPlay)]
    action: Action,

    /// WAV file to play from or save to.
    #[arg(long, default_value = "recording.wav")]
    file: PathBuf,

    /// Recording duration in seconds.
    #[arg(long, default_value_t = 4)]
    secs: u64,

    /// Sample format for capture.
    #[arg(long, value_enum, default_value_t = SampleFormat::I16)]
    format: SampleFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    match (args.action, args.format) {
        (Action::Play, _) => play_file(&args.file).await,
        (_, SampleFormat::I16) => run_capture::<i16>(&args).await,
        (_, SampleFormat::F32) => run_capture::<f32>(&args).await,
    }
}

async fn run_capture<T: Sample>(args: &Args) -> anyhow::Result<()> {
    let config = SessionConfig {
        duration: Duration::from_secs(args.secs),
        ..SessionConfig::default()
    };

    let device = select_input_device()?;
    println!(
        "Recording {} seconds from \"{}\"...",
        args.secs,
        device.name()
    );

    let session =
        CaptureSession::<T>::open(&device, &config).context("failed to start capture")?;
    let recording = session.finish().await;

    println!(
        "Captured {} samples ({:.2}s), {} dropped",
        recording.samples.len(),
        recording.duration().as_secs_f64(),
        recording.dropped
    );

    match args.action {
        Action::Record => Ok(()),
        Action::RecordPlay => play_recording(&recording).await,
        Action::RecordSave => {
            recording
                .save(&args.file)
                .await
                .with_context(|| format!("failed to save {}", args.file.display()))?;
            println!("Saved to {}", args.file.display());
            Ok(())
        }
        Action::Play => unreachable!("play is dispatched before capture"),
    }
}

async fn play_recording<T: Sample>(recording: &Recording<T>) -> anyhow::Result<()> {
    let device = select_output_device()?;
    println!("Playing back on \"{}\"...", device.name());

    let session = PlaybackSession::open(
        &device,
        Arc::clone(&recording.samples),
        recording.sample_rate,
        recording.channels,
    )
    .await
    .context("failed to start playback")?;

    let report = session.finish().await;
    println!(
        "Played {} samples ({} silence-padded)",
        report.played, report.underrun_samples
    );
    Ok(())
}

async fn play_file(path: &Path) -> anyhow::Result<()> {
    let reader =
        WavReader::open(path).with_context(|| format!("failed to read {}", path.display()))?;
    let spec = *reader.spec();
    println!(
        "{}: {} Hz, {} channel(s), {} bits (format {}), {:.2}s",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.format_tag,
        reader.duration().as_secs_f64()
    );

    match (spec.format_tag, spec.bits_per_sample) {
        (1, 16) => {
            let samples = reader.samples::<i16>()?;
            play_samples(samples, spec.sample_rate, spec.channels).await
        }
        (3, 32) => {
            let samples = reader.samples::<f32>()?;
            play_samples(samples, spec.sample_rate, spec.channels).await
        }
        (tag, bits) => bail!("unsupported WAV encoding: format tag {tag}, {bits} bits"),
    }
}

async fn play_samples<T: Sample>(
    samples: Vec<T>,
    sample_rate: u32,
    channels: u16,
) -> anyhow::Result<()> {
    let device = select_output_device()?;
    println!("Playing on \"{}\"...", device.name());

    let session = PlaybackSession::open(&device, Arc::new(samples), sample_rate, channels)
        .await
        .context("failed to start playback")?;
    let report = session.finish().await;
    println!(
        "Played {} samples ({} silence-padded)",
        report.played, report.underrun_samples
    );
    Ok(())
}

fn select_input_device() -> anyhow::Result<AudioDevice> {
    let names = list_input_devices().context("failed to enumerate input devices")?;
    match prompt_device_choice("input", &names)? {
        Some(index) => Ok(AudioDevice::input_by_index(index)?),
        None => Ok(AudioDevice::default_input()?),
    }
}

fn select_output_device() -> anyhow::Result<AudioDevice> {
    let names = list_output_devices().context("failed to enumerate output devices")?;
    match prompt_device_choice("output", &names)? {
        Some(index) => Ok(AudioDevice::output_by_index(index)?),
        None => Ok(AudioDevice::default_output()?),
    }
}

/// Prints a numbered device list and reads a selection from stdin.
///
/// Returns `None` (use the default device) when there is at most one device
/// or the user just presses enter.
fn prompt_device_choice(kind: &str, names: &[String]) -> anyhow::Result<Option<usize>> {
    if names.len() <= 1 {
        return Ok(None);
    }

    println!("Available {kind} devices:");
    for (i, name) in names.iter().enumerate() {
        println!("  [{i}] {name}");
    }
    print!("Select {kind} device [default]: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let index: usize = line
        .parse()
        .with_context(|| format!("invalid device number \"{line}\""))?;
    if index >= names.len() {
        bail!("device number {index} out of range (0..{})", names.len() - 1);
    }
    Ok(Some(index))
}
