//! Audio output.

use async_trait::async_trait;
use lain_core::{LainError, LainResult};
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

/// Plays one synthesized clip.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Resolves once playback has finished.
    async fn play(&self, audio: Vec<u8>) -> LainResult<()>;
}

/// Length of a WAV clip, read from its header.
pub fn wav_duration(audio: &[u8]) -> LainResult<Duration> {
    let reader = hound::WavReader::new(Cursor::new(audio))
        .map_err(|e| LainError::Playback(format!("invalid WAV data: {}", e)))?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return Err(LainError::Playback("WAV header has a zero sample rate".into()));
    }
    Ok(Duration::from_secs_f64(
        f64::from(reader.duration()) / f64::from(sample_rate),
    ))
}

/// Headless sink: waits for as long as the clip would play.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockSink;

#[async_trait]
impl AudioSink for ClockSink {
    async fn play(&self, audio: Vec<u8>) -> LainResult<()> {
        let duration = wav_duration(&audio)?;
        debug!(duration_ms = duration.as_millis() as u64, "Playing clip on clock sink");
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

/// Plays through the default output device.
#[cfg(feature = "audio")]
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioSink;

#[cfg(feature = "audio")]
#[async_trait]
impl AudioSink for RodioSink {
    async fn play(&self, audio: Vec<u8>) -> LainResult<()> {
        tokio::task::spawn_blocking(move || {
            let stream = rodio::OutputStreamBuilder::open_default_stream()
                .map_err(|e| LainError::Playback(format!("no output device: {}", e)))?;
            let sink = rodio::Sink::connect_new(stream.mixer());
            let source = rodio::Decoder::new(Cursor::new(audio))
                .map_err(|e| LainError::Playback(format!("failed to decode audio: {}", e)))?;
            sink.append(source);
            sink.sleep_until_end();
            Ok(())
        })
        .await
        .map_err(|e| LainError::Playback(format!("playback task failed: {}", e)))?
    }
}

/// Mono 16-bit silence of the given length.
#[cfg(test)]
pub(crate) fn silent_wav(duration: Duration) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let frames = (duration.as_secs_f64() * 8_000.0).round() as u32;
    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf
}
