use crate::error::EpisodeError;
use rodio::Source;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Sample rate whisper models expect.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

const RESAMPLER_CHUNK: usize = 1024;

/// Decode an audio file (MP3, WAV, FLAC, OGG) into mono PCM at 16 kHz.
///
/// Multi-channel audio is downmixed by averaging, and anything not already
/// at 16 kHz is resampled. Samples come back normalized to `[-1.0, 1.0]`,
/// ready for whisper inference.
pub fn decode_audio_file(path: &Path) -> Result<Vec<f32>, EpisodeError> {
    let file = File::open(path)?;
    let source = rodio::Decoder::new(BufReader::new(file))
        .map_err(|e| EpisodeError::Decode(e.to_string()))?;

    let sample_rate = source.sample_rate();
    let channels = source.channels();
    let samples: Vec<f32> = source.convert_samples().collect();

    tracing::debug!(
        "decoded {:?}: {} samples, {} Hz, {} channel(s)",
        path,
        samples.len(),
        sample_rate,
        channels
    );

    let mono = downmix_to_mono(&samples, channels as usize);

    if sample_rate == WHISPER_SAMPLE_RATE {
        Ok(mono)
    } else {
        resample(&mono, sample_rate, WHISPER_SAMPLE_RATE)
    }
}

/// Average interleaved frames down to a single channel.
fn downmix_to_mono(samples: &[f32], num_channels: usize) -> Vec<f32> {
    if num_channels <= 1 {
        return samples.to_vec();
    }

    let num_frames = samples.len() / num_channels;
    let mut mono = Vec::with_capacity(num_frames);

    for frame in 0..num_frames {
        let mut sum = 0.0f32;
        for ch in 0..num_channels {
            sum += samples[frame * num_channels + ch];
        }
        mono.push(sum / num_channels as f32);
    }

    mono
}

/// Resample mono audio from `source_rate` to `target_rate`.
fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, EpisodeError> {
    let ratio = target_rate as f64 / source_rate as f64;
    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Linear, RESAMPLER_CHUNK, 1)
            .map_err(|e| EpisodeError::Decode(e.to_string()))?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize);
    let mut pos = 0;

    while pos + RESAMPLER_CHUNK <= samples.len() {
        let frames = resampler
            .process(&[&samples[pos..pos + RESAMPLER_CHUNK]], None)
            .map_err(|e| EpisodeError::Decode(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
        pos += RESAMPLER_CHUNK;
    }

    if pos < samples.len() {
        let frames = resampler
            .process_partial(Some(&[&samples[pos..]]), None)
            .map_err(|e| EpisodeError::Decode(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    tracing::debug!(
        "resampled {} samples at {} Hz to {} samples at {} Hz",
        samples.len(),
        source_rate,
        output.len(),
        target_rate
    );

    Ok(output)
}
