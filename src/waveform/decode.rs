//! WAV decoding into an [`AudioBuffer`].
//!
//! Multi-channel files are mixed down to mono by averaging each frame.
//! Truncated data chunks are decoded as far as possible; the true decoded
//! length wins over whatever the header claimed.

use std::io::Read;
use std::path::{Path, PathBuf};

use hound::SampleFormat;
use thiserror::Error;

use crate::waveform::AudioBuffer;

/// Failure while opening or decoding a WAV file.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be opened or its header parsed.
    #[error("Unable to open {path}: {source}")]
    Open {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying decoder error.
        source: hound::Error,
    },
    /// The header parsed but no sample data could be read.
    #[error("No decodable samples in {path}: {source}")]
    Read {
        /// File that failed to decode.
        path: PathBuf,
        /// Underlying decoder error.
        source: hound::Error,
    },
    /// The header declares zero channels.
    #[error("{path} declares no audio channels")]
    NoChannels {
        /// File with the malformed header.
        path: PathBuf,
    },
}

/// Loads a WAV file and mixes it down to mono.
pub fn load_wav(path: &Path) -> Result<AudioBuffer, DecodeError> {
    let reader = hound::WavReader::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    decode_reader(reader, path)
}

fn decode_reader<R: Read>(
    mut reader: hound::WavReader<R>,
    path: &Path,
) -> Result<AudioBuffer, DecodeError> {
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(DecodeError::NoChannels {
            path: path.to_path_buf(),
        });
    }
    let claimed_frames = reader.duration() as usize;
    let (raw, stopped_early) = match spec.sample_format {
        SampleFormat::Float => read_samples(reader.samples::<f32>(), |value| value),
        SampleFormat::Int => {
            let scale = (1i64 << spec.bits_per_sample.saturating_sub(1)).max(1) as f32;
            read_samples(reader.samples::<i32>(), move |value| value as f32 / scale)
        }
    };
    if raw.is_empty() {
        if let Some(source) = stopped_early {
            return Err(DecodeError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    } else if let Some(source) = stopped_early {
        tracing::warn!(
            path = %path.display(),
            error = %source,
            "Sample data ended early; processing what was decoded"
        );
    }
    let samples = mix_down(&raw, channels);
    if samples.len() != claimed_frames {
        tracing::warn!(
            path = %path.display(),
            claimed_frames,
            decoded_frames = samples.len(),
            "Header length disagrees with decoded audio; using decoded length"
        );
    }
    Ok(AudioBuffer::new(samples, spec.sample_rate))
}

/// Collects samples until the stream ends or the first decoder error.
fn read_samples<S>(
    samples: impl Iterator<Item = hound::Result<S>>,
    convert: impl Fn(S) -> f32,
) -> (Vec<f32>, Option<hound::Error>) {
    let mut decoded = Vec::new();
    for sample in samples {
        match sample {
            Ok(value) => decoded.push(convert(value)),
            Err(source) => return (decoded, Some(source)),
        }
    }
    (decoded, None)
}

/// Averages interleaved channels into one sample per frame.
///
/// A trailing partial frame is dropped.
fn mix_down(raw: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return raw.to_vec();
    }
    raw.chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
