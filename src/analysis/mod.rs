//! Windowed feature-extraction framework.
//!
//! Extractors declare a block size, a step size and an input domain; the
//! driving loop slices the waveform into windows, transforms each window into
//! the declared domain and feeds it to the extractor with its start sample.
//! A trailing window shorter than the block size is discarded rather than
//! zero-padded, so feature timestamps always refer to full windows.

pub mod applause;
pub mod fft;
pub mod loudness;

use rustfft::num_complex::Complex;
use thiserror::Error;

use crate::analysis::fft::ForwardFft;

/// Input domain an extractor expects its windows in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WindowDomain {
    /// Raw time-domain samples.
    Time,
    /// Full-length complex spectrum of the window.
    Frequency,
}

/// One analysis window, already transformed into the extractor's domain.
#[derive(Clone, Copy, Debug)]
pub enum WindowFrame<'a> {
    /// Time-domain samples, exactly one block long.
    Time(&'a [f32]),
    /// Forward transform of one block, one bin per input sample.
    Frequency(&'a [Complex<f32>]),
}

/// Contract implemented by every feature extractor.
///
/// Implementations accumulate features as windows arrive and expose their
/// results through their own typed accessors once [`FeatureExtractor::finish`]
/// has run.
pub trait FeatureExtractor {
    /// Window length in samples.
    fn block_size(&self) -> usize;

    /// Interval in samples between consecutive window starts.
    fn step_size(&self) -> usize;

    /// Domain the windows must be delivered in.
    fn domain(&self) -> WindowDomain;

    /// Consumes one window starting at `timestamp` samples into the buffer.
    fn process_window(&mut self, frame: WindowFrame<'_>, timestamp: usize);

    /// Marks the end of the stream; features become queryable after this.
    fn finish(&mut self);
}

/// Construction was attempted with a sample rate of zero.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("Sample rate must be a positive number of Hz, got {rate}")]
pub struct InvalidSampleRateError {
    /// The rejected rate.
    pub rate: u32,
}

/// Extractor results were read before the stream was finished.
#[derive(Clone, Copy, Debug, Default, Eq, Error, PartialEq)]
#[error("Extractor results were accessed before processing finished")]
pub struct FeaturesNotReadyError;

pub(crate) fn check_sample_rate(rate: u32) -> Result<u32, InvalidSampleRateError> {
    if rate == 0 {
        return Err(InvalidSampleRateError { rate });
    }
    Ok(rate)
}

/// Slices `samples` into `block_size`-long windows every `step_size` samples.
///
/// Yields `(timestamp, window)` pairs where the timestamp is the window's
/// first sample index. Stops before any window that would run past the end.
pub fn windowed(
    samples: &[f32],
    step_size: usize,
    block_size: usize,
) -> impl Iterator<Item = (usize, &[f32])> {
    let step = step_size.max(1);
    samples
        .windows(block_size.max(1))
        .step_by(step)
        .enumerate()
        .map(move |(index, window)| (index * step, window))
}

/// Runs one extractor over the whole waveform and finalizes it.
///
/// Frequency-domain extractors receive the forward transform of each window;
/// time-domain extractors receive the samples untouched.
pub fn process_all_audio<E>(extractor: &mut E, samples: &[f32])
where
    E: FeatureExtractor + ?Sized,
{
    let block_size = extractor.block_size();
    let step_size = extractor.step_size();
    match extractor.domain() {
        WindowDomain::Time => {
            for (timestamp, window) in windowed(samples, step_size, block_size) {
                extractor.process_window(WindowFrame::Time(window), timestamp);
            }
        }
        WindowDomain::Frequency => {
            let mut fft = ForwardFft::new(block_size.max(1));
            for (timestamp, window) in windowed(samples, step_size, block_size) {
                let spectrum = fft.transform(window);
                extractor.process_window(WindowFrame::Frequency(spectrum), timestamp);
            }
        }
    }
    extractor.finish();
}
