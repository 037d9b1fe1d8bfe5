//! Windowed RMS loudness with interpolated range queries.
//!
//! One RMS value is recorded per analysis window, giving a sparse loudness
//! profile of the track. Arbitrary sample ranges are then answered by
//! treating that profile as a piecewise-linear signal, so candidate segments
//! never require a second pass over the raw audio.

use thiserror::Error;

use crate::analysis::{
    check_sample_rate, FeatureExtractor, FeaturesNotReadyError, InvalidSampleRateError,
    WindowDomain, WindowFrame,
};
use crate::timeutils::{self, InterpolationError, RangeStats};

/// A loudness range query failed.
#[derive(Debug, Error)]
pub enum FeatureQueryError {
    /// Queried before the extractor finished processing.
    #[error("Loudness is unavailable: {0}")]
    NotReady(#[from] FeaturesNotReadyError),
    /// The recorded profile could not answer the range.
    #[error("Loudness lookup failed: {0}")]
    Interpolation(#[from] InterpolationError),
}

/// Records the RMS amplitude of consecutive equal-length windows.
#[derive(Clone, Debug)]
pub struct LoudnessExtractor {
    sample_rate: u32,
    window_size: usize,
    features: Vec<(usize, f64)>,
    done: bool,
}

impl LoudnessExtractor {
    /// Default RMS window length in samples.
    pub const DEFAULT_WINDOW_SIZE: usize = 1024;

    /// Creates an extractor recording one RMS value every `window_size`
    /// samples.
    pub fn new(sample_rate: u32, window_size: usize) -> Result<Self, InvalidSampleRateError> {
        Ok(Self {
            sample_rate: check_sample_rate(sample_rate)?,
            window_size: window_size.max(1),
            features: Vec::new(),
            done: false,
        })
    }

    /// Sample rate the extractor was built for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Recorded `(timestamp, rms)` pairs, ordered by timestamp.
    pub fn features(&self) -> Result<&[(usize, f64)], FeaturesNotReadyError> {
        if !self.done {
            return Err(FeaturesNotReadyError);
        }
        Ok(&self.features)
    }

    /// Mean, min and max interpolated RMS over `[start_sample, end_sample]`.
    pub fn stats(
        &self,
        start_sample: usize,
        end_sample: usize,
    ) -> Result<RangeStats, FeatureQueryError> {
        let points = self.profile()?;
        Ok(timeutils::range_stats(
            &points,
            start_sample as f64,
            end_sample as f64,
        )?)
    }

    /// Mean interpolated RMS over `[start_sample, end_sample]`.
    pub fn mean(&self, start_sample: usize, end_sample: usize) -> Result<f64, FeatureQueryError> {
        let points = self.profile()?;
        Ok(timeutils::range_mean(
            &points,
            start_sample as f64,
            end_sample as f64,
        )?)
    }

    fn profile(&self) -> Result<Vec<(f64, f64)>, FeaturesNotReadyError> {
        let features = self.features()?;
        Ok(features
            .iter()
            .map(|&(timestamp, rms)| (timestamp as f64, rms))
            .collect())
    }
}

impl FeatureExtractor for LoudnessExtractor {
    fn block_size(&self) -> usize {
        self.window_size
    }

    fn step_size(&self) -> usize {
        self.window_size
    }

    fn domain(&self) -> WindowDomain {
        WindowDomain::Time
    }

    fn process_window(&mut self, frame: WindowFrame<'_>, timestamp: usize) {
        let WindowFrame::Time(samples) = frame else {
            return;
        };
        self.features.push((timestamp, rms(samples)));
    }

    fn finish(&mut self) {
        self.done = true;
    }
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples
        .iter()
        .map(|&sample| f64::from(sample) * f64::from(sample))
        .sum();
    (energy / samples.len() as f64).sqrt()
}
