//! Applause detection via spectral crest factor hysteresis.
//!
//! Applause is broadband and noise-like, so its spectrum is flat and the
//! crest factor (peak over total magnitude) is low, while music concentrates
//! energy in a few bins and scores high. A moving average smooths the
//! per-window crest factor and a two-threshold state machine turns the
//! smoothed value into sparse state-transition events.

use std::collections::VecDeque;

use rustfft::num_complex::Complex;
use thiserror::Error;

use crate::analysis::{
    check_sample_rate, FeatureExtractor, FeaturesNotReadyError, InvalidSampleRateError,
    WindowDomain, WindowFrame,
};

/// Classifier state for one stretch of audio.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApplauseState {
    /// Noise-like, low crest factor.
    Applause,
    /// Tonal, high crest factor.
    Music,
}

/// One recorded state transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ApplauseEvent {
    /// State entered at `timestamp`.
    pub state: ApplauseState,
    /// Window start sample where the transition happened.
    pub timestamp: usize,
}

/// A state lookup against the event log failed.
#[derive(Debug, Error)]
pub enum StateQueryError {
    /// Queried before the extractor finished processing.
    #[error("Applause state is unavailable: {0}")]
    NotReady(#[from] FeaturesNotReadyError),
    /// The whole track produced no transition, so no state is known.
    #[error("No applause or music transitions were recorded")]
    NoEvents,
}

/// Detects applause-like passages from the smoothed spectral crest factor.
///
/// Events are only recorded when the classifier changes state, so the log
/// stays sparse and state at an arbitrary sample is reconstructed by
/// searching for the last transition at or before it.
#[derive(Clone, Debug)]
pub struct ApplauseExtractor {
    sample_rate: u32,
    block_size: usize,
    step_size: usize,
    threshold: f64,
    hysteresis: f64,
    smoothing: VecDeque<f64>,
    smoothing_capacity: usize,
    state: Option<ApplauseState>,
    events: Vec<ApplauseEvent>,
    done: bool,
}

impl ApplauseExtractor {
    /// Default analysis window length in samples.
    pub const DEFAULT_BLOCK_SIZE: usize = 1024;
    /// Default interval between window starts in samples.
    pub const DEFAULT_STEP_SIZE: usize = 512;
    /// Default crest-factor decision threshold.
    pub const DEFAULT_THRESHOLD: f64 = 0.04;
    /// Default width of the hysteresis band around the threshold.
    pub const DEFAULT_HYSTERESIS: f64 = 0.02;
    /// Default number of windows in the moving average.
    pub const DEFAULT_SMOOTHING_LENGTH: usize = 500;

    /// Creates an extractor with the default tuning.
    pub fn new(sample_rate: u32) -> Result<Self, InvalidSampleRateError> {
        Ok(Self {
            sample_rate: check_sample_rate(sample_rate)?,
            block_size: Self::DEFAULT_BLOCK_SIZE,
            step_size: Self::DEFAULT_STEP_SIZE,
            threshold: Self::DEFAULT_THRESHOLD,
            hysteresis: Self::DEFAULT_HYSTERESIS,
            smoothing: VecDeque::new(),
            smoothing_capacity: Self::DEFAULT_SMOOTHING_LENGTH,
            state: None,
            events: Vec::new(),
            done: false,
        })
    }

    /// Sample rate the extractor was built for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Recorded transitions, ordered by timestamp.
    pub fn events(&self) -> Result<&[ApplauseEvent], FeaturesNotReadyError> {
        if !self.done {
            return Err(FeaturesNotReadyError);
        }
        Ok(&self.events)
    }

    /// State in effect at `sample`, with the index of the governing event.
    ///
    /// Samples before the first transition are attributed to that first
    /// event's state.
    pub fn state_at(&self, sample: usize) -> Result<(ApplauseEvent, usize), StateQueryError> {
        let events = self.events()?;
        if events.is_empty() {
            return Err(StateQueryError::NoEvents);
        }
        let position = events
            .partition_point(|event| event.timestamp <= sample)
            .saturating_sub(1);
        Ok((events[position], position))
    }

    /// Whether any applause transition lies between the governing events of
    /// `start_sample` and `end_sample`.
    ///
    /// A passage that is applause throughout, with no transition inside the
    /// range, reports `false`; only transitions are visible to this check.
    pub fn has_applause(
        &self,
        start_sample: usize,
        end_sample: usize,
    ) -> Result<bool, StateQueryError> {
        let (_, start_index) = self.state_at(start_sample)?;
        let (_, end_index) = self.state_at(end_sample)?;
        if start_index >= end_index {
            return Ok(false);
        }
        Ok(self.events[start_index..end_index]
            .iter()
            .any(|event| event.state == ApplauseState::Applause))
    }

    fn observe(&mut self, crest: f64, timestamp: usize) {
        if self.smoothing.len() == self.smoothing_capacity {
            self.smoothing.pop_front();
        }
        self.smoothing.push_back(crest);
        let mean = self.smoothing.iter().sum::<f64>() / self.smoothing.len() as f64;
        if let Some(state) = self.classify(mean) {
            tracing::debug!(?state, timestamp, "applause classifier transition");
            self.events.push(ApplauseEvent { state, timestamp });
        }
    }

    fn classify(&mut self, mean: f64) -> Option<ApplauseState> {
        let lower = self.threshold - self.hysteresis / 2.0;
        let upper = self.threshold + self.hysteresis / 2.0;
        match self.state {
            Some(ApplauseState::Music) => {
                if mean < lower {
                    self.state = Some(ApplauseState::Applause);
                    return self.state;
                }
            }
            _ => {
                if mean > upper {
                    self.state = Some(ApplauseState::Music);
                    return self.state;
                }
            }
        }
        None
    }
}

impl FeatureExtractor for ApplauseExtractor {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn step_size(&self) -> usize {
        self.step_size
    }

    fn domain(&self) -> WindowDomain {
        WindowDomain::Frequency
    }

    fn process_window(&mut self, frame: WindowFrame<'_>, timestamp: usize) {
        let WindowFrame::Frequency(spectrum) = frame else {
            return;
        };
        self.observe(spectral_crest(spectrum), timestamp);
    }

    fn finish(&mut self) {
        self.done = true;
    }
}

/// Peak over total of the normalized magnitude spectrum.
///
/// A silent window yields NaN, which compares false against both thresholds
/// and therefore never causes a transition.
fn spectral_crest(spectrum: &[Complex<f32>]) -> f64 {
    let scale = spectrum.len() as f64 * 0.5;
    let mut peak = 0.0;
    let mut total = 0.0;
    for bin in spectrum {
        let magnitude = f64::from(bin.norm()) / scale;
        total += magnitude;
        if magnitude > peak {
            peak = magnitude;
        }
    }
    peak / total
}
