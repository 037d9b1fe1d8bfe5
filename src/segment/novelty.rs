//! Spectral-flux novelty segmenter.
//!
//! A self-contained [`SegmentProvider`] that places boundaries where the
//! magnitude spectrum changes sharply. It is deliberately simple: one flux
//! value per window, a mean-plus-deviation threshold, and a minimum segment
//! length to keep boundaries at a musical scale. Categories are assigned by
//! each span's relative energy.

use rustfft::num_complex::Complex;

use crate::analysis::{check_sample_rate, InvalidSampleRateError};
use crate::segment::{SegmentProvider, Segmentation};
use crate::timeutils;

/// Fraction of the mean window energy a flux peak must exceed.
const ENERGY_FLOOR_RATIO: f64 = 0.05;

/// Per-window measurements kept until `finish`.
#[derive(Clone, Copy, Debug)]
struct WindowMeasure {
    timestamp: usize,
    flux: f64,
    energy: f64,
}

/// Detects section boundaries from frame-to-frame spectral change.
pub struct NoveltySegmenter {
    sample_rate: u32,
    block_size: usize,
    step_size: usize,
    min_gap_windows: usize,
    previous: Vec<f64>,
    windows: Vec<WindowMeasure>,
}

impl NoveltySegmenter {
    /// Interval between analysis windows, in seconds.
    pub const DEFAULT_HOP_SECONDS: f64 = 0.2;
    /// Shortest span a boundary may create, in seconds.
    pub const DEFAULT_MIN_SEGMENT_SECONDS: f64 = 4.0;

    /// Creates a segmenter for audio at `sample_rate`.
    pub fn new(sample_rate: u32) -> Result<Self, InvalidSampleRateError> {
        let sample_rate = check_sample_rate(sample_rate)?;
        let step_size = timeutils::in_samples(sample_rate, Self::DEFAULT_HOP_SECONDS).max(1);
        let min_span = timeutils::in_samples(sample_rate, Self::DEFAULT_MIN_SEGMENT_SECONDS);
        Ok(Self {
            sample_rate,
            block_size: step_size * 2,
            step_size,
            min_gap_windows: min_span.div_ceil(step_size).max(1),
            previous: Vec::new(),
            windows: Vec::new(),
        })
    }

    fn boundaries(&self) -> Vec<usize> {
        let count = self.windows.len();
        if count < 2 {
            return Vec::new();
        }
        let mean = self.windows.iter().map(|w| w.flux).sum::<f64>() / count as f64;
        let variance = self
            .windows
            .iter()
            .map(|w| (w.flux - mean) * (w.flux - mean))
            .sum::<f64>()
            / count as f64;
        let threshold = mean + variance.sqrt();
        // A boundary must also move a real share of the spectral mass, or
        // numerically near-identical windows of a steady signal would split
        // on float jitter alone.
        let mean_energy = self.windows.iter().map(|w| w.energy).sum::<f64>() / count as f64;
        let floor = mean_energy * ENERGY_FLOOR_RATIO;
        let mut picked = Vec::new();
        let mut last_index = 0usize;
        for index in 1..count {
            if index < last_index + self.min_gap_windows
                || count - index < self.min_gap_windows
            {
                continue;
            }
            let flux = self.windows[index].flux;
            if flux <= threshold || flux <= floor {
                continue;
            }
            let rising = flux >= self.windows[index - 1].flux;
            let falling = index + 1 == count || flux >= self.windows[index + 1].flux;
            if rising && falling {
                picked.push(index);
                last_index = index;
            }
        }
        picked
    }

    fn span_kind(span_energy: f64, lowest: f64, highest: f64, target_types: u32) -> u32 {
        let types = target_types.max(1);
        if types == 1 || highest <= lowest {
            return 0;
        }
        let scaled = (span_energy - lowest) / (highest - lowest) * f64::from(types - 1);
        scaled.round() as u32
    }
}

impl SegmentProvider for NoveltySegmenter {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn step_size(&self) -> usize {
        self.step_size
    }

    fn feed(&mut self, spectrum: &[Complex<f32>], timestamp: usize) {
        // Real input mirrors the upper bins, so one side carries the signal.
        let half = (spectrum.len() / 2 + 1).min(spectrum.len());
        let magnitudes: Vec<f64> = spectrum[..half]
            .iter()
            .map(|bin| f64::from(bin.norm()))
            .collect();
        let energy = magnitudes.iter().sum::<f64>();
        let flux = if self.previous.is_empty() {
            0.0
        } else {
            magnitudes
                .iter()
                .zip(&self.previous)
                .map(|(current, previous)| (current - previous).max(0.0))
                .sum()
        };
        self.previous = magnitudes;
        self.windows.push(WindowMeasure {
            timestamp,
            flux,
            energy,
        });
    }

    fn finish(&mut self, target_types: u32) -> Segmentation {
        let Some(last) = self.windows.last() else {
            return Segmentation {
                spans: Vec::new(),
                sample_rate: self.sample_rate,
            };
        };
        let track_end = last.timestamp + self.block_size;
        let mut starts = vec![0usize];
        starts.extend(
            self.boundaries()
                .iter()
                .map(|&index| self.windows[index].timestamp),
        );
        let mut spans = Vec::with_capacity(starts.len());
        for (position, &start) in starts.iter().enumerate() {
            let end = starts.get(position + 1).copied().unwrap_or(track_end);
            let window_energies: Vec<f64> = self
                .windows
                .iter()
                .filter(|w| w.timestamp >= start && w.timestamp < end)
                .map(|w| w.energy)
                .collect();
            let mean_energy = if window_energies.is_empty() {
                0.0
            } else {
                window_energies.iter().sum::<f64>() / window_energies.len() as f64
            };
            spans.push((start, end, mean_energy));
        }
        let lowest = spans.iter().map(|s| s.2).fold(f64::INFINITY, f64::min);
        let highest = spans.iter().map(|s| s.2).fold(f64::NEG_INFINITY, f64::max);
        Segmentation {
            spans: spans
                .iter()
                .map(|&(start, end, energy)| {
                    (
                        start,
                        end,
                        Self::span_kind(energy, lowest, highest, target_types),
                    )
                })
                .collect(),
            sample_rate: self.sample_rate,
        }
    }
}
