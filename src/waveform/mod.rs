//! Mono audio buffer shared by every extractor stage.
//!
//! Decoded tracks are mixed down to a single channel and optionally cropped
//! before analysis. The buffer remembers how many leading samples the crop
//! removed so selection results can be mapped back to the uncropped track.

pub mod decode;

use crate::timeutils;

/// In-memory mono track with its source sample rate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    crop_offset: usize,
}

impl AudioBuffer {
    /// Wraps already-decoded mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            crop_offset: 0,
        }
    }

    /// Samples remaining after any crop.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples remain.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Cropped sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Source sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Leading samples removed by [`AudioBuffer::crop`].
    ///
    /// Positions inside the cropped buffer plus this offset give positions in
    /// the original track.
    pub fn crop_offset(&self) -> usize {
        self.crop_offset
    }

    /// Discards `front` samples from the start and `back` from the end.
    ///
    /// Requests larger than the buffer saturate to an empty buffer rather
    /// than failing. Repeated crops accumulate into
    /// [`AudioBuffer::crop_offset`], so positions keep mapping back to the
    /// original track.
    pub fn crop(&mut self, front: usize, back: usize) {
        let start = front.min(self.samples.len());
        let end = self.samples.len().saturating_sub(back).max(start);
        self.samples.drain(end..);
        self.samples.drain(..start);
        self.crop_offset += start;
    }

    /// Converts seconds to a sample count at this buffer's rate.
    pub fn in_samples(&self, seconds: f64) -> usize {
        timeutils::in_samples(self.sample_rate, seconds)
    }

    /// Converts a sample count to seconds at this buffer's rate.
    pub fn in_seconds(&self, samples: usize) -> f64 {
        timeutils::in_seconds(self.sample_rate, samples)
    }
}
