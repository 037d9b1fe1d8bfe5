//! Forward transform feeding frequency-domain extractors.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Reusable forward FFT of a fixed window length.
///
/// Produces the full unnormalized complex spectrum, one bin per input
/// sample, with no analysis window applied.
pub struct ForwardFft {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl ForwardFft {
    /// Plans a transform for windows of `size` samples.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        Self {
            fft,
            buffer: vec![Complex::default(); size],
        }
    }

    /// Window length this transform was planned for.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Transforms one window, returning its spectrum.
    ///
    /// The spectrum is valid until the next call. `window` must be exactly
    /// [`ForwardFft::size`] samples long.
    pub fn transform(&mut self, window: &[f32]) -> &[Complex<f32>] {
        debug_assert_eq!(window.len(), self.buffer.len());
        for (cell, &sample) in self.buffer.iter_mut().zip(window) {
            *cell = Complex::new(sample, 0.0);
        }
        self.fft.process(&mut self.buffer);
        &self.buffer
    }
}
