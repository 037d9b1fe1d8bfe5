//! Candidate segments and the boundary to the structure segmenter.
//!
//! The segmenter proposes `(start, end, type)` spans from a stream of
//! frequency-domain windows. It is consumed as a black box: window sizes are
//! dictated by the segmenter, and positions are expressed at whatever sample
//! rate it reports, which may differ from the source rate.

pub mod novelty;

use rustfft::num_complex::Complex;

use crate::analysis::{FeatureExtractor, FeaturesNotReadyError, WindowDomain, WindowFrame};

/// One candidate excerpt, annotated during selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// First sample of the span.
    pub start: usize,
    /// One past the last sample of the span.
    pub end: usize,
    /// Segmenter-assigned category id.
    pub kind: u32,
    /// Loudness metric, filled in by the selector.
    pub loudness: Option<f64>,
    /// Applause flag, filled in by the selector when avoidance is on.
    pub applause: Option<bool>,
}

impl Segment {
    /// Creates an unannotated segment.
    pub fn new(start: usize, end: usize, kind: u32) -> Self {
        Self {
            start,
            end,
            kind,
            loudness: None,
            applause: None,
        }
    }

    /// Span length in samples.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True for a degenerate zero-length span.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Raw segmenter output: ordered spans plus the rate they are expressed at.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Segmentation {
    /// `(start, end, type)` spans, ordered by start.
    pub spans: Vec<(usize, usize, u32)>,
    /// Sample rate the span positions are expressed at.
    pub sample_rate: u32,
}

/// Contract the structure segmenter is consumed through.
///
/// Feed every window of the track, then call `finish` exactly once with the
/// desired number of segment types.
pub trait SegmentProvider {
    /// Window length the segmenter wants, in source samples.
    fn block_size(&self) -> usize;

    /// Interval between window starts, in source samples.
    fn step_size(&self) -> usize;

    /// Consumes the spectrum of one window starting at `timestamp`.
    fn feed(&mut self, spectrum: &[Complex<f32>], timestamp: usize);

    /// Clusters everything fed so far into at most `target_types` categories.
    fn finish(&mut self, target_types: u32) -> Segmentation;
}

/// Runs a [`SegmentProvider`] under the extractor framework.
///
/// Adapts the provider's feed/finish surface to the windowed driving loop so
/// segmentation runs over the track exactly like the other extractors.
pub struct SegmentExtractor {
    provider: Box<dyn SegmentProvider>,
    target_types: u32,
    segments: Vec<Segment>,
    segment_sample_rate: u32,
    done: bool,
}

impl SegmentExtractor {
    /// Default number of segment categories to ask for.
    pub const DEFAULT_TARGET_TYPES: u32 = 4;

    /// Wraps a provider, requesting `target_types` segment categories.
    pub fn new(provider: Box<dyn SegmentProvider>, target_types: u32) -> Self {
        Self {
            provider,
            target_types,
            segments: Vec::new(),
            segment_sample_rate: 0,
            done: false,
        }
    }

    /// Candidate segments, ordered by start.
    pub fn segments(&self) -> Result<&[Segment], FeaturesNotReadyError> {
        if !self.done {
            return Err(FeaturesNotReadyError);
        }
        Ok(&self.segments)
    }

    /// Rate the segment positions are expressed at, as reported by the
    /// segmenter itself.
    pub fn segment_sample_rate(&self) -> Result<u32, FeaturesNotReadyError> {
        if !self.done {
            return Err(FeaturesNotReadyError);
        }
        Ok(self.segment_sample_rate)
    }
}

impl FeatureExtractor for SegmentExtractor {
    fn block_size(&self) -> usize {
        self.provider.block_size()
    }

    fn step_size(&self) -> usize {
        self.provider.step_size()
    }

    fn domain(&self) -> WindowDomain {
        WindowDomain::Frequency
    }

    fn process_window(&mut self, frame: WindowFrame<'_>, timestamp: usize) {
        let WindowFrame::Frequency(spectrum) = frame else {
            return;
        };
        self.provider.feed(spectrum, timestamp);
    }

    fn finish(&mut self) {
        let segmentation = self.provider.finish(self.target_types);
        self.segment_sample_rate = segmentation.sample_rate;
        self.segments = segmentation
            .spans
            .iter()
            .map(|&(start, end, kind)| Segment::new(start, end, kind))
            .collect();
        for (index, segment) in self.segments.iter().enumerate() {
            tracing::debug!(
                index,
                start = segment.start,
                end = segment.end,
                kind = segment.kind,
                "candidate segment"
            );
        }
        self.done = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::process_all_audio;

    /// Provider that hands back a scripted segmentation.
    struct ScriptedProvider {
        block_size: usize,
        step_size: usize,
        result: Segmentation,
    }

    impl ScriptedProvider {
        fn new(spans: Vec<(usize, usize, u32)>, sample_rate: u32) -> Self {
            Self {
                block_size: 8,
                step_size: 4,
                result: Segmentation { spans, sample_rate },
            }
        }
    }

    impl SegmentProvider for ScriptedProvider {
        fn block_size(&self) -> usize {
            self.block_size
        }

        fn step_size(&self) -> usize {
            self.step_size
        }

        fn feed(&mut self, spectrum: &[Complex<f32>], _timestamp: usize) {
            assert_eq!(spectrum.len(), self.block_size);
        }

        fn finish(&mut self, _target_types: u32) -> Segmentation {
            self.result.clone()
        }
    }

    #[test]
    fn segment_length_is_end_minus_start() {
        let segment = Segment::new(10, 25, 0);
        assert_eq!(segment.len(), 15);
        assert!(!segment.is_empty());
        assert!(Segment::new(5, 5, 0).is_empty());
    }

    #[test]
    fn new_segments_start_unannotated() {
        let segment = Segment::new(0, 10, 2);
        assert_eq!(segment.loudness, None);
        assert_eq!(segment.applause, None);
    }

    #[test]
    fn adapter_reports_the_providers_window_geometry() {
        let extractor = SegmentExtractor::new(Box::new(ScriptedProvider::new(Vec::new(), 0)), 4);
        assert_eq!(extractor.block_size(), 8);
        assert_eq!(extractor.step_size(), 4);
        assert_eq!(extractor.domain(), WindowDomain::Frequency);
    }

    #[test]
    fn adapter_feeds_spectra_and_collects_spans_on_finish() {
        let provider = ScriptedProvider::new(vec![(0, 100, 0), (100, 240, 1)], 11_025);
        let mut extractor = SegmentExtractor::new(Box::new(provider), 4);
        let samples = vec![0.25; 16];
        process_all_audio(&mut extractor, &samples);
        let segments = extractor.segments().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 0);
        assert_eq!(segments[0].end, 100);
        assert_eq!(segments[1].kind, 1);
        assert_eq!(extractor.segment_sample_rate().unwrap(), 11_025);
    }

    #[test]
    fn segments_are_guarded_until_finish() {
        let extractor = SegmentExtractor::new(Box::new(ScriptedProvider::new(Vec::new(), 0)), 4);
        assert!(extractor.segments().is_err());
        assert!(extractor.segment_sample_rate().is_err());
    }
}
