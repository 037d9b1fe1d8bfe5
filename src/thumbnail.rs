//! Thumbnail selection engine.
//!
//! Runs every extractor over the cropped track, annotates the segmenter's
//! candidates with loudness and applause, and picks the excerpt to keep.
//! Degraded inputs never abort a run: missing features or an empty candidate
//! list fall back to the middle of the track, and a thumbnail longer than
//! the track falls back to the whole track.

use thiserror::Error;

use crate::analysis::applause::{ApplauseExtractor, StateQueryError};
use crate::analysis::loudness::{FeatureQueryError, LoudnessExtractor};
use crate::analysis::{
    process_all_audio, FeaturesNotReadyError, InvalidSampleRateError,
};
use crate::segment::{Segment, SegmentExtractor, SegmentProvider};
use crate::timeutils;
use crate::waveform::AudioBuffer;

/// How candidate segments are ranked against each other.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RankingMode {
    /// Highest mean RMS wins.
    #[default]
    Loudest,
    /// Widest RMS range (max minus min) wins.
    Dynamic,
}

/// Tunable behaviour of one analysis run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThumbnailPolicy {
    /// Seconds discarded from the track start before analysis.
    pub crop_start: f64,
    /// Seconds discarded from the track end before analysis.
    pub crop_end: f64,
    /// Thumbnail length in seconds.
    pub target_length: f64,
    /// Seconds included before the winning segment's start.
    pub prelude: f64,
    /// Ranking metric for candidate segments.
    pub ranking: RankingMode,
    /// Whether segments containing applause are filtered out.
    pub avoid_applause: bool,
    /// RMS window length in samples.
    pub rms_window_size: usize,
}

impl Default for ThumbnailPolicy {
    fn default() -> Self {
        Self {
            crop_start: 7.0,
            crop_end: 7.0,
            target_length: 30.0,
            prelude: 10.0,
            ranking: RankingMode::Loudest,
            avoid_applause: true,
            rms_window_size: LoudnessExtractor::DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Selected excerpt in original-file sample coordinates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Thumbnail {
    /// First sample of the excerpt.
    pub start: usize,
    /// One past the last sample of the excerpt.
    pub end: usize,
}

impl Thumbnail {
    /// Excerpt length in samples.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True for a degenerate zero-length excerpt.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Lifecycle of one analysis run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnalysisState {
    /// No audio yet.
    NotLoaded,
    /// Audio loaded and cropped.
    Loaded,
    /// Extraction complete, selection in progress.
    Processed,
    /// Thumbnail available.
    Thumbnailed,
}

/// An operation was called in the wrong lifecycle state.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("{operation} requires the {required:?} state, but the run is {actual:?}")]
pub struct NotReadyError {
    /// Operation that was attempted.
    pub operation: &'static str,
    /// State the operation needs.
    pub required: AnalysisState,
    /// State the run was actually in.
    pub actual: AnalysisState,
}

/// A required extractor produced no features at all.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("the {extractor} extractor produced no features")]
pub struct NoFeaturesExtractedError {
    /// Extractor that came back empty.
    pub extractor: &'static str,
}

/// Failure of a whole analysis pass.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Lifecycle misuse.
    #[error("{0}")]
    NotReady(#[from] NotReadyError),
    /// An extractor rejected the track's sample rate.
    #[error("extractor construction failed: {0}")]
    SampleRate(#[from] InvalidSampleRateError),
    /// A segment's loudness could not be measured.
    #[error("segment loudness unavailable: {0}")]
    Loudness(#[from] FeatureQueryError),
    /// A segment's applause state could not be checked.
    #[error("segment applause state unavailable: {0}")]
    Applause(#[from] StateQueryError),
    /// Extractor results were read before finalization.
    #[error("extractor results not ready: {0}")]
    Features(#[from] FeaturesNotReadyError),
}

/// Orchestrates extraction and selection for one track.
pub struct TrackAnalyser {
    policy: ThumbnailPolicy,
    state: AnalysisState,
    audio: Option<AudioBuffer>,
    result: Option<Thumbnail>,
    middle: Option<Thumbnail>,
}

impl TrackAnalyser {
    /// Creates an analyser with the given policy, in the `NotLoaded` state.
    pub fn new(policy: ThumbnailPolicy) -> Self {
        Self {
            policy,
            state: AnalysisState::NotLoaded,
            audio: None,
            result: None,
            middle: None,
        }
    }

    /// Policy this analyser runs under.
    pub fn policy(&self) -> &ThumbnailPolicy {
        &self.policy
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AnalysisState {
        self.state
    }

    /// Loads a decoded track and applies the policy's crop.
    ///
    /// Resets any previous run: the analyser returns to `Loaded` and cached
    /// results are dropped.
    pub fn load(&mut self, mut audio: AudioBuffer) {
        tracing::info!(
            seconds = audio.in_seconds(audio.len()),
            "track length before crop"
        );
        let front = audio.in_samples(self.policy.crop_start);
        let back = audio.in_samples(self.policy.crop_end);
        audio.crop(front, back);
        tracing::info!(
            seconds = audio.in_seconds(audio.len()),
            "track length after crop"
        );
        self.audio = Some(audio);
        self.result = None;
        self.middle = None;
        self.state = AnalysisState::Loaded;
    }

    /// Runs every extractor and selects the thumbnail.
    ///
    /// `segmenter` supplies candidate segments; it is consumed by this run.
    /// On success the run is `Thumbnailed`. If any extractor yields nothing
    /// the middle-thumbnail fallback is used instead of failing.
    pub fn process_all(
        &mut self,
        segmenter: Box<dyn SegmentProvider>,
    ) -> Result<(), AnalysisError> {
        if self.state != AnalysisState::Loaded {
            return Err(self.not_ready("process_all", AnalysisState::Loaded).into());
        }
        let Some(audio) = self.audio.as_ref() else {
            return Err(self.not_ready("process_all", AnalysisState::Loaded).into());
        };
        let sample_rate = audio.sample_rate();
        let crop_offset = audio.crop_offset();
        let track_length = audio.len();

        let mut loudness = LoudnessExtractor::new(sample_rate, self.policy.rms_window_size)?;
        let mut applause = ApplauseExtractor::new(sample_rate)?;
        let mut segments =
            SegmentExtractor::new(segmenter, SegmentExtractor::DEFAULT_TARGET_TYPES);
        tracing::info!(extractor = "loudness", "running extraction pass");
        process_all_audio(&mut loudness, audio.samples());
        tracing::info!(extractor = "applause", "running extraction pass");
        process_all_audio(&mut applause, audio.samples());
        tracing::info!(extractor = "segmentation", "running extraction pass");
        process_all_audio(&mut segments, audio.samples());

        if let Err(missing) = verify_yield(&loudness, &applause, &segments) {
            tracing::warn!("{missing}");
            tracing::info!("creating default thumbnail");
            self.result = Some(self.middle_or_whole(track_length, sample_rate, crop_offset));
            self.state = AnalysisState::Thumbnailed;
            return Ok(());
        }
        self.state = AnalysisState::Processed;
        let thumbnail = self.pick_thumbnail(
            &loudness,
            &applause,
            &segments,
            track_length,
            sample_rate,
            crop_offset,
        )?;
        self.result = Some(thumbnail);
        self.state = AnalysisState::Thumbnailed;
        Ok(())
    }

    /// The selected thumbnail, once the run has finished.
    pub fn thumbnail(&self) -> Result<Thumbnail, NotReadyError> {
        match self.result {
            Some(thumbnail) if self.state == AnalysisState::Thumbnailed => Ok(thumbnail),
            _ => Err(self.not_ready("thumbnail", AnalysisState::Thumbnailed)),
        }
    }

    /// Converts seconds to samples at the loaded track's rate.
    pub fn in_samples(&self, seconds: f64) -> Result<usize, NotReadyError> {
        match self.audio.as_ref() {
            Some(audio) => Ok(audio.in_samples(seconds)),
            None => Err(self.not_ready("in_samples", AnalysisState::Loaded)),
        }
    }

    /// Converts samples to seconds at the loaded track's rate.
    pub fn in_seconds(&self, samples: usize) -> Result<f64, NotReadyError> {
        match self.audio.as_ref() {
            Some(audio) => Ok(audio.in_seconds(samples)),
            None => Err(self.not_ready("in_seconds", AnalysisState::Loaded)),
        }
    }

    /// Thumbnail centred on the middle of the cropped track.
    ///
    /// Computed once and cached; repeated calls return the same value. If the
    /// (even-length) window does not fit, the whole cropped track is returned
    /// as-is.
    pub fn middle_thumbnail(&mut self) -> Result<Thumbnail, NotReadyError> {
        let Some(audio) = self.audio.as_ref() else {
            return Err(self.not_ready("middle_thumbnail", AnalysisState::Loaded));
        };
        let track_length = audio.len();
        let sample_rate = audio.sample_rate();
        let crop_offset = audio.crop_offset();
        Ok(self.middle_or_whole(track_length, sample_rate, crop_offset))
    }

    fn middle_or_whole(
        &mut self,
        track_length: usize,
        sample_rate: u32,
        crop_offset: usize,
    ) -> Thumbnail {
        if let Some(cached) = self.middle {
            return cached;
        }
        let half = timeutils::in_samples(sample_rate, self.policy.target_length) / 2;
        let length = half * 2;
        let thumbnail = if length >= track_length {
            tracing::warn!("audio is shorter than the thumbnail length; using the whole track");
            Thumbnail {
                start: 0,
                end: track_length,
            }
        } else {
            let midpoint = (track_length / 2) as i64;
            let half = half as i64;
            match timeutils::coerce_to_bounds(midpoint - half, midpoint + half, track_length) {
                Ok((start, end)) => offset_thumbnail(start, end, crop_offset),
                Err(_) => Thumbnail {
                    start: 0,
                    end: track_length,
                },
            }
        };
        self.middle = Some(thumbnail);
        thumbnail
    }

    fn pick_thumbnail(
        &mut self,
        loudness: &LoudnessExtractor,
        applause: &ApplauseExtractor,
        segments: &SegmentExtractor,
        track_length: usize,
        sample_rate: u32,
        crop_offset: usize,
    ) -> Result<Thumbnail, AnalysisError> {
        let mut candidates: Vec<Segment> = segments.segments()?.to_vec();
        if candidates.is_empty() {
            tracing::warn!("no musical segments identified; using the middle of the track");
            return Ok(self.middle_or_whole(track_length, sample_rate, crop_offset));
        }

        let segment_rate = segments.segment_sample_rate()?;
        for candidate in &mut candidates {
            candidate.start = rescale(candidate.start, segment_rate, sample_rate);
            candidate.end = rescale(candidate.end, segment_rate, sample_rate);
            let stats = loudness.stats(candidate.start, candidate.end)?;
            candidate.loudness = Some(match self.policy.ranking {
                RankingMode::Loudest => stats.mean,
                RankingMode::Dynamic => stats.max - stats.min,
            });
            if self.policy.avoid_applause {
                candidate.applause =
                    Some(applause.has_applause(candidate.start, candidate.end)?);
            }
        }

        let ranked = rank_candidates(candidates, self.policy.avoid_applause);
        let Some(winner) = ranked.first() else {
            return Ok(self.middle_or_whole(track_length, sample_rate, crop_offset));
        };

        let prelude = timeutils::in_samples(sample_rate, self.policy.prelude) as i64;
        let length = timeutils::in_samples(sample_rate, self.policy.target_length) as i64;
        let start = winner.start as i64 - prelude;
        match timeutils::coerce_to_bounds(start, start + length, track_length) {
            Ok((start, end)) => Ok(offset_thumbnail(start, end, crop_offset)),
            Err(err) => {
                tracing::warn!("{err}; using the whole cropped track");
                Ok(offset_thumbnail(0, track_length, crop_offset))
            }
        }
    }

    fn not_ready(&self, operation: &'static str, required: AnalysisState) -> NotReadyError {
        NotReadyError {
            operation,
            required,
            actual: self.state,
        }
    }
}

/// Filters applause segments and sorts by loudness, best first.
///
/// If applause filtering would empty the pool the filter is discarded. The
/// sort is stable, so equally loud segments keep their original order.
fn rank_candidates(candidates: Vec<Segment>, avoid_applause: bool) -> Vec<Segment> {
    let mut pool: Vec<Segment> = if avoid_applause {
        candidates
            .iter()
            .filter(|segment| segment.applause != Some(true))
            .copied()
            .collect()
    } else {
        candidates.clone()
    };
    if pool.is_empty() {
        tracing::warn!("applause detected in every segment; ignoring applause detection");
        pool = candidates;
    }
    pool.sort_by(|a, b| loudness_metric(b).total_cmp(&loudness_metric(a)));
    pool
}

fn loudness_metric(segment: &Segment) -> f64 {
    segment.loudness.unwrap_or(f64::NEG_INFINITY)
}

fn verify_yield(
    loudness: &LoudnessExtractor,
    applause: &ApplauseExtractor,
    segments: &SegmentExtractor,
) -> Result<(), NoFeaturesExtractedError> {
    if !loudness.features().is_ok_and(|features| !features.is_empty()) {
        return Err(NoFeaturesExtractedError {
            extractor: "loudness",
        });
    }
    if !applause.events().is_ok_and(|events| !events.is_empty()) {
        return Err(NoFeaturesExtractedError {
            extractor: "applause",
        });
    }
    if !segments.segments().is_ok_and(|spans| !spans.is_empty()) {
        return Err(NoFeaturesExtractedError {
            extractor: "segmentation",
        });
    }
    Ok(())
}

fn offset_thumbnail(start: usize, end: usize, crop_offset: usize) -> Thumbnail {
    let thumbnail = Thumbnail {
        start: start + crop_offset,
        end: end + crop_offset,
    };
    tracing::debug!(
        start = thumbnail.start,
        end = thumbnail.end,
        crop_offset,
        "thumbnail offset to original coordinates"
    );
    thumbnail
}

/// Converts a position between two sample rates.
fn rescale(position: usize, from_rate: u32, to_rate: u32) -> usize {
    if from_rate == to_rate || from_rate == 0 {
        return position;
    }
    (position as u64 * u64::from(to_rate) / u64::from(from_rate)) as usize
}
