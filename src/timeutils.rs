//! Sample/second conversion and the interpolation math used to evaluate
//! sparse feature series over arbitrary sample ranges.
//! Kept pure so the extractors and the selector stay small and testable.

use thiserror::Error;

/// Errors from interpolating over point pairs or sparse series.
#[derive(Debug, Error, PartialEq)]
pub enum InterpolationError {
    /// The series holds no points at all.
    #[error("Cannot interpolate over an empty series")]
    EmptySeries,
    /// Two points share an x value but disagree in y.
    #[error("Points at x={x} disagree in y ({left} vs {right})")]
    InconsistentInput {
        /// Shared x coordinate of both points.
        x: f64,
        /// y of the first point.
        left: f64,
        /// y of the second point.
        right: f64,
    },
    /// Both points share an x value, so no line exists to extrapolate along.
    #[error("Cannot extrapolate from a single x value {x} to {target}")]
    DegenerateExtrapolation {
        /// Shared x coordinate of both points.
        x: f64,
        /// Requested query x.
        target: f64,
    },
    /// A range query's start lies past its end.
    #[error("Range start {start} lies past its end {end}")]
    InvertedRange {
        /// Query start x.
        start: f64,
        /// Query end x.
        end: f64,
    },
}

/// A candidate range does not fit inside the track it must be placed in.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Range of {length} samples cannot fit in a track of {total} samples")]
pub struct RangeTooLargeError {
    /// Length of the rejected range in samples.
    pub length: i64,
    /// Total track length in samples.
    pub total: usize,
}

/// Aggregate statistics over a piecewise-linear signal slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeStats {
    /// Trapezoidal integral divided by the x-span.
    pub mean: f64,
    /// Smallest y in the slice, boundary points included.
    pub min: f64,
    /// Largest y in the slice, boundary points included.
    pub max: f64,
}

/// Convert a time in seconds to a sample count, truncating.
pub fn in_samples(sample_rate: u32, seconds: f64) -> usize {
    (seconds * f64::from(sample_rate)) as usize
}

/// Convert a sample count to a time in seconds.
pub fn in_seconds(sample_rate: u32, samples: usize) -> f64 {
    samples as f64 / f64::from(sample_rate)
}

/// Linearly interpolate (or extrapolate) a y value at `x` from two points.
///
/// The points may be given in either order; they are sorted by x internally.
/// Returns the full `(x, y)` coordinate of the queried position. When both
/// points sit at the same x, the query must hit that x exactly and the points
/// must agree in y; anything else is an error rather than a guess.
pub fn interpolate(
    a: (f64, f64),
    b: (f64, f64),
    x: f64,
) -> Result<(f64, f64), InterpolationError> {
    let (lo, hi) = if a.0 > b.0 { (b, a) } else { (a, b) };
    if lo.0 == hi.0 {
        if lo.1 != hi.1 {
            return Err(InterpolationError::InconsistentInput {
                x: lo.0,
                left: lo.1,
                right: hi.1,
            });
        }
        if x != lo.0 {
            return Err(InterpolationError::DegenerateExtrapolation { x: lo.0, target: x });
        }
        return Ok(lo);
    }
    let ratio = (x - lo.0) / (hi.0 - lo.0);
    Ok((x, lo.1 + ratio * (hi.1 - lo.1)))
}

/// Mean, min and max of a piecewise-linear signal between two x positions.
///
/// `points` is an ordered-by-x sequence of sparse samples. Query bounds
/// outside the recorded range clamp to the first/last point rather than
/// extrapolating past the data; interior bounds synthesize an exact boundary
/// point between the two neighbouring samples. The mean is the trapezoidal
/// integral of the synthesized slice divided by its x-span; when the slice
/// collapses to a single x, the boundary y is returned as the mean. A query
/// whose start lies past its end is rejected rather than reordered.
pub fn range_stats(
    points: &[(f64, f64)],
    start_x: f64,
    end_x: f64,
) -> Result<RangeStats, InterpolationError> {
    if start_x > end_x {
        return Err(InterpolationError::InvertedRange {
            start: start_x,
            end: end_x,
        });
    }
    let (start_idx, start_point) = locate(points, start_x, Side::Left)?;
    let (end_idx, end_point) = locate(points, end_x, Side::Right)?;

    let mut slice = Vec::with_capacity(end_idx.saturating_sub(start_idx) + 2);
    slice.push(start_point);
    slice.extend_from_slice(&points[start_idx..end_idx]);
    slice.push(end_point);

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &(_, y) in &slice {
        min = min.min(y);
        max = max.max(y);
    }

    let span = slice[slice.len() - 1].0 - slice[0].0;
    if span == 0.0 {
        return Ok(RangeStats {
            mean: start_point.1,
            min,
            max,
        });
    }

    let mut integral = 0.0;
    for pair in slice.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        integral += (x1 - x0) * (y0 + y1) / 2.0;
    }

    Ok(RangeStats {
        mean: integral / span,
        min,
        max,
    })
}

/// Mean component of [`range_stats`] alone.
pub fn range_mean(
    points: &[(f64, f64)],
    start_x: f64,
    end_x: f64,
) -> Result<f64, InterpolationError> {
    Ok(range_stats(points, start_x, end_x)?.mean)
}

/// Shift a candidate `(start, end)` range into `[0, total]` without changing
/// its length.
///
/// Overflow past the end is corrected before underflow below zero, so a
/// negative-start range whose end is already in bounds is still shiftable.
/// A range at least as long as the track cannot be coerced and is rejected.
pub fn coerce_to_bounds(
    start: i64,
    end: i64,
    total: usize,
) -> Result<(usize, usize), RangeTooLargeError> {
    let total_samples = total as i64;
    if end - start >= total_samples {
        return Err(RangeTooLargeError {
            length: end - start,
            total,
        });
    }

    let (mut start, mut end) = (start, end);
    if end > total_samples {
        let overflow = end - total_samples;
        start -= overflow;
        end -= overflow;
    }
    if start < 0 {
        end += -start;
        start = 0;
    }
    Ok((start as usize, end as usize))
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Find the slice index for a query x and the exact boundary point there.
///
/// Out-of-range queries return the nearest recorded point (index 0 or
/// `points.len()` so the later slice excludes nothing or everything); interior
/// queries interpolate between the two neighbouring samples. `side` breaks
/// ties when the query lands exactly on a recorded x, mirroring a left- or
/// right-biased binary search.
fn locate(
    points: &[(f64, f64)],
    x: f64,
    side: Side,
) -> Result<(usize, (f64, f64)), InterpolationError> {
    let first = *points.first().ok_or(InterpolationError::EmptySeries)?;
    let last = points[points.len() - 1];
    if x < first.0 {
        return Ok((0, first));
    }
    if x > last.0 {
        return Ok((points.len(), last));
    }
    let position = match side {
        Side::Left => points.partition_point(|point| point.0 < x),
        Side::Right => points.partition_point(|point| point.0 <= x),
    };
    let lo = points[position.saturating_sub(1)];
    let hi = points[position.min(points.len() - 1)];
    let boundary = interpolate(lo, hi, x)?;
    Ok((position, boundary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn interpolate_is_exact_at_endpoints() {
        assert_eq!(interpolate((0.0, 11.0), (1.0, 10.0), 0.0), Ok((0.0, 11.0)));
        assert_eq!(interpolate((0.0, 11.0), (1.0, 10.0), 1.0), Ok((1.0, 10.0)));
    }

    #[test]
    fn interpolate_tolerates_swapped_points() {
        let forward = interpolate((0.0, 4.0), (10.0, 8.0), 2.5).unwrap();
        let swapped = interpolate((10.0, 8.0), (0.0, 4.0), 2.5).unwrap();
        assert_eq!(forward, swapped);
        assert_close(forward.1, 5.0);
    }

    #[test]
    fn interpolate_extrapolates_past_the_segment() {
        // y = 2x + 5 through (5,15) and (10,25).
        let (x, y) = interpolate((5.0, 15.0), (10.0, 25.0), 30.0).unwrap();
        assert_close(x, 30.0);
        assert_close(y, 65.0);
    }

    #[test]
    fn interpolate_accepts_duplicate_point_at_its_own_x() {
        assert_eq!(interpolate((3.0, 7.0), (3.0, 7.0), 3.0), Ok((3.0, 7.0)));
    }

    #[test]
    fn interpolate_rejects_inconsistent_duplicate_x() {
        let err = interpolate((3.0, 7.0), (3.0, 9.0), 3.0).unwrap_err();
        assert!(matches!(err, InterpolationError::InconsistentInput { .. }));
    }

    #[test]
    fn interpolate_rejects_extrapolation_from_single_x() {
        let err = interpolate((3.0, 7.0), (3.0, 7.0), 5.0).unwrap_err();
        assert!(matches!(
            err,
            InterpolationError::DegenerateExtrapolation { .. }
        ));
    }

    #[test]
    fn range_stats_of_constant_series_is_flat() {
        let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64 * 8.0, 3.5)).collect();
        let stats = range_stats(&points, 10.0, 50.0).unwrap();
        assert_close(stats.mean, 3.5);
        assert_close(stats.min, 3.5);
        assert_close(stats.max, 3.5);
    }

    #[test]
    fn range_stats_integrates_step_series() {
        // Blocks of width 8 at levels 8, 2, 8: trapezoids average to 5.
        let points = [(0.0, 8.0), (8.0, 2.0), (16.0, 8.0)];
        let stats = range_stats(&points, 0.0, 16.0).unwrap();
        assert_close(stats.mean, 5.0);
        assert_close(stats.min, 2.0);
        assert_close(stats.max, 8.0);
    }

    #[test]
    fn range_stats_clamps_queries_outside_the_data() {
        let points = [(0.0, 8.0), (8.0, 2.0), (16.0, 8.0)];
        // Querying past both ends is the same as querying the full range.
        let stats = range_stats(&points, -5.0, 100.0).unwrap();
        assert_close(stats.mean, 5.0);
    }

    #[test]
    fn range_stats_synthesizes_interior_boundaries() {
        // Linear ramp: mean over any interior span is the midpoint value.
        let points = [(0.0, 0.0), (10.0, 10.0), (20.0, 20.0)];
        let stats = range_stats(&points, 5.0, 15.0).unwrap();
        assert_close(stats.mean, 10.0);
        assert_close(stats.min, 5.0);
        assert_close(stats.max, 15.0);
    }

    #[test]
    fn range_stats_collapsed_span_returns_boundary_value() {
        let points = [(5.0, 3.0)];
        let stats = range_stats(&points, 0.0, 10.0).unwrap();
        assert_close(stats.mean, 3.0);
        assert_close(stats.min, 3.0);
        assert_close(stats.max, 3.0);
    }

    #[test]
    fn range_stats_rejects_empty_series() {
        assert_eq!(
            range_stats(&[], 0.0, 10.0).unwrap_err(),
            InterpolationError::EmptySeries
        );
    }

    #[test]
    fn range_stats_rejects_inverted_bounds() {
        let points = [(0.0, 8.0), (8.0, 2.0), (16.0, 8.0)];
        let err = range_stats(&points, 10.0, 5.0).unwrap_err();
        assert_eq!(
            err,
            InterpolationError::InvertedRange {
                start: 10.0,
                end: 5.0
            }
        );
    }

    #[test]
    fn range_mean_matches_stats_mean() {
        let points = [(0.0, 8.0), (8.0, 2.0), (16.0, 8.0)];
        assert_close(range_mean(&points, 0.0, 16.0).unwrap(), 5.0);
    }

    #[test]
    fn coerce_shifts_underflowing_range_right() {
        assert_eq!(coerce_to_bounds(-10, 10, 25), Ok((0, 20)));
    }

    #[test]
    fn coerce_shifts_overflowing_range_left() {
        assert_eq!(coerce_to_bounds(10, 30, 25), Ok((5, 25)));
    }

    #[test]
    fn coerce_leaves_in_bounds_range_alone() {
        assert_eq!(coerce_to_bounds(4, 14, 25), Ok((4, 14)));
    }

    #[test]
    fn coerce_rejects_range_at_least_as_long_as_the_track() {
        let err = coerce_to_bounds(0, 40, 20).unwrap_err();
        assert_eq!(err.length, 40);
        assert_eq!(err.total, 20);
        assert!(coerce_to_bounds(0, 20, 20).is_err());
    }

    #[test]
    fn coerce_preserves_length() {
        for (start, end) in [(-30i64, -10i64), (-3, 17), (5, 25), (90, 110)] {
            let (new_start, new_end) = coerce_to_bounds(start, end, 50).unwrap();
            assert_eq!((new_end - new_start) as i64, end - start);
            assert!(new_end <= 50);
        }
    }

    #[test]
    fn sample_second_conversions_round_trip() {
        assert_eq!(in_samples(8000, 2.5), 20_000);
        assert_close(in_seconds(8000, 20_000), 2.5);
        // Truncation, not rounding.
        assert_eq!(in_samples(44_100, 0.9999), 44_095);
    }
}
