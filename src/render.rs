//! Renders the selected excerpt by driving the external `sox` tool.
//!
//! The excerpt is trimmed out of the input file and faded at both ends in a
//! single sox invocation. A missing input file, a failure to launch sox, and
//! sox exiting unsuccessfully are reported as distinct errors so callers can
//! tell a bad path from a broken tool.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

const SOX_PROGRAM: &str = "sox";

/// Fade-up and fade-down durations in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fade {
    /// Seconds to fade up from silence at the excerpt start.
    pub fade_in: f64,
    /// Seconds to fade down to silence at the excerpt end.
    pub fade_out: f64,
}

/// Failure while rendering the excerpt.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The input file does not exist.
    #[error("Input file {path} not found when creating thumbnail")]
    InputMissing {
        /// Path that was checked.
        path: PathBuf,
    },
    /// The sox process could not be launched at all.
    #[error("Failed to run {SOX_PROGRAM}: {source}")]
    Spawn {
        /// Underlying process error.
        source: std::io::Error,
    },
    /// sox ran but reported failure.
    #[error("{SOX_PROGRAM} exited with {status} while writing {path}")]
    Failed {
        /// Output file sox was asked to write.
        path: PathBuf,
        /// Exit status sox reported.
        status: std::process::ExitStatus,
    },
}

/// Trims `[start, start + duration)` seconds out of `input` into `output`,
/// fading both ends.
pub fn create_thumbnail(
    input: &Path,
    output: &Path,
    start_seconds: f64,
    duration_seconds: f64,
    fade: Fade,
) -> Result<(), RenderError> {
    if !input.is_file() {
        return Err(RenderError::InputMissing {
            path: input.to_path_buf(),
        });
    }
    let mut command = Command::new(SOX_PROGRAM);
    command
        .arg(input)
        .arg(output)
        .arg("trim")
        .arg(format_seconds(start_seconds))
        .arg(format_seconds(duration_seconds))
        .arg("fade")
        .arg("t")
        .arg(format_seconds(fade.fade_in))
        .arg(format_seconds(duration_seconds))
        .arg(format_seconds(fade.fade_out));
    tracing::debug!(?command, "invoking sox");
    let status = command
        .status()
        .map_err(|source| RenderError::Spawn { source })?;
    if !status.success() {
        return Err(RenderError::Failed {
            path: output.to_path_buf(),
            status,
        });
    }
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        start_seconds,
        duration_seconds,
        "rendered thumbnail"
    );
    Ok(())
}

/// Seconds as a plain decimal; sox rejects exponent notation.
fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.6}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_detected_before_spawning() {
        let err = create_thumbnail(
            Path::new("/nonexistent/input.wav"),
            Path::new("/tmp/out.wav"),
            0.0,
            10.0,
            Fade {
                fade_in: 0.5,
                fade_out: 0.5,
            },
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::InputMissing { .. }));
        assert!(err.to_string().contains("input.wav"));
    }

    #[test]
    fn seconds_format_is_plain_decimal() {
        assert_eq!(format_seconds(0.5), "0.500000");
        assert_eq!(format_seconds(30.0), "30.000000");
        // Values that would print in exponent notation by default.
        assert_eq!(format_seconds(1e-7), "0.000000");
    }
}
