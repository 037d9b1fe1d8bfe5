//! Library exports for reuse in benchmarks and tests.
/// Windowed feature-extraction framework and the concrete extractors.
pub mod analysis;
/// Application directory helpers.
pub mod app_dirs;
/// TOML settings file handling.
pub mod config;
/// Tracing subscriber setup.
pub mod logging;
/// External sox rendering.
pub mod render;
/// Candidate segments and the structure-segmenter boundary.
pub mod segment;
/// Thumbnail selection engine.
pub mod thumbnail;
/// Sample/second conversion and interpolation math.
pub mod timeutils;
/// Mono audio buffer and WAV decoding.
pub mod waveform;
