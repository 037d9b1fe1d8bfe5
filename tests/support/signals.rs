use rand::{Rng, SeedableRng, rngs::StdRng};

/// Sample rate all synthetic test signals are generated at.
pub const RATE: u32 = 8_000;

/// Pure sine of `seconds` length at peak `amplitude`.
pub fn tone(frequency: f32, amplitude: f32, seconds: f64) -> Vec<f32> {
    let length = (seconds * f64::from(RATE)) as usize;
    (0..length)
        .map(|n| (n as f32 / RATE as f32 * frequency * std::f32::consts::TAU).sin() * amplitude)
        .collect()
}

/// Uniform white noise of `seconds` length, deterministic per `seed`.
///
/// Its flat spectrum gives a low crest factor, which is what the applause
/// classifier keys on.
pub fn noise(amplitude: f32, seconds: f64, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let length = (seconds * f64::from(RATE)) as usize;
    (0..length)
        .map(|_| rng.random_range(-amplitude..=amplitude))
        .collect()
}
