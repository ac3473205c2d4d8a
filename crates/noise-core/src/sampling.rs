//! Loudness sampling.
//!
//! A [`Sampler`] turns the most recent window of audio amplitudes into a
//! single loudness value: the root mean square of the window.

/// Number of amplitude samples per loudness reading
pub const ANALYSER_WINDOW: usize = 2048;

/// Source of instantaneous loudness readings.
pub trait Sampler {
    /// Loudness of the most recent amplitude window, `>= 0`
    fn sample(&mut self) -> f32;
}

impl<S: Sampler + ?Sized> Sampler for Box<S> {
    fn sample(&mut self) -> f32 {
        (**self).sample()
    }
}

/// Root mean square of an amplitude buffer, `0.0` for an empty buffer
pub fn rms(amplitudes: &[f32]) -> f32 {
    if amplitudes.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = amplitudes.iter().map(|a| a * a).sum();
    (sum_squares / amplitudes.len() as f32).sqrt()
}
