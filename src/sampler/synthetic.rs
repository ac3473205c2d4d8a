use noise_core::sampling::{ANALYSER_WINDOW, Sampler, rms};

/// Assumed audio sample rate of the generated waveform
const SAMPLE_RATE_HZ: f32 = 48_000.0;

/// Frequency of the generated tone
const TONE_HZ: f32 = 440.0;

/// Generates a deterministic, slowly varying tone so the meter can run
/// without audio hardware.
///
/// The amplitude follows a couple of overlapping slow sinusoids plus a
/// short burst every few seconds, which makes the upper percentiles move
/// visibly apart from the 75th.
pub struct SyntheticSampler {
    /// Seconds of fake time elapsed
    elapsed_secs: f64,
    /// Fake time advanced per reading
    step_secs: f64,
    window: Vec<f32>,
}

impl SyntheticSampler {
    pub fn new(step_secs: f64) -> Self {
        Self {
            elapsed_secs: 0.0,
            step_secs,
            window: vec![0.0; ANALYSER_WINDOW],
        }
    }

    /// Peak amplitude at time `t`, in `[0, 1]`
    fn amplitude(t: f64) -> f32 {
        let base = 0.08 + 0.04 * (t / 11.0).sin() + 0.02 * (t / 3.7).cos();
        let burst = 0.5 * (t / 2.3).sin().max(0.0).powi(16);
        (base + burst).clamp(0.0, 1.0) as f32
    }
}

impl Sampler for SyntheticSampler {
    fn sample(&mut self) -> f32 {
        self.elapsed_secs += self.step_secs;
        let amplitude = Self::amplitude(self.elapsed_secs);

        let omega = 2.0 * std::f32::consts::PI * TONE_HZ / SAMPLE_RATE_HZ;
        for (i, slot) in self.window.iter_mut().enumerate() {
            *slot = amplitude * (omega * i as f32).sin();
        }
        rms(&self.window)
    }
}
