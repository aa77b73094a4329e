//! Triangular bipolar LFO with an optional startup delay (§4.5).
//!
//! One type serves both the modulator LFO and the vibrato LFO; callers
//! distinguish them only by which generators feed `configure` and which
//! generators the output is routed to.

use crate::dsp;

const INSTANTANEOUS_SENTINEL: f32 = -32768.0;

#[derive(Clone, Copy, Debug)]
pub struct LfoConfig {
    pub frequency_cents: f32,
    pub delay_time_cents: f32,
}

#[derive(Clone, Debug)]
pub struct Lfo {
    value: f32,
    increment: f32,
    delay_samples: u32,
}

impl Lfo {
    pub fn new() -> Self {
        Lfo { value: 0.0, increment: 0.0, delay_samples: 0 }
    }

    /// Resets the oscillator to the start of its delay and recomputes the
    /// per-sample increment from the configured frequency.
    pub fn configure(&mut self, config: &LfoConfig, sample_rate: f32) {
        let frequency_hz = dsp::lfo_cents_to_frequency(config.frequency_cents);
        self.increment = 4.0 * frequency_hz / sample_rate;
        self.delay_samples = if config.delay_time_cents <= INSTANTANEOUS_SENTINEL {
            0
        } else {
            (dsp::cents_to_seconds(config.delay_time_cents) * sample_rate).round().max(0.0) as u32
        };
        self.value = 0.0;
    }

    /// Emits the current value, then advances by one sample: during the
    /// delay countdown the LFO holds at 0; afterward it's a triangle wave
    /// that reflects off `±1` instead of clamping, so the waveform stays
    /// continuous.
    pub fn process(&mut self) -> f32 {
        if self.delay_samples > 0 {
            self.delay_samples -= 1;
            return 0.0;
        }
        let output = self.value;
        self.value += self.increment;
        if self.value > 1.0 {
            self.value = 2.0 - self.value;
            self.increment = -self.increment;
        } else if self.value < -1.0 {
            self.value = -2.0 - self.value;
            self.increment = -self.increment;
        }
        output
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Lfo::new()
    }
}
