//! Second-order biquad low-pass filter (§4.8).
//!
//! The reference implementation's exact `Biquad::Coefficients::LPF2` formula
//! was not available to ground this against, so coefficients follow the
//! standard Audio EQ Cookbook two-pole lowpass (RBJ); see DESIGN.md.

use crate::dsp;

const MIN_CUTOFF_HZ: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    fn lowpass(cutoff_hz: f32, q: f32, sample_rate: f32) -> Coefficients {
        let w0 = std::f32::consts::TAU * cutoff_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha;
        let b0 = (1.0 - cos_w0) / 2.0 / a0;
        let b1 = (1.0 - cos_w0) / a0;
        let b2 = b0;
        let a1 = -2.0 * cos_w0 / a0;
        let a2 = (1.0 - alpha) / a0;

        Coefficients { b0, b1, b2, a1, a2 }
    }
}

/// Direct-form-I biquad with coefficient caching: recomputation only
/// happens when the clamped cutoff or Q actually changed since the last
/// sample (§4.8 — coefficient math is comparatively expensive and most
/// voices hold a steady cutoff/resonance across many samples).
#[derive(Clone, Debug)]
pub struct LowPassFilter {
    coefficients: Coefficients,
    last_cutoff_hz: f32,
    last_q: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl LowPassFilter {
    pub fn new(sample_rate: f32) -> Self {
        let max_cutoff = 0.45 * sample_rate;
        LowPassFilter {
            coefficients: Coefficients::lowpass(max_cutoff, resonance_centibels_to_q(0.0), sample_rate),
            last_cutoff_hz: max_cutoff,
            last_q: resonance_centibels_to_q(0.0),
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// `cutoff_cents` is the modulated `initialFilterCutoff`-derived cents
    /// value; `resonance_centibels` is the modulated `initialFilterResonance`.
    pub fn process(&mut self, input: f32, cutoff_cents: f32, resonance_centibels: f32, sample_rate: f32) -> f32 {
        let cutoff_hz = dsp::cents_to_hz(cutoff_cents).clamp(MIN_CUTOFF_HZ, 0.45 * sample_rate);
        let q = resonance_centibels_to_q(resonance_centibels);

        if cutoff_hz != self.last_cutoff_hz || q != self.last_q {
            self.coefficients = Coefficients::lowpass(cutoff_hz, q, sample_rate);
            self.last_cutoff_hz = cutoff_hz;
            self.last_q = q;
        }

        let c = self.coefficients;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

fn resonance_centibels_to_q(centibels: f32) -> f32 {
    dsp::centibels_to_resonance(centibels)
}
