//! Scalar DSP helpers and precomputed lookup tables shared across the engine.
//!
//! Everything here is pure and allocation-free once the `once_cell::sync::Lazy`
//! statics have been forced, matching the teacher's `POW2_LUT` / `EXP_LUT`
//! pattern of building a table once and indexing it from the render path.

use once_cell::sync::Lazy;

/// Largest absolute cents value `cents_to_hz` will honor before clamping.
pub const MAXIMUM_ABSOLUTE_CENTS: f32 = 13_508.0;
/// Cents in one octave.
pub const CENTS_PER_OCTAVE: f32 = 1200.0;
/// Frequency, in Hz, of MIDI key 0 (about 8.176 Hz, ~C-1 at A440 12-TET).
pub const LOWEST_NOTE_FREQUENCY: f32 = 8.175_798_9;
/// Floor below which a release-stage voice is considered inaudible.
pub const NOISE_FLOOR: f32 = 0.000_01;
/// `960` centibels is silence for the attenuation table (`-96 dB`).
pub const NOISE_FLOOR_CENTIBELS: f32 = 960.0;
/// Attenuation centibels beyond which a voice contributes nothing.
pub const MAXIMUM_ATTENUATION_CENTIBELS: f32 = 1440.0;

const CENTS_PARTIAL_TABLE_SIZE: usize = 1200;
const ATTENUATION_TABLE_SIZE: usize = 1441;
const POWER2_TABLE_SIZE: usize = 24001;
const POWER2_TABLE_OFFSET: i32 = 12000;
const PAN_TABLE_SIZE: usize = 1001;

fn build_cents_partial_lookup() -> Vec<f32> {
    (0..CENTS_PARTIAL_TABLE_SIZE)
        .map(|i| 6.875 * 2f32.powf(i as f32 / CENTS_PER_OCTAVE))
        .collect()
}

fn build_attenuation_lookup() -> Vec<f32> {
    (0..ATTENUATION_TABLE_SIZE)
        .map(|i| (i as f32 / -200.0 * std::f32::consts::LN_10).exp())
        .collect()
}

fn build_power2_lookup() -> Vec<f32> {
    (0..POWER2_TABLE_SIZE)
        .map(|i| 2f32.powf((i as i32 - POWER2_TABLE_OFFSET) as f32 / CENTS_PER_OCTAVE))
        .collect()
}

fn build_pan_lookup() -> Vec<f32> {
    (0..PAN_TABLE_SIZE)
        .map(|i| (i as f32 * std::f32::consts::FRAC_PI_2 / 1000.0).sin())
        .collect()
}

static CENTS_PARTIAL_LOOKUP: Lazy<Vec<f32>> = Lazy::new(build_cents_partial_lookup);
static ATTENUATION_LOOKUP: Lazy<Vec<f32>> = Lazy::new(build_attenuation_lookup);
static POWER2_LOOKUP: Lazy<Vec<f32>> = Lazy::new(build_power2_lookup);
static PAN_LOOKUP: Lazy<Vec<f32>> = Lazy::new(build_pan_lookup);

/// Forces every static lookup table to build. Intended to be called once,
/// off the render thread, during engine construction so that the render
/// path never races `Lazy`'s one-time initialization.
pub fn warm_lookup_tables() {
    Lazy::force(&CENTS_PARTIAL_LOOKUP);
    Lazy::force(&ATTENUATION_LOOKUP);
    Lazy::force(&POWER2_LOOKUP);
    Lazy::force(&PAN_LOOKUP);
}

/// Converts absolute pitch cents into Hz via the octave/partial lookup split
/// described for `centsToFrequency` in the reference implementation.
pub fn cents_to_hz(value: f32) -> f32 {
    if value < 0.0 {
        return 1.0;
    }
    let value = value.min(MAXIMUM_ABSOLUTE_CENTS);
    let cents = (value + 300.0) as i32;
    let whole = cents / 1200;
    let partial = (cents % 1200) as usize;
    (1u32 << whole) as f32 * CENTS_PARTIAL_LOOKUP[partial]
}

/// Inverse of [`cents_to_hz`] restricted to the audible range.
pub fn hz_to_cents(value: f32) -> f32 {
    1200.0 * (value / 6.875).log2() - 300.0
}

/// `2^(cents/1200)`, used for both pitch ratios and time-cents → seconds.
pub fn cents_to_power2(value: f32) -> f32 {
    let clamped = value.clamp(
        (-POWER2_TABLE_OFFSET) as f32,
        (POWER2_TABLE_SIZE as i32 - 1 - POWER2_TABLE_OFFSET) as f32,
    );
    let index = (clamped as i32 + POWER2_TABLE_OFFSET) as usize;
    POWER2_LOOKUP[index.min(POWER2_TABLE_SIZE - 1)]
}

/// Time-cents to seconds: `seconds = 2^(timecents/1200)`.
pub fn cents_to_seconds(value: f32) -> f32 {
    cents_to_power2(value)
}

/// Seconds to time-cents, inverse of [`cents_to_seconds`].
pub fn seconds_to_cents(value: f32) -> f32 {
    (value * CENTS_PER_OCTAVE).log2()
}

/// Frequency, in Hz, of an LFO given its `frequency*LFO` generator cents,
/// clamped to the SF2.01-legal range before conversion.
pub fn lfo_cents_to_frequency(value: f32) -> f32 {
    LOWEST_NOTE_FREQUENCY * cents_to_power2(value.clamp(-16000.0, 4500.0))
}

/// Centibels (clamped to `[0, 960]`) to a linear resonance multiplier `Q`.
pub fn centibels_to_resonance(value: f32) -> f32 {
    10f32.powf((value.clamp(0.0, NOISE_FLOOR_CENTIBELS) - 30.1) / 200.0)
}

/// Clamps a filter cutoff cents value into the SF2.01-legal frequency-cents range.
pub fn clamp_filter_cutoff(value: f32) -> f32 {
    value.clamp(1500.0, 13500.0)
}

/// Normalizes a tenths-of-a-percent generator value (0..=1000) to `[0, 1]`.
pub fn tenth_percentage_to_normalized(value: f32) -> f32 {
    (value * 0.001).clamp(0.0, 1.0)
}

/// Centibels to a linear attenuation multiplier, via table lookup with rounding.
pub fn centibels_to_attenuation(value: f32) -> f32 {
    if value >= MAXIMUM_ATTENUATION_CENTIBELS {
        return 0.0;
    }
    if value <= 0.0 {
        return 1.0;
    }
    let index = value.round() as usize;
    ATTENUATION_LOOKUP[index.min(ATTENUATION_TABLE_SIZE - 1)]
}

/// Centibels to attenuation with linear interpolation between adjacent entries.
pub fn centibels_to_attenuation_interpolated(value: f32) -> f32 {
    if value >= MAXIMUM_ATTENUATION_CENTIBELS {
        return 0.0;
    }
    if value <= 0.0 {
        return 1.0;
    }
    let lower = value.floor() as usize;
    let upper = (lower + 1).min(ATTENUATION_TABLE_SIZE - 1);
    let frac = value - lower as f32;
    ATTENUATION_LOOKUP[lower] * (1.0 - frac) + ATTENUATION_LOOKUP[upper] * frac
}

/// Stereo (left, right) gain pair for a pan value in `[-500, 500]`.
pub fn pan_lookup(pan: f32) -> (f32, f32) {
    let clamped = pan.clamp(-500.0, 500.0);
    let index = clamped.round() as i32;
    let left = PAN_LOOKUP[(-index + 500).clamp(0, PAN_TABLE_SIZE as i32 - 1) as usize];
    let right = PAN_LOOKUP[(index + 500).clamp(0, PAN_TABLE_SIZE as i32 - 1) as usize];
    (left, right)
}

/// Cubic 4th-order (Hermite) interpolation weights `(w0, w1, w2, w3)` for a
/// fractional phase `f ∈ [0, 1)`. Also exposed as a 1024-entry table in
/// [`cubic_weights_table`] for callers that want a single table lookup per
/// sample instead of four polynomial evaluations.
pub fn cubic_weights(f: f32) -> (f32, f32, f32, f32) {
    let f2 = f * f;
    let f3 = f2 * f;
    let w0 = -f3 / 6.0 + f2 / 2.0 - f / 3.0;
    let w1 = f3 / 2.0 - f2 - f / 2.0 + 1.0;
    let w2 = -f3 / 2.0 + f2 / 2.0 + f;
    let w3 = f3 / 6.0 - f / 6.0;
    (w0, w1, w2, w3)
}

pub const CUBIC_TABLE_SIZE: usize = 1024;

fn build_cubic_table() -> Vec<(f32, f32, f32, f32)> {
    (0..CUBIC_TABLE_SIZE)
        .map(|i| cubic_weights(i as f32 / CUBIC_TABLE_SIZE as f32))
        .collect()
}

static CUBIC_WEIGHTS_TABLE: Lazy<Vec<(f32, f32, f32, f32)>> = Lazy::new(build_cubic_table);

/// Looks up precomputed cubic interpolation weights for `f ∈ [0, 1)` via a
/// 1024-entry table instead of evaluating the polynomials on every sample.
pub fn cubic_weights_table(f: f32) -> (f32, f32, f32, f32) {
    let index = ((f.clamp(0.0, 0.999_999) * CUBIC_TABLE_SIZE as f32) as usize)
        .min(CUBIC_TABLE_SIZE - 1);
    CUBIC_WEIGHTS_TABLE[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_table_matches_concrete_scenarios() {
        assert!((cents_to_hz(6900.0) - 440.0).abs() < 1e-1);
        assert!((cents_to_hz(0.0) - 8.175_798_9).abs() < 1e-3);
    }

    #[test]
    fn pan_lookup_matches_concrete_scenarios() {
        let (l, r) = pan_lookup(0.0);
        assert!((l - 0.707_11).abs() < 1e-4);
        assert!((r - 0.707_11).abs() < 1e-4);

        let (l, r) = pan_lookup(-500.0);
        assert!((l - 1.0).abs() < 1e-4);
        assert!((r - 0.0).abs() < 1e-4);

        let (l, r) = pan_lookup(500.0);
        assert!((l - 0.0).abs() < 1e-4);
        assert!((r - 1.0).abs() < 1e-4);
    }

    #[test]
    fn attenuation_table_matches_concrete_scenarios() {
        assert!((centibels_to_attenuation(0.0) - 1.0).abs() < 1e-6);
        assert!((centibels_to_attenuation(60.0) - 0.5).abs() < 1e-3);
        assert!((centibels_to_attenuation(1440.0) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn cubic_weights_match_concrete_scenarios() {
        let (w0, w1, w2, w3) = cubic_weights(0.0);
        assert!((w0 - 0.0).abs() < 1e-6);
        assert!((w1 - 1.0).abs() < 1e-6);
        assert!((w2 - 0.0).abs() < 1e-6);
        assert!((w3 - 0.0).abs() < 1e-6);

        let (w0, w1, w2, w3) = cubic_weights(0.5);
        assert!((w0 - (-1.0 / 16.0)).abs() < 1e-6);
        assert!((w1 - (9.0 / 16.0)).abs() < 1e-6);
        assert!((w2 - (9.0 / 16.0)).abs() < 1e-6);
        assert!((w3 - (-1.0 / 16.0)).abs() < 1e-6);
    }

    #[test]
    fn cents_hz_round_trip() {
        for cents in [0.0, 1200.0, 2500.0, 6900.0, 9000.0] {
            let hz = cents_to_hz(cents);
            if !(8.176..=20000.0).contains(&hz) {
                continue;
            }
            let back = hz_to_cents(hz);
            let roundtrip_hz = cents_to_hz(back);
            assert!((roundtrip_hz - hz).abs() < hz * 0.001);
        }
    }
}
