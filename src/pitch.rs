//! Converts (key, tuning, modulation) into a sample-generator phase
//! increment (§4.7).

use crate::dsp;
use crate::sample::SampleHeader;

#[derive(Clone, Copy, Debug)]
pub struct Pitch {
    root_pitch_cents: f32,
    root_frequency: f32,
    event_key: u8,
}

impl Pitch {
    /// `rootKey` is the overriding root key if it's in `[0, 127]`, else the
    /// sample header's own `originalMIDIKey`, else middle C.
    pub fn configure(header: &SampleHeader, overriding_root_key: Option<u8>, event_key: u8, engine_sample_rate: f32) -> Pitch {
        let root_key = overriding_root_key
            .filter(|&k| k <= 127)
            .unwrap_or_else(|| header.resolved_original_key());
        let root_pitch_cents = root_key as f32 * 100.0 - header.pitch_correction as f32;
        let root_frequency =
            dsp::cents_to_hz(root_pitch_cents) * engine_sample_rate / header.sample_rate as f32;
        Pitch { root_pitch_cents, root_frequency, event_key }
    }

    /// Per-sample phase increment given the effective scale-tuning (already
    /// forced to 0 by the caller for unpitched samples), the coarse/fine
    /// tune offset, and the three modulated pitch contributions (§4.7).
    #[allow(clippy::too_many_arguments)]
    pub fn phase_increment(
        &self,
        scale_tuning: f32,
        coarse_tune: f32,
        fine_tune: f32,
        mod_lfo: f32,
        mod_lfo_to_pitch: f32,
        vib_lfo: f32,
        vib_lfo_to_pitch: f32,
        mod_env: f32,
        mod_env_to_pitch: f32,
    ) -> f32 {
        let pitch_base = scale_tuning * (self.event_key as f32 - self.root_pitch_cents / 100.0) + self.root_pitch_cents;
        let pitch_offset = 100.0 * coarse_tune + fine_tune;
        let modulated = pitch_base
            + pitch_offset
            + mod_lfo * mod_lfo_to_pitch
            + vib_lfo * vib_lfo_to_pitch
            + mod_env * mod_env_to_pitch;
        dsp::cents_to_hz(modulated) / self.root_frequency
    }
}
