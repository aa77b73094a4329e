//! Per-voice generator value storage and modulator list (§3 "Voice state").
//!
//! `State` owns the (base, preset-adjustment) pair for every generator plus
//! the voice's installed modulators; the NRPN adjustment is read live from
//! the channel state rather than copied in, since NRPN targets the whole
//! channel, not one voice (§4.11).

use crate::channel_state::ChannelState;
use crate::generator::{self, NUM_GENERATORS};
use crate::modulator::{GeneralController, Modulator, Source, DEFAULT_MODULATORS};
use crate::preset::VoiceConfig;
use crate::value_transformer;
use crate::zone::Zone;

#[derive(Clone, Copy, Debug, Default)]
struct GenValue {
    base: f32,
    preset_adjustment: f32,
}

/// A render-side modulator: the load-time [`Modulator`] entity plus the
/// logic to sample its sources from live voice/channel state. The source
/// tagged-union dispatch (§9 design notes) replaces the reference
/// implementation's pointer-to-member-function value providers.
#[derive(Clone, Copy, Debug)]
struct RenderModulator {
    entity: Modulator,
}

impl RenderModulator {
    fn destination(&self) -> generator::Index {
        self.entity.destination
    }

    fn value(&self, channel_state: &ChannelState, event_key: u8, event_velocity: u8) -> f32 {
        if self.entity.primary_source.is_none() {
            return 0.0;
        }
        let primary_raw = source_raw_value(self.entity.primary_source, channel_state, event_key, event_velocity);
        let primary = value_transformer::transform(self.entity.primary_source, primary_raw);

        let amount_factor = if self.entity.amount_source.is_none() {
            1.0
        } else {
            let amount_raw = source_raw_value(self.entity.amount_source, channel_state, event_key, event_velocity);
            value_transformer::transform(self.entity.amount_source, amount_raw)
        };

        self.entity.transform.apply(self.entity.amount as f32 * primary * amount_factor)
    }
}

fn source_raw_value(source: Source, channel_state: &ChannelState, event_key: u8, event_velocity: u8) -> u32 {
    if source.is_cc {
        return channel_state.cc(source.index) as u32;
    }
    match source.general_controller() {
        Some(GeneralController::None) | None => 0,
        Some(GeneralController::NoteOnVelocity) => event_velocity as u32,
        Some(GeneralController::NoteOnKey) => event_key as u32,
        Some(GeneralController::KeyPressure) => channel_state.key_pressure(event_key) as u32,
        Some(GeneralController::ChannelPressure) => channel_state.channel_pressure() as u32,
        Some(GeneralController::PitchWheel) => channel_state.pitch_wheel() as u32,
        Some(GeneralController::PitchWheelSensitivity) => channel_state.pitch_wheel_sensitivity_semitones() as u32,
    }
}

fn add_render_modulator(list: &mut Vec<RenderModulator>, modulator: Modulator) {
    if !modulator.is_valid() {
        return;
    }
    if let Some(existing) = list.iter_mut().find(|m| m.entity.same_key(&modulator)) {
        existing.entity = modulator;
    } else {
        list.push(RenderModulator { entity: modulator });
    }
}

/// Non-zero SF2.01 default base values (§4.2 step 1); every other generator
/// starts at 0.
const DEFAULT_NONZERO_TIME_CENTS_GENERATORS: [generator::Index; 12] = [
    generator::Index::DelayModulatorLfo,
    generator::Index::DelayVibratoLfo,
    generator::Index::DelayModulatorEnvelope,
    generator::Index::AttackModulatorEnvelope,
    generator::Index::HoldModulatorEnvelope,
    generator::Index::DecayModulatorEnvelope,
    generator::Index::ReleaseModulatorEnvelope,
    generator::Index::DelayVolumeEnvelope,
    generator::Index::AttackVolumeEnvelope,
    generator::Index::HoldVolumeEnvelope,
    generator::Index::DecayVolumeEnvelope,
    generator::Index::ReleaseVolumeEnvelope,
];

#[derive(Clone, Debug)]
pub struct State {
    values: [GenValue; NUM_GENERATORS],
    modulators: Vec<RenderModulator>,
    event_key: u8,
    event_velocity: u8,
}

impl State {
    pub fn new() -> Self {
        State { values: [GenValue::default(); NUM_GENERATORS], modulators: Vec::new(), event_key: 0, event_velocity: 0 }
    }

    pub fn event_key(&self) -> u8 {
        self.event_key
    }

    pub fn event_velocity(&self) -> u8 {
        self.event_velocity
    }

    /// Runs the full six-step config-apply sequence (§4.2) for a freshly
    /// allocated or re-triggered voice.
    pub fn configure(&mut self, config: &VoiceConfig) {
        self.event_key = config.key;
        self.event_velocity = config.velocity;
        self.set_defaults();

        if let Some(global_instrument_zone) = config.global_instrument_zone {
            self.apply_generators(global_instrument_zone, false, false);
            self.apply_modulators(global_instrument_zone);
        }
        self.apply_generators(config.instrument_zone, false, false);
        self.apply_modulators(config.instrument_zone);

        if let Some(global_preset_zone) = config.global_preset_zone {
            self.apply_generators(global_preset_zone, true, true);
            self.apply_modulators(global_preset_zone);
        }
        self.apply_generators(config.preset_zone, true, true);
        self.apply_modulators(config.preset_zone);
    }

    fn set_defaults(&mut self) {
        self.values = [GenValue::default(); NUM_GENERATORS];
        self.modulators.clear();
        for modulator in DEFAULT_MODULATORS.iter() {
            add_render_modulator(&mut self.modulators, *modulator);
        }
        self.values[generator::Index::InitialFilterCutoff as usize].base = 13500.0;
        for &index in &DEFAULT_NONZERO_TIME_CENTS_GENERATORS {
            self.values[index as usize].base = -12000.0;
        }
        self.values[generator::Index::ForcedMidiKey as usize].base = -1.0;
        self.values[generator::Index::ForcedMidiVelocity as usize].base = -1.0;
        self.values[generator::Index::OverridingRootKey as usize].base = -1.0;
        self.values[generator::Index::ScaleTuning as usize].base = 100.0;
    }

    /// `as_adjustment` selects whether a generator's value is set (`base`,
    /// for instrument zones) or added (`preset_adjustment`, for preset
    /// zones). `filter_available_in_preset` drops generators the metadata
    /// table marks as instrument-only (preset zones only, §4.2 step 5-6).
    fn apply_generators(&mut self, zone: &Zone, as_adjustment: bool, filter_available_in_preset: bool) {
        for &(index, amount) in &zone.generators {
            if filter_available_in_preset && !index.definition().available_in_preset {
                continue;
            }
            let value = amount.signed() as f32;
            if as_adjustment {
                self.values[index as usize].preset_adjustment += value;
            } else {
                self.values[index as usize].base = value;
            }
        }
    }

    fn apply_modulators(&mut self, zone: &Zone) {
        for modulator in &zone.modulators {
            add_render_modulator(&mut self.modulators, *modulator);
        }
    }

    /// The base value plus preset adjustment only, ignoring NRPN and
    /// modulators (used by components that key off the nominal, unmodulated
    /// shape of a generator, e.g. looping mode and sample link).
    pub fn unmodulated(&self, index: generator::Index) -> f32 {
        let gv = self.values[index as usize];
        index.definition().clamp(gv.base + gv.preset_adjustment)
    }

    pub fn unmodulated_raw(&self, index: generator::Index) -> i32 {
        self.unmodulated(index) as i32
    }

    /// `base + preset_adjustment + nrpn_adjustment + sum(modulator contributions)`,
    /// clamped to the generator's legal range (§3 "Voice state").
    pub fn modulated(&self, index: generator::Index, channel_state: &ChannelState) -> f32 {
        let gv = self.values[index as usize];
        let nrpn = channel_state.nrpn_adjustment(index) as f32;
        let modulator_sum: f32 = self
            .modulators
            .iter()
            .filter(|m| m.destination() == index)
            .map(|m| m.value(channel_state, self.event_key, self.event_velocity))
            .sum();
        index.definition().clamp(gv.base + gv.preset_adjustment + nrpn + modulator_sum)
    }
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}
