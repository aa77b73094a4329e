//! A single sounding voice: the per-generator [`state::State`] plus the
//! envelopes, LFOs, pitch converter, sample generator and filter that turn
//! that state into audio, one sample at a time (§4.9), grounded on the
//! reference `Render::Voice::Voice`.

pub mod state;

use crate::channel_state::ChannelState;
use crate::dsp;
use crate::envelope::{Envelope, EnvelopeConfig, Stage};
use crate::filter::LowPassFilter;
use crate::generator::Index;
use crate::lfo::{Lfo, LfoConfig};
use crate::mixer::Mixer;
use crate::pitch::Pitch;
use crate::preset::VoiceConfig;
use crate::sample::{Bounds, Interpolation, LoopingMode, SampleGenerator, SampleHeader};
use state::State;

/// One voice's full render pipeline. A voice is configured once per note-on
/// (or re-trigger) and then produces samples until its volume envelope goes
/// idle, its sample generator runs past the end of a non-looping sample, or
/// its release-stage output sinks below the noise floor (§4.9).
#[derive(Clone, Debug)]
pub struct Voice {
    index: usize,
    state: State,
    pitch: Pitch,
    unpitched: bool,
    sample_generator: SampleGenerator,
    sample_index: u16,
    exclusive_class: u16,
    volume_envelope: Envelope,
    modulator_envelope: Envelope,
    modulator_lfo: Lfo,
    vibrato_lfo: Lfo,
    filter: LowPassFilter,
    sample_rate: f32,
    key_down: bool,
    noise_floor: f32,
    noise_floor_looped: f32,
    done: bool,
}

impl Voice {
    pub fn new(index: usize, sample_rate: f32) -> Self {
        Voice {
            index,
            state: State::new(),
            pitch: Pitch::configure(
                &SampleHeader {
                    start: 0,
                    end: 0,
                    start_loop: 0,
                    end_loop: 0,
                    sample_rate: sample_rate as u32,
                    original_midi_key: 60,
                    pitch_correction: 0,
                    sample_type: crate::sample::SampleType::Mono,
                },
                None,
                60,
                sample_rate,
            ),
            unpitched: false,
            sample_generator: SampleGenerator::new(
                Bounds::make(
                    &SampleHeader {
                        start: 0,
                        end: 0,
                        start_loop: 0,
                        end_loop: 0,
                        sample_rate: sample_rate as u32,
                        original_midi_key: 60,
                        pitch_correction: 0,
                        sample_type: crate::sample::SampleType::Mono,
                    },
                    0, 0, 0, 0, 0, 0, 0, 0,
                ),
                LoopingMode::None,
                Interpolation::Cubic,
            ),
            sample_index: 0,
            exclusive_class: 0,
            volume_envelope: Envelope::new(),
            modulator_envelope: Envelope::new(),
            modulator_lfo: Lfo::new(),
            vibrato_lfo: Lfo::new(),
            filter: LowPassFilter::new(sample_rate),
            sample_rate,
            key_down: false,
            noise_floor: dsp::NOISE_FLOOR,
            noise_floor_looped: dsp::NOISE_FLOOR * 4.0,
            done: true,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn exclusive_class(&self) -> u16 {
        self.exclusive_class
    }

    pub fn initiating_key(&self) -> u8 {
        self.state.event_key()
    }

    pub fn sample_index(&self) -> u16 {
        self.sample_index
    }

    pub fn is_key_down(&self) -> bool {
        self.key_down
    }

    /// True while the voice still has audio left to contribute. Checking
    /// this also latches `done` once the volume envelope or the sample
    /// generator have run out, so repeated calls within one render block
    /// are cheap (§4.9 step 9).
    pub fn is_active(&mut self) -> bool {
        !self.is_done()
    }

    pub fn is_done(&mut self) -> bool {
        if !self.done {
            self.done = self.volume_envelope.is_idle() || self.sample_generator.is_done();
        }
        self.done
    }

    /// Runs the full configure sequence for a freshly allocated or stolen
    /// voice (§4.2, §4.9 "Voice configuration").
    pub fn configure(
        &mut self,
        config: &VoiceConfig,
        sample_header: &SampleHeader,
        peak_magnitude: f32,
        sample_rate: f32,
        channel_state: &ChannelState,
    ) {
        self.sample_rate = sample_rate;
        self.done = false;
        self.key_down = true;
        self.exclusive_class = config.exclusive_class;
        self.sample_index = config.sample_index;
        self.state.configure(config);

        self.unpitched = sample_header.is_unpitched();
        let overriding_root_key = {
            let raw = self.state.unmodulated_raw(Index::OverridingRootKey);
            if (0..=127).contains(&raw) {
                Some(raw as u8)
            } else {
                None
            }
        };
        self.pitch = Pitch::configure(sample_header, overriding_root_key, config.key, sample_rate);

        let looping_mode = LoopingMode::from_raw(self.state.unmodulated_raw(Index::SampleModes) as u16);
        let bounds = Bounds::make(
            sample_header,
            self.state.unmodulated_raw(Index::StartAddressOffset),
            self.state.unmodulated_raw(Index::StartAddressCoarseOffset),
            self.state.unmodulated_raw(Index::EndAddressOffset),
            self.state.unmodulated_raw(Index::EndAddressCoarseOffset),
            self.state.unmodulated_raw(Index::StartLoopAddressOffset),
            self.state.unmodulated_raw(Index::StartLoopAddressCoarseOffset),
            self.state.unmodulated_raw(Index::EndLoopAddressOffset),
            self.state.unmodulated_raw(Index::EndLoopAddressCoarseOffset),
        );
        self.sample_generator = SampleGenerator::new(bounds, looping_mode, Interpolation::Cubic);

        let key = config.key as f32;
        let hold_key_scaling = (60.0 - key) * self.state.modulated(Index::MidiKeyToVolumeEnvelopeHold, channel_state);
        let decay_key_scaling = (60.0 - key) * self.state.modulated(Index::MidiKeyToVolumeEnvelopeDecay, channel_state);
        self.volume_envelope.configure(
            &EnvelopeConfig {
                delay_time_cents: self.state.modulated(Index::DelayVolumeEnvelope, channel_state),
                attack_time_cents: self.state.modulated(Index::AttackVolumeEnvelope, channel_state),
                hold_time_cents: self.state.modulated(Index::HoldVolumeEnvelope, channel_state) + hold_key_scaling,
                decay_time_cents: self.state.modulated(Index::DecayVolumeEnvelope, channel_state) + decay_key_scaling,
                sustain_level: 1.0 - self.state.modulated(Index::SustainVolumeEnvelope, channel_state) / 1000.0,
                release_time_cents: self.state.modulated(Index::ReleaseVolumeEnvelope, channel_state),
            },
            sample_rate,
        );

        let mod_hold_key_scaling =
            (60.0 - key) * self.state.modulated(Index::MidiKeyToModulatorEnvelopeHold, channel_state);
        let mod_decay_key_scaling =
            (60.0 - key) * self.state.modulated(Index::MidiKeyToModulatorEnvelopeDecay, channel_state);
        self.modulator_envelope.configure(
            &EnvelopeConfig {
                delay_time_cents: self.state.modulated(Index::DelayModulatorEnvelope, channel_state),
                attack_time_cents: self.state.modulated(Index::AttackModulatorEnvelope, channel_state),
                hold_time_cents: self.state.modulated(Index::HoldModulatorEnvelope, channel_state) + mod_hold_key_scaling,
                decay_time_cents: self.state.modulated(Index::DecayModulatorEnvelope, channel_state)
                    + mod_decay_key_scaling,
                sustain_level: 1.0 - self.state.modulated(Index::SustainModulatorEnvelope, channel_state) / 1000.0,
                release_time_cents: self.state.modulated(Index::ReleaseModulatorEnvelope, channel_state),
            },
            sample_rate,
        );

        self.modulator_lfo.configure(
            &LfoConfig {
                frequency_cents: self.state.modulated(Index::FrequencyModulatorLfo, channel_state),
                delay_time_cents: self.state.modulated(Index::DelayModulatorLfo, channel_state),
            },
            sample_rate,
        );
        self.vibrato_lfo.configure(
            &LfoConfig {
                frequency_cents: self.state.modulated(Index::FrequencyVibratoLfo, channel_state),
                delay_time_cents: self.state.modulated(Index::DelayVibratoLfo, channel_state),
            },
            sample_rate,
        );

        self.filter.reset();
        self.noise_floor = dsp::NOISE_FLOOR / peak_magnitude.max(f32::MIN_POSITIVE);
        self.noise_floor_looped = self.noise_floor * 4.0;
    }

    /// Releases the key: the volume and modulator envelopes jump to their
    /// release stage from whatever value they currently hold (§4.9,
    /// "Key release"). The sample generator keeps honoring
    /// `LoopingMode::DuringKeyPress` bookkeeping via [`is_key_down`].
    pub fn release_key(&mut self) {
        self.key_down = false;
        self.volume_envelope.gate(false);
        self.modulator_envelope.gate(false);
    }

    /// Silences the voice immediately, bypassing the release stage (used
    /// for `allOff` and exclusive-class voice stealing, §4.1).
    pub fn silence(&mut self) {
        self.done = true;
    }

    /// Produces one sample of audio for this voice: advances the LFOs,
    /// envelopes, pitch/sample phase and filter, and returns the filtered,
    /// gain-scaled output (§4.9 steps 1-7). `samples` is the voice's own
    /// sample source's normalized buffer (already including its trailing
    /// zero padding, §3 "Sample source").
    pub fn render_sample(&mut self, channel_state: &ChannelState, samples: &[f32]) -> f32 {
        if self.is_done() {
            return 0.0;
        }

        let mod_lfo = self.modulator_lfo.process();
        let vib_lfo = self.vibrato_lfo.process();
        let mod_env = self.modulator_envelope.process();
        let vol_env = self.volume_envelope.process();

        if self.volume_envelope.is_delayed() {
            return 0.0;
        }

        let scale_tuning = if self.unpitched { 0.0 } else { self.state.modulated(Index::ScaleTuning, channel_state) };
        let increment = self.pitch.phase_increment(
            scale_tuning,
            self.state.modulated(Index::CoarseTune, channel_state),
            self.state.modulated(Index::FineTune, channel_state),
            mod_lfo,
            self.state.modulated(Index::ModulatorLfoToPitch, channel_state),
            vib_lfo,
            self.state.modulated(Index::VibratoLfoToPitch, channel_state),
            mod_env,
            self.state.modulated(Index::ModulatorEnvelopeToPitch, channel_state),
        );

        let can_loop = self.sample_generator.can_loop(!self.volume_envelope.is_idle(), self.key_down);
        let sample = self.sample_generator.generate(samples, increment, can_loop);

        let cutoff_cents = self.state.modulated(Index::InitialFilterCutoff, channel_state)
            + mod_lfo * self.state.modulated(Index::ModulatorLfoToFilterCutoff, channel_state)
            + mod_env * self.state.modulated(Index::ModulatorEnvelopeToFilterCutoff, channel_state);
        let resonance = self.state.modulated(Index::InitialFilterResonance, channel_state);
        let filtered = self.filter.process(sample, dsp::clamp_filter_cutoff(cutoff_cents), resonance, self.sample_rate);

        let attenuation_centibels = self.state.modulated(Index::InitialAttenuation, channel_state);
        let envelope_centibels = dsp::MAXIMUM_ATTENUATION_CENTIBELS * (1.0 - vol_env);
        let lfo_centibels = -mod_lfo * self.state.modulated(Index::ModulatorLfoToVolume, channel_state);
        let gain = dsp::centibels_to_attenuation(attenuation_centibels)
            * dsp::centibels_to_attenuation_interpolated(envelope_centibels + lfo_centibels);

        if self.volume_envelope.stage() == Stage::Release {
            let threshold = if self.sample_generator.has_looped() { self.noise_floor_looped } else { self.noise_floor };
            if gain < threshold {
                self.done = true;
            }
        }

        filtered * gain
    }

    /// Renders up to `frame_count` samples into `mixer`, stopping early once
    /// the voice goes done (§4.9 step 8, §4.10).
    pub fn render_into(&mut self, mixer: &mut Mixer<'_>, frame_count: usize, channel_state: &ChannelState, samples: &[f32]) {
        let chorus_send = dsp::tenth_percentage_to_normalized(self.state.modulated(Index::ChorusEffectSend, channel_state));
        let reverb_send = dsp::tenth_percentage_to_normalized(self.state.modulated(Index::ReverbEffectSend, channel_state));
        for frame in 0..frame_count {
            if self.is_done() {
                break;
            }
            let pan = self.state.modulated(Index::Pan, channel_state);
            let (left_gain, right_gain) = dsp::pan_lookup(pan);
            let sample = self.render_sample(channel_state, samples);
            mixer.add(frame, sample * left_gain, sample * right_gain, chorus_send, reverb_send);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Amount;
    use crate::zone::Zone;

    fn header() -> SampleHeader {
        SampleHeader {
            start: 0,
            end: 8,
            start_loop: 2,
            end_loop: 6,
            sample_rate: 44100,
            original_midi_key: 60,
            pitch_correction: 0,
            sample_type: crate::sample::SampleType::Mono,
        }
    }

    fn config<'a>(preset_zone: &'a Zone, instrument_zone: &'a Zone) -> VoiceConfig<'a> {
        VoiceConfig {
            preset_zone,
            global_preset_zone: None,
            instrument_zone,
            global_instrument_zone: None,
            key: 60,
            velocity: 100,
            exclusive_class: 0,
            sample_index: 0,
        }
    }

    #[test]
    fn freshly_configured_voice_is_active_and_not_delayed_forever() {
        let preset_zone = Zone::build(vec![(Index::Instrument, Amount::new(0))], Vec::new(), Index::Instrument);
        let instrument_zone = Zone::build(
            vec![(Index::DelayVolumeEnvelope, Amount::new(0xc000)), (Index::SampleId, Amount::new(0))],
            Vec::new(),
            Index::SampleId,
        );
        let mut voice = Voice::new(0, 44100.0);
        let channel_state = ChannelState::new();
        voice.configure(&config(&preset_zone, &instrument_zone), &header(), 1.0, 44100.0, &channel_state);
        assert!(voice.is_active());
    }

    fn long_header() -> SampleHeader {
        SampleHeader {
            start: 0,
            end: 200,
            start_loop: 20,
            end_loop: 180,
            sample_rate: 44100,
            original_midi_key: 60,
            pitch_correction: 0,
            sample_type: crate::sample::SampleType::Mono,
        }
    }

    #[test]
    fn render_sample_produces_audio_once_delay_elapses() {
        let preset_zone = Zone::build(vec![(Index::Instrument, Amount::new(0))], Vec::new(), Index::Instrument);
        let instrument_zone = Zone::build(
            vec![
                (Index::DelayVolumeEnvelope, Amount::new(0x8000)),
                (Index::AttackVolumeEnvelope, Amount::new(0x8000)),
                (Index::SampleId, Amount::new(0)),
            ],
            Vec::new(),
            Index::SampleId,
        );
        let mut voice = Voice::new(0, 44100.0);
        let channel_state = ChannelState::new();
        voice.configure(&config(&preset_zone, &instrument_zone), &long_header(), 1.0, 44100.0, &channel_state);
        let samples = vec![1.0f32; 200];
        let mut heard_nonzero = false;
        for _ in 0..64 {
            let s = voice.render_sample(&channel_state, &samples);
            if s.abs() > 1e-6 {
                heard_nonzero = true;
            }
        }
        assert!(heard_nonzero);
    }

    #[test]
    fn release_key_moves_both_envelopes_to_release() {
        let preset_zone = Zone::build(vec![(Index::Instrument, Amount::new(0))], Vec::new(), Index::Instrument);
        let instrument_zone = Zone::build(vec![(Index::SampleId, Amount::new(0))], Vec::new(), Index::SampleId);
        let mut voice = Voice::new(0, 44100.0);
        let channel_state = ChannelState::new();
        voice.configure(&config(&preset_zone, &instrument_zone), &header(), 1.0, 44100.0, &channel_state);
        voice.render_sample(&channel_state, &[0.0; 64]);
        voice.release_key();
        assert!(!voice.is_key_down());
    }

    #[test]
    fn silenced_voice_renders_zero_and_reports_done() {
        let preset_zone = Zone::build(vec![(Index::Instrument, Amount::new(0))], Vec::new(), Index::Instrument);
        let instrument_zone = Zone::build(vec![(Index::SampleId, Amount::new(0))], Vec::new(), Index::SampleId);
        let mut voice = Voice::new(0, 44100.0);
        let channel_state = ChannelState::new();
        voice.configure(&config(&preset_zone, &instrument_zone), &header(), 1.0, 44100.0, &channel_state);
        voice.silence();
        assert!(voice.is_done());
        assert_eq!(voice.render_sample(&channel_state, &[0.0; 64]), 0.0);
    }
}
