//! Generic 7-stage DAHDSR envelope generator (§4.4).
//!
//! One type serves both the volume and the modulation envelope; the
//! distinction is only in the `EnvelopeConfig` each voice builds (the source
//! used two hand-written subclasses for this — see DESIGN.md).

use crate::dsp;

/// SF2 treats a time-cents value `<= -32768` as "instantaneous": the stage
/// is skipped rather than evaluating `2^(timecents/1200)`, which would
/// otherwise yield a vanishingly small but nonzero duration.
const INSTANTANEOUS_SENTINEL: f32 = -32768.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Delay,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
    Idle,
}

/// Time-cents/level parameters needed to run one envelope for one voice.
/// Hold/decay key-scaling is already resolved to a concrete cents value by
/// the caller (it depends on the sounding MIDI key, which `Envelope` itself
/// does not know about).
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeConfig {
    pub delay_time_cents: f32,
    pub attack_time_cents: f32,
    pub hold_time_cents: f32,
    pub decay_time_cents: f32,
    pub sustain_level: f32,
    pub release_time_cents: f32,
}

impl EnvelopeConfig {
    fn stage_samples(time_cents: f32, sample_rate: f32) -> u32 {
        if time_cents <= INSTANTANEOUS_SENTINEL {
            0
        } else {
            (dsp::cents_to_seconds(time_cents) * sample_rate).round().max(0.0) as u32
        }
    }
}

/// Coefficient for the exponential attack ramp, chosen so that the
/// asymptotic curve reaches within about 0.1% of 1.0 by the end of the
/// configured attack duration (the common "analog envelope" trick: the
/// curve never clamps to 1.0 itself, the stage counter does).
const ATTACK_RATIO: f32 = 6.907_755; // -ln(0.001)

#[derive(Clone, Debug)]
pub struct Envelope {
    stage: Stage,
    value: f32,
    counter: u32,
    delay_samples: u32,
    attack_samples: u32,
    attack_coefficient: f32,
    hold_samples: u32,
    decay_samples: u32,
    decay_increment: f32,
    sustain_level: f32,
    release_samples: u32,
    release_increment: f32,
}

impl Envelope {
    pub fn new() -> Self {
        Envelope {
            stage: Stage::Idle,
            value: 0.0,
            counter: 0,
            delay_samples: 0,
            attack_samples: 0,
            attack_coefficient: 0.0,
            hold_samples: 0,
            decay_samples: 0,
            decay_increment: 0.0,
            sustain_level: 0.0,
            release_samples: 0,
            release_increment: 0.0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn is_delayed(&self) -> bool {
        self.stage == Stage::Delay
    }

    /// Recomputes stage durations for a new note and resets to `delay`,
    /// matching `configureVolumeEnvelope`/`configureModulationEnvelope`'s
    /// trailing `gate(true)`.
    pub fn configure(&mut self, config: &EnvelopeConfig, sample_rate: f32) {
        self.delay_samples = EnvelopeConfig::stage_samples(config.delay_time_cents, sample_rate);
        self.attack_samples = EnvelopeConfig::stage_samples(config.attack_time_cents, sample_rate);
        self.attack_coefficient = if self.attack_samples == 0 {
            1.0
        } else {
            1.0 - (-ATTACK_RATIO / self.attack_samples as f32).exp()
        };
        self.hold_samples = EnvelopeConfig::stage_samples(config.hold_time_cents, sample_rate);
        self.decay_samples = EnvelopeConfig::stage_samples(config.decay_time_cents, sample_rate);
        self.sustain_level = config.sustain_level.clamp(0.0, 1.0);
        self.decay_increment = if self.decay_samples == 0 {
            0.0
        } else {
            (1.0 - self.sustain_level) / self.decay_samples as f32
        };
        self.release_samples = EnvelopeConfig::stage_samples(config.release_time_cents, sample_rate);
        self.gate(true);
    }

    /// `gate(true)` resets to 0 and (re)enters `delay`; `gate(false)` jumps
    /// straight to `release` from the current value.
    pub fn gate(&mut self, active: bool) {
        if active {
            self.value = 0.0;
            self.enter(Stage::Delay);
        } else if self.stage != Stage::Idle {
            self.release_increment = if self.release_samples == 0 {
                self.value
            } else {
                self.value / self.release_samples as f32
            };
            self.enter(Stage::Release);
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.counter = match stage {
            Stage::Delay => self.delay_samples,
            Stage::Attack => self.attack_samples,
            Stage::Hold => self.hold_samples,
            Stage::Decay => self.decay_samples,
            Stage::Release => self.release_samples,
            Stage::Sustain | Stage::Idle => 0,
        };
        // A zero-length stage must advance within the same `process()` tick
        // rather than requiring an extra sample at its boundary value.
        if self.counter == 0 && !matches!(stage, Stage::Sustain | Stage::Idle) {
            self.advance_stage();
        }
    }

    fn advance_stage(&mut self) {
        match self.stage {
            Stage::Delay => self.enter(Stage::Attack),
            Stage::Attack => {
                self.value = 1.0;
                self.enter(Stage::Hold);
            }
            Stage::Hold => self.enter(Stage::Decay),
            Stage::Decay => {
                self.value = self.sustain_level;
                self.enter(Stage::Sustain);
            }
            Stage::Release => {
                self.value = 0.0;
                self.enter(Stage::Idle);
            }
            Stage::Sustain | Stage::Idle => {}
        }
    }

    /// Advances by one sample and returns the value *before* stepping,
    /// matching the LFO's "emit, then advance" convention used elsewhere in
    /// this crate.
    pub fn process(&mut self) -> f32 {
        let output = self.value;
        match self.stage {
            Stage::Delay => {
                if self.counter > 0 {
                    self.counter -= 1;
                    if self.counter == 0 {
                        self.advance_stage();
                    }
                }
            }
            Stage::Attack => {
                self.value += (1.000_1 - self.value) * self.attack_coefficient;
                if self.counter > 0 {
                    self.counter -= 1;
                    if self.counter == 0 {
                        self.advance_stage();
                    }
                }
            }
            Stage::Hold => {
                if self.counter > 0 {
                    self.counter -= 1;
                    if self.counter == 0 {
                        self.advance_stage();
                    }
                }
            }
            Stage::Decay => {
                self.value -= self.decay_increment;
                if self.counter > 0 {
                    self.counter -= 1;
                    if self.counter == 0 {
                        self.advance_stage();
                    }
                }
            }
            Stage::Sustain => {}
            Stage::Release => {
                self.value -= self.release_increment;
                if self.value < 0.0 {
                    self.value = 0.0;
                    self.stage = Stage::Idle;
                    self.counter = 0;
                } else if self.counter > 0 {
                    self.counter -= 1;
                    if self.counter == 0 {
                        self.advance_stage();
                    }
                }
            }
            Stage::Idle => {}
        }
        self.value = self.value.clamp(0.0, 1.0);
        output
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(delay: f32, attack: f32, hold: f32, decay: f32, sustain: f32, release: f32) -> EnvelopeConfig {
        EnvelopeConfig {
            delay_time_cents: delay,
            attack_time_cents: attack,
            hold_time_cents: hold,
            decay_time_cents: decay,
            sustain_level: sustain,
            release_time_cents: release,
        }
    }

    #[test]
    fn instantaneous_sentinel_skips_delay_and_attack() {
        let mut env = Envelope::new();
        env.configure(&config(-32768.0, -32768.0, -32768.0, -32768.0, 1.0, -32768.0), 48000.0);
        assert_eq!(env.stage(), Stage::Sustain);
    }

    #[test]
    fn value_stays_in_zero_to_one_range() {
        let mut env = Envelope::new();
        env.configure(&config(-32768.0, -1200.0, -1200.0, -1200.0, 0.3, -1200.0), 48000.0);
        for _ in 0..20000 {
            let v = env.process();
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn release_is_monotonically_non_increasing() {
        let mut env = Envelope::new();
        env.configure(&config(-32768.0, -32768.0, -32768.0, -32768.0, 0.8, -2400.0), 48000.0);
        while env.stage() != Stage::Sustain {
            env.process();
        }
        env.gate(false);
        let mut last = f32::MAX;
        while env.stage() != Stage::Idle {
            let v = env.process();
            assert!(v <= last + 1e-6);
            last = v;
        }
    }

    #[test]
    fn gate_false_from_attack_jumps_to_release_from_current_value() {
        let mut env = Envelope::new();
        env.configure(&config(-32768.0, 0.0, 4800.0, -32768.0, 0.5, -1200.0), 48000.0);
        env.process();
        env.process();
        let value_before_release = env.value();
        env.gate(false);
        assert_eq!(env.stage(), Stage::Release);
        assert_eq!(env.value(), value_before_release);
    }
}
