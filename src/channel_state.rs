//! Per-channel MIDI controller cache and the integrated NRPN decoder (§4.11).
//!
//! This crate models a single MIDI channel (§1, "Non-goals: no multi-channel
//! MIDI"); the engine owns exactly one `ChannelState` and mutates it from
//! `handle_midi`, and voices read it during `render` on the same thread, so
//! no synchronization is needed (§5).

use crate::generator;

pub const CC_BANK_SELECT_MSB: u8 = 0;
pub const CC_MOD_WHEEL: u8 = 1;
pub const CC_DATA_ENTRY_MSB: u8 = 6;
pub const CC_VOLUME: u8 = 7;
pub const CC_PAN: u8 = 10;
pub const CC_EXPRESSION: u8 = 11;
pub const CC_BANK_SELECT_LSB: u8 = 32;
pub const CC_SUSTAIN: u8 = 64;
pub const CC_SOSTENUTO: u8 = 66;
pub const CC_SOFT: u8 = 67;
pub const CC_REVERB_SEND: u8 = 91;
pub const CC_CHORUS_SEND: u8 = 93;
pub const CC_DATA_ENTRY_LSB: u8 = 38;
pub const CC_NRPN_LSB: u8 = 98;
pub const CC_NRPN_MSB: u8 = 99;
pub const CC_RPN_LSB: u8 = 100;
pub const CC_RPN_MSB: u8 = 101;

/// Value of the NRPN MSB controller that selects the SF2 generator-address
/// parameter space, as opposed to a vendor/GM NRPN space.
const NRPN_MSB_SF2_SELECT: u8 = 120;

const NEUTRAL_PITCH_WHEEL: u16 = 8192;
/// Default MIDI pitch-bend range, per the RPN 0/0 convention: 2 semitones.
const DEFAULT_PITCH_WHEEL_SENSITIVITY_SEMITONES: u8 = 2;

/// Decode state for the CC 98/99/6/38 NRPN mechanism (§4.11).
#[derive(Clone, Debug, Default)]
struct NrpnDecoder {
    active: bool,
    accumulated_index: u32,
    data_entry_lsb: u8,
}

/// Everything the render path or a modulator source provider needs to read
/// about the current state of one MIDI channel.
#[derive(Clone, Debug)]
pub struct ChannelState {
    cc: [u8; 128],
    key_pressure: [u8; 128],
    channel_pressure: u8,
    pitch_wheel: u16,
    pitch_wheel_sensitivity_semitones: u8,
    nrpn_adjustments: [i32; generator::NUM_GENERATORS],
    nrpn: NrpnDecoder,
    sustain: bool,
    sostenuto: bool,
    soft: bool,
}

impl Default for ChannelState {
    fn default() -> Self {
        ChannelState {
            cc: [0; 128],
            key_pressure: [0; 128],
            channel_pressure: 0,
            pitch_wheel: NEUTRAL_PITCH_WHEEL,
            pitch_wheel_sensitivity_semitones: DEFAULT_PITCH_WHEEL_SENSITIVITY_SEMITONES,
            nrpn_adjustments: [0; generator::NUM_GENERATORS],
            nrpn: NrpnDecoder::default(),
            sustain: false,
            sostenuto: false,
            soft: false,
        }
    }
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cc(&self, index: u8) -> u8 {
        self.cc[(index & 0x7f) as usize]
    }

    pub fn key_pressure(&self, key: u8) -> u8 {
        self.key_pressure[(key & 0x7f) as usize]
    }

    pub fn channel_pressure(&self) -> u8 {
        self.channel_pressure
    }

    /// Raw 14-bit pitch wheel value, neutral at 8192.
    pub fn pitch_wheel(&self) -> u16 {
        self.pitch_wheel
    }

    /// Pitch-bend range in semitones (RPN 0/0), used both as the pitch
    /// modulator's amount-source raw value and to scale the pitch wheel's
    /// contribution to phase increment.
    pub fn pitch_wheel_sensitivity_semitones(&self) -> u8 {
        self.pitch_wheel_sensitivity_semitones
    }

    pub fn set_pitch_wheel_sensitivity_semitones(&mut self, semitones: u8) {
        self.pitch_wheel_sensitivity_semitones = semitones.min(127);
    }

    pub fn nrpn_adjustment(&self, index: generator::Index) -> i32 {
        self.nrpn_adjustments[index as usize]
    }

    pub fn sustain(&self) -> bool {
        self.sustain
    }

    pub fn sostenuto(&self) -> bool {
        self.sostenuto
    }

    pub fn soft(&self) -> bool {
        self.soft
    }

    /// Bank number from the cached `CC 0` (MSB) / `CC 32` (LSB) pair.
    pub fn bank(&self) -> u16 {
        self.cc(CC_BANK_SELECT_MSB) as u16 * 128 + self.cc(CC_BANK_SELECT_LSB) as u16
    }

    pub fn set_key_pressure(&mut self, key: u8, value: u8) {
        self.key_pressure[(key & 0x7f) as usize] = value;
    }

    pub fn set_channel_pressure(&mut self, value: u8) {
        self.channel_pressure = value;
    }

    pub fn set_pitch_wheel(&mut self, low: u8, high: u8) {
        self.pitch_wheel = (low as u16 & 0x7f) | ((high as u16 & 0x7f) << 7);
    }

    /// Applies a CC value, including all NRPN/RPN/pedal side effects.
    /// Returns `true` if the change could affect an active voice's rendered
    /// state (so the engine can drive `channel_state_changed`).
    pub fn set_cc(&mut self, cc: u8, value: u8) -> bool {
        let cc = cc & 0x7f;
        let value = value & 0x7f;
        self.cc[cc as usize] = value;

        match cc {
            CC_NRPN_MSB => {
                if value == NRPN_MSB_SF2_SELECT {
                    self.nrpn.active = true;
                    self.nrpn.accumulated_index = 0;
                }
            }
            CC_NRPN_LSB => {
                if self.nrpn.active {
                    self.nrpn.accumulated_index += match value {
                        100 => 100,
                        101 => 1000,
                        102 => 10000,
                        v if v < 100 => v as u32,
                        _ => 0,
                    };
                }
            }
            CC_DATA_ENTRY_LSB => {
                self.nrpn.data_entry_lsb = value;
            }
            CC_DATA_ENTRY_MSB => {
                if self.nrpn.active {
                    if let Some(index) = generator::Index::from_raw(self.nrpn.accumulated_index as u16) {
                        self.apply_nrpn_data_entry(index, value);
                    }
                }
            }
            CC_RPN_LSB | CC_RPN_MSB => {
                self.nrpn.active = false;
            }
            CC_SUSTAIN => self.sustain = value >= 64,
            CC_SOSTENUTO => self.sostenuto = value >= 64,
            CC_SOFT => self.soft = value >= 64,
            _ => {}
        }

        true
    }

    /// `raw = (msb & 0x7F) << 7 | dataEntryLsb`; only the incoming MSB is
    /// masked, the cached LSB is used unmasked since CC values are already
    /// 7-bit (the channel-state decoder variant, §4.11 / DESIGN.md).
    fn apply_nrpn_data_entry(&mut self, index: generator::Index, msb: u8) {
        let raw = ((msb & 0x7f) as i32) << 7 | self.nrpn.data_entry_lsb as i32;
        let centered = (raw - 8192).clamp(-8192, 8192);
        let multiplier = index.definition().nrpn_multiplier;
        self.nrpn_adjustments[index as usize] = centered * multiplier;
    }

    pub fn reset(&mut self) {
        *self = ChannelState::default();
    }
}
