//! SF2.01 modulator sources and the entity-level `Modulator` record (§8.2).
//!
//! A modulator maps a primary controller value (optionally scaled by a second
//! "amount source") through a curve into an offset on one destination
//! generator. This module only models the static, load-time shape; the
//! render-side wrapper that actually samples channel state lives in
//! `voice::state`.

use crate::generator;

/// One of the seven general (non-CC) controllers SF2.01 allows as a
/// modulator source, plus `None` which always contributes zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeneralController {
    None = 0,
    NoteOnVelocity = 2,
    NoteOnKey = 3,
    KeyPressure = 10,
    ChannelPressure = 13,
    PitchWheel = 14,
    PitchWheelSensitivity = 16,
}

impl GeneralController {
    fn from_index(index: u8) -> Option<GeneralController> {
        match index {
            0 => Some(GeneralController::None),
            2 => Some(GeneralController::NoteOnVelocity),
            3 => Some(GeneralController::NoteOnKey),
            10 => Some(GeneralController::KeyPressure),
            13 => Some(GeneralController::ChannelPressure),
            14 => Some(GeneralController::PitchWheel),
            16 => Some(GeneralController::PitchWheelSensitivity),
            _ => None,
        }
    }
}

/// CC indices that are never legal modulator sources: bank select and its
/// LSB range, data entry, NRPN/RPN controllers, and the reserved
/// channel-mode bytes.
fn cc_is_invalid(index: u8) -> bool {
    index == 0 || index == 6 || (32..=63).contains(&index) || matches!(index, 98 | 99 | 100 | 101) || (120..=127).contains(&index)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Increasing,
    Decreasing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Polarity {
    Unipolar,
    Bipolar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Continuity {
    Linear = 0,
    Concave = 1,
    Convex = 2,
    Switched = 3,
}

impl Continuity {
    fn from_bits(bits: u16) -> Continuity {
        match bits & 0b11 {
            0 => Continuity::Linear,
            1 => Continuity::Concave,
            2 => Continuity::Convex,
            _ => Continuity::Switched,
        }
    }
}

const CC_BIT: u16 = 1 << 7;
const DIRECTION_BIT: u16 = 1 << 8;
const POLARITY_BIT: u16 = 1 << 9;
const CONTINUITY_SHIFT: u16 = 10;

/// One modulator source: either a MIDI CC index or a general controller,
/// plus the four orthogonal curve-selection flags packed into the raw
/// `sfModSrcOper` field (SF2.01 §8.2.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Source {
    pub is_cc: bool,
    pub index: u8,
    pub direction: Direction,
    pub polarity: Polarity,
    pub continuity: Continuity,
}

impl Source {
    pub const NONE: Source = Source {
        is_cc: false,
        index: 0,
        direction: Direction::Increasing,
        polarity: Polarity::Unipolar,
        continuity: Continuity::Linear,
    };

    /// Decodes a raw 16-bit `sfModSrcOper`/`sfModAmtSrcOper` field.
    pub fn from_raw(raw: u16) -> Source {
        Source {
            is_cc: raw & CC_BIT != 0,
            index: (raw & 0x7f) as u8,
            direction: if raw & DIRECTION_BIT != 0 { Direction::Decreasing } else { Direction::Increasing },
            polarity: if raw & POLARITY_BIT != 0 { Polarity::Bipolar } else { Polarity::Unipolar },
            continuity: Continuity::from_bits(raw >> CONTINUITY_SHIFT),
        }
    }

    pub fn cc(index: u8, direction: Direction, polarity: Polarity, continuity: Continuity) -> Source {
        Source { is_cc: true, index, direction, polarity, continuity }
    }

    pub fn general(controller: GeneralController, direction: Direction, polarity: Polarity, continuity: Continuity) -> Source {
        Source { is_cc: false, index: controller as u8, direction, polarity, continuity }
    }

    pub fn general_controller(self) -> Option<GeneralController> {
        if self.is_cc {
            None
        } else {
            GeneralController::from_index(self.index)
        }
    }

    /// A source is valid iff its index names a usable CC or one of the
    /// seven enumerated general controllers (§4.3).
    pub fn is_valid(self) -> bool {
        if self.is_cc {
            !cc_is_invalid(self.index)
        } else {
            self.general_controller().is_some()
        }
    }

    pub fn is_none(self) -> bool {
        !self.is_cc && self.index == GeneralController::None as u8
    }

    /// True for the pitch-wheel source specifically, which is transformed
    /// through the wide 8192-entry curve table rather than the 128-entry one.
    pub fn uses_pitch_wheel_range(self) -> bool {
        matches!(self.general_controller(), Some(GeneralController::PitchWheel))
    }
}

/// The modulator's output transform (§8.2, `sfModTransOper`). All ten
/// default modulators use `Linear`; `Absolute` exists for completeness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transform {
    Linear,
    Absolute,
}

impl Transform {
    pub fn apply(self, value: f32) -> f32 {
        match self {
            Transform::Linear => value,
            Transform::Absolute => value.abs(),
        }
    }
}

/// A load-time SF2 modulator record: routes one source, optionally scaled
/// by a second amount source, into an offset on a destination generator.
#[derive(Clone, Copy, Debug)]
pub struct Modulator {
    pub primary_source: Source,
    pub destination: generator::Index,
    pub amount: i16,
    pub amount_source: Source,
    pub transform: Transform,
}

impl Modulator {
    /// Two modulators are equal for dedup purposes iff their (primary
    /// source, destination, amount source) triples match; amount and
    /// transform are not part of the key (§4.3).
    pub fn same_key(&self, other: &Modulator) -> bool {
        self.primary_source == other.primary_source
            && self.destination == other.destination
            && self.amount_source == other.amount_source
    }

    pub fn is_valid(&self) -> bool {
        self.primary_source.is_valid() && self.amount_source.is_valid()
    }
}

/// Inserts `modulator` into `list`, replacing an existing entry with the
/// same (source, destination, amount-source) key, or appending if none
/// exists. Invalid modulators are dropped silently (§4.3, "Invalid sources").
pub fn add_modulator(list: &mut Vec<Modulator>, modulator: Modulator) {
    if !modulator.is_valid() {
        return;
    }
    if let Some(existing) = list.iter_mut().find(|m| m.same_key(&modulator)) {
        *existing = modulator;
    } else {
        list.push(modulator);
    }
}

fn cc(index: u8, direction: Direction, polarity: Polarity, continuity: Continuity) -> Source {
    Source::cc(index, direction, polarity, continuity)
}

fn general(controller: GeneralController, direction: Direction, polarity: Polarity, continuity: Continuity) -> Source {
    Source::general(controller, direction, polarity, continuity)
}

/// The ten SF2.01 §8.4 default modulators, installed into every voice state
/// before any zone generator or modulator is applied. Built once via
/// `once_cell`, matching the teacher's `POW2_LUT`/`EXP_LUT` idiom of a single
/// idempotent static rather than reconstructing the list per voice.
pub static DEFAULT_MODULATORS: once_cell::sync::Lazy<[Modulator; 10]> = once_cell::sync::Lazy::new(|| {
    use Continuity::*;
    use Direction::*;
    use Polarity::*;
    [
        Modulator {
            primary_source: general(GeneralController::NoteOnVelocity, Decreasing, Unipolar, Linear),
            destination: generator::Index::InitialAttenuation,
            amount: 960,
            amount_source: general(GeneralController::None, Increasing, Unipolar, Linear),
            transform: Transform::Linear,
        },
        Modulator {
            primary_source: general(GeneralController::NoteOnVelocity, Increasing, Unipolar, Linear),
            destination: generator::Index::ModulatorLfoToVolume,
            amount: 0,
            amount_source: general(GeneralController::None, Increasing, Unipolar, Linear),
            transform: Transform::Linear,
        },
        Modulator {
            primary_source: general(GeneralController::ChannelPressure, Increasing, Unipolar, Linear),
            destination: generator::Index::VibratoLfoToPitch,
            amount: 50,
            amount_source: general(GeneralController::None, Increasing, Unipolar, Linear),
            transform: Transform::Linear,
        },
        Modulator {
            primary_source: cc(1, Increasing, Unipolar, Linear),
            destination: generator::Index::VibratoLfoToPitch,
            amount: 50,
            amount_source: general(GeneralController::None, Increasing, Unipolar, Linear),
            transform: Transform::Linear,
        },
        Modulator {
            primary_source: cc(7, Decreasing, Unipolar, Concave),
            destination: generator::Index::InitialAttenuation,
            amount: 960,
            amount_source: general(GeneralController::None, Increasing, Unipolar, Linear),
            transform: Transform::Linear,
        },
        Modulator {
            primary_source: cc(10, Increasing, Bipolar, Linear),
            destination: generator::Index::Pan,
            amount: 500,
            amount_source: general(GeneralController::None, Increasing, Unipolar, Linear),
            transform: Transform::Linear,
        },
        Modulator {
            primary_source: cc(11, Decreasing, Unipolar, Concave),
            destination: generator::Index::InitialAttenuation,
            amount: 960,
            amount_source: general(GeneralController::None, Increasing, Unipolar, Linear),
            transform: Transform::Linear,
        },
        Modulator {
            primary_source: cc(91, Increasing, Unipolar, Linear),
            destination: generator::Index::ReverbEffectSend,
            amount: 200,
            amount_source: general(GeneralController::None, Increasing, Unipolar, Linear),
            transform: Transform::Linear,
        },
        Modulator {
            primary_source: cc(93, Increasing, Unipolar, Linear),
            destination: generator::Index::ChorusEffectSend,
            amount: 200,
            amount_source: general(GeneralController::None, Increasing, Unipolar, Linear),
            transform: Transform::Linear,
        },
        Modulator {
            primary_source: general(GeneralController::PitchWheel, Increasing, Bipolar, Linear),
            destination: generator::Index::FineTune,
            amount: 12700,
            amount_source: general(GeneralController::PitchWheelSensitivity, Increasing, Unipolar, Linear),
            transform: Transform::Linear,
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cc_invalid_set_matches_spec() {
        assert!(cc_is_invalid(0));
        assert!(cc_is_invalid(6));
        assert!(cc_is_invalid(32));
        assert!(cc_is_invalid(63));
        assert!(cc_is_invalid(98));
        assert!(cc_is_invalid(101));
        assert!(cc_is_invalid(127));
        assert!(!cc_is_invalid(1));
        assert!(!cc_is_invalid(64));
        assert!(!cc_is_invalid(97));
    }

    #[test]
    fn general_controller_whitelist_matches_spec() {
        assert!(GeneralController::from_index(0).is_some());
        assert!(GeneralController::from_index(2).is_some());
        assert!(GeneralController::from_index(16).is_some());
        assert!(GeneralController::from_index(1).is_none());
        assert!(GeneralController::from_index(127).is_none());
    }

    #[test]
    fn raw_bit_layout_round_trips() {
        let raw: u16 = (1 << 7) | (1 << 8) | (1 << 9) | (2 << 10) | 10;
        let source = Source::from_raw(raw);
        assert!(source.is_cc);
        assert_eq!(source.index, 10);
        assert_eq!(source.direction, Direction::Decreasing);
        assert_eq!(source.polarity, Polarity::Bipolar);
        assert_eq!(source.continuity, Continuity::Convex);
    }

    #[test]
    fn default_modulators_has_exactly_ten_entries() {
        assert_eq!(DEFAULT_MODULATORS.len(), 10);
        let pitch_wheel = &DEFAULT_MODULATORS[9];
        assert_eq!(pitch_wheel.amount, 12700);
        assert_eq!(pitch_wheel.amount_source.general_controller(), Some(GeneralController::PitchWheelSensitivity));
    }

    #[test]
    fn dedup_replaces_by_key_not_amount() {
        let mut list = Vec::new();
        add_modulator(&mut list, DEFAULT_MODULATORS[0]);
        let mut replacement = DEFAULT_MODULATORS[0];
        replacement.amount = 500;
        add_modulator(&mut list, replacement);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].amount, 500);
    }

    #[test]
    fn invalid_modulator_is_dropped() {
        let mut list = Vec::new();
        let invalid = Modulator {
            primary_source: cc(6, Direction::Increasing, Polarity::Unipolar, Continuity::Linear),
            destination: generator::Index::Pan,
            amount: 100,
            amount_source: Source::NONE,
            transform: Transform::Linear,
        };
        add_modulator(&mut list, invalid);
        assert!(list.is_empty());
    }
}
