//! Zone matching and global-zone detection (§3 "Zone", §4.2).

use crate::generator;
use crate::modulator::Modulator;
use std::ops::RangeInclusive;

const FULL_KEY_RANGE: RangeInclusive<u8> = 0..=127;
const FULL_VELOCITY_RANGE: RangeInclusive<u8> = 0..=127;

/// A zone's generator and modulator lists, plus the key/velocity range
/// derived from its leading generators. Shared by preset and instrument
/// zones; `terminal` distinguishes which generator index ends a non-global
/// zone (`Instrument` for preset zones, `SampleId` for instrument zones).
#[derive(Clone, Debug)]
pub struct Zone {
    pub generators: Vec<(generator::Index, generator::Amount)>,
    pub modulators: Vec<Modulator>,
    pub key_range: RangeInclusive<u8>,
    pub velocity_range: RangeInclusive<u8>,
    pub is_global: bool,
    terminal_link: Option<u16>,
}

impl Zone {
    /// Builds a zone from its raw (in file order) generator list. `terminal`
    /// names the generator kind that, appearing last, marks a non-global
    /// zone's link to an instrument or sample.
    pub fn build(generators: Vec<(generator::Index, generator::Amount)>, modulators: Vec<Modulator>, terminal: generator::Index) -> Zone {
        let key_range = extract_range(&generators, generator::Index::KeyRange, 0);
        let velocity_range = extract_velocity_range(&generators, &key_range);

        let last_is_terminal = generators.last().map(|(index, _)| *index == terminal).unwrap_or(false);
        let is_global = !last_is_terminal || generators.is_empty();

        let terminal_link = if last_is_terminal {
            generators.last().map(|(_, amount)| amount.unsigned() as u16)
        } else {
            None
        };

        Zone {
            generators,
            modulators,
            key_range: key_range.unwrap_or(FULL_KEY_RANGE),
            velocity_range: velocity_range.unwrap_or(FULL_VELOCITY_RANGE),
            is_global,
            terminal_link,
        }
    }

    pub fn applies_to(&self, key: u8, velocity: u8) -> bool {
        self.key_range.contains(&key) && self.velocity_range.contains(&velocity)
    }

    pub fn generator_value(&self, index: generator::Index) -> Option<generator::Amount> {
        self.generators.iter().find(|(i, _)| *i == index).map(|(_, amount)| *amount)
    }

    /// The instrument index (for a preset zone) or sample index (for an
    /// instrument zone) this zone links to, if it is non-global.
    pub fn terminal_link(&self) -> Option<u16> {
        self.terminal_link
    }
}

fn extract_range(generators: &[(generator::Index, generator::Amount)], index: generator::Index, position: usize) -> Option<RangeInclusive<u8>> {
    generators
        .get(position)
        .filter(|(i, _)| *i == index)
        .map(|(_, amount)| {
            let (low, high) = amount.low_high();
            low..=high
        })
}

/// `velocityRange`, when present, is either the first generator or the
/// second generator immediately following a leading `keyRange` (§3).
fn extract_velocity_range(generators: &[(generator::Index, generator::Amount)], key_range: &Option<RangeInclusive<u8>>) -> Option<RangeInclusive<u8>> {
    let position = if key_range.is_some() { 1 } else { 0 };
    extract_range(generators, generator::Index::VelocityRange, position)
}
