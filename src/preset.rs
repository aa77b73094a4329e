//! Preset: bank/program-addressed collection of preset zones, plus the
//! (key, velocity) zone matcher that produces [`VoiceConfig`]s (§3 "Preset",
//! §4.2).

use crate::error::SynthError;
use crate::instrument::{self, Instrument, InstrumentCollection};
use crate::zone::Zone;

#[derive(Clone, Debug)]
pub struct Preset {
    pub name: String,
    pub bank: u8,
    pub program: u8,
    pub global_zone: Option<Zone>,
    pub zones: Vec<Zone>,
}

impl Preset {
    pub fn build(name: String, bank: u8, program: u8, zones: Vec<Zone>) -> Preset {
        let mut zones = zones;
        let global_zone = if zones.first().map(|z| z.is_global).unwrap_or(false) {
            Some(zones.remove(0))
        } else {
            None
        };
        Preset { name, bank, program, global_zone, zones }
    }

    /// Enumerates one `VoiceConfig` per (matched preset zone, matched
    /// instrument zone) pair for the given (key, velocity) (§4.2).
    pub fn find<'a>(&'a self, key: u8, velocity: u8, instruments: &'a InstrumentCollection) -> Vec<VoiceConfig<'a>> {
        let mut configs = Vec::new();
        for preset_zone in self.zones.iter().filter(|z| z.applies_to(key, velocity)) {
            let Some(instrument_index) = preset_zone.terminal_link() else { continue };
            let Some(instrument) = instruments.get(instrument_index) else { continue };
            for instrument_zone in instrument.matching_zones(key, velocity) {
                let Some(sample_index) = instrument_zone.terminal_link() else { continue };
                configs.push(VoiceConfig {
                    preset_zone,
                    global_preset_zone: self.global_zone.as_ref(),
                    instrument_zone,
                    global_instrument_zone: instrument.global_zone.as_ref(),
                    key,
                    velocity,
                    exclusive_class: instrument::exclusive_class(instrument_zone),
                    sample_index,
                });
            }
        }
        configs
    }
}

/// One fully-resolved match: a preset zone paired with an instrument zone,
/// plus whichever global zones apply, ready to be applied to a voice's
/// generator/modulator state (§4.2).
#[derive(Clone, Copy, Debug)]
pub struct VoiceConfig<'a> {
    pub preset_zone: &'a Zone,
    pub global_preset_zone: Option<&'a Zone>,
    pub instrument_zone: &'a Zone,
    pub global_instrument_zone: Option<&'a Zone>,
    pub key: u8,
    pub velocity: u8,
    pub exclusive_class: u16,
    pub sample_index: u16,
}

/// All loaded presets, ordered by (bank, program) and rejecting duplicates
/// at construction time (§4.1, `load.duplicate_bank_program`).
#[derive(Clone, Debug, Default)]
pub struct PresetCollection {
    presets: Vec<Preset>,
}

impl PresetCollection {
    pub fn build(mut presets: Vec<Preset>) -> Result<PresetCollection, SynthError> {
        presets.sort_by_key(|p| (p.bank, p.program));
        for pair in presets.windows(2) {
            if pair[0].bank == pair[1].bank && pair[0].program == pair[1].program {
                return Err(SynthError::DuplicateBankProgram { bank: pair[0].bank, program: pair[0].program });
            }
        }
        Ok(PresetCollection { presets })
    }

    pub fn get(&self, index: usize) -> Option<&Preset> {
        self.presets.get(index)
    }

    pub fn find_by_bank_program(&self, bank: u8, program: u8) -> Option<usize> {
        self.presets.iter().position(|p| p.bank == bank && p.program == program)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{Amount, Index};

    fn instrument_with_one_zone() -> Instrument {
        let zone = Zone::build(vec![(Index::SampleId, Amount::new(0))], Vec::new(), Index::SampleId);
        Instrument::build("Inst".to_string(), vec![zone])
    }

    #[test]
    fn find_pairs_preset_zone_with_instrument_zone() {
        let instruments = InstrumentCollection::new(vec![instrument_with_one_zone()]);
        let preset_zone = Zone::build(vec![(Index::Instrument, Amount::new(0))], Vec::new(), Index::Instrument);
        let preset = Preset::build("Test".to_string(), 0, 0, vec![preset_zone]);
        let configs = preset.find(60, 100, &instruments);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].sample_index, 0);
    }

    #[test]
    fn duplicate_bank_program_is_rejected() {
        let a = Preset::build("A".to_string(), 0, 0, Vec::new());
        let b = Preset::build("B".to_string(), 0, 0, Vec::new());
        let result = PresetCollection::build(vec![a, b]);
        assert!(matches!(result, Err(SynthError::DuplicateBankProgram { bank: 0, program: 0 })));
    }

    #[test]
    fn presets_are_ordered_by_bank_then_program() {
        let a = Preset::build("A".to_string(), 1, 0, Vec::new());
        let b = Preset::build("B".to_string(), 0, 5, Vec::new());
        let collection = PresetCollection::build(vec![a, b]).unwrap();
        assert_eq!(collection.get(0).unwrap().name, "B");
        assert_eq!(collection.get(1).unwrap().name, "A");
    }
}
