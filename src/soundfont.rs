//! The shape of parsed SF2 data this crate consumes, and an in-memory
//! builder satisfying it for tests and non-RIFF callers (§6, "SF2 file
//! format").
//!
//! This module intentionally knows nothing about RIFF chunk layout: a real
//! `sfbk` parser is an external crate's job (§1, "Out of scope"). What lives
//! here is the narrow seam a parser must fill — one raw record per SF2
//! entity, decoded from raw 16-bit fields into this crate's own [`Modulator`]
//! and [`Zone`] types by [`build_collections`].

use crate::error::SynthError;
use crate::generator::{self, Amount};
use crate::instrument::{Instrument, InstrumentCollection};
use crate::modulator::{self, Modulator, Source, Transform};
use crate::preset::{Preset, PresetCollection};
use crate::sample::{SampleHeader, SampleSourceCollection};
use crate::zone::Zone;

/// One raw SF2 modulator record (`sfModList`), in the file's own 16-bit
/// encoding (SF2.01 §8.2). Decoded into a [`Modulator`] by [`to_modulator`].
#[derive(Clone, Copy, Debug)]
pub struct RawModulator {
    pub source_oper: u16,
    pub dest_oper: u16,
    pub amount: i16,
    pub amount_source_oper: u16,
    pub transform_oper: u16,
}

impl RawModulator {
    /// Decodes this record, or `None` if its destination generator index is
    /// out of the defined 0..58 range (such records are simply dropped, the
    /// same way an invalid *source* is dropped by [`modulator::add_modulator`]).
    pub fn to_modulator(self) -> Option<Modulator> {
        let destination = generator::Index::from_raw(self.dest_oper)?;
        let transform = if self.transform_oper == 2 { Transform::Absolute } else { Transform::Linear };
        Some(Modulator {
            primary_source: Source::from_raw(self.source_oper),
            destination,
            amount: self.amount,
            amount_source: Source::from_raw(self.amount_source_oper),
            transform,
        })
    }
}

/// One raw generator/amount pair (`sfGenList`), in file order within a zone.
pub type RawGenerator = (generator::Index, Amount);

/// One raw zone (`sfPresetBag`/`sfInstBag` plus the generators and
/// modulators it spans), already split per-zone by the caller's RIFF reader.
#[derive(Clone, Debug, Default)]
pub struct RawZone {
    pub generators: Vec<RawGenerator>,
    pub modulators: Vec<RawModulator>,
}

impl RawZone {
    fn build(self, terminal: generator::Index) -> Zone {
        let modulators: Vec<Modulator> = self.modulators.into_iter().filter_map(RawModulator::to_modulator).collect();
        Zone::build(self.generators, modulators, terminal)
    }
}

/// One raw preset (`sfPresetHeader`) plus its zones.
#[derive(Clone, Debug, Default)]
pub struct RawPreset {
    pub name: String,
    pub bank: u8,
    pub program: u8,
    pub zones: Vec<RawZone>,
}

/// One raw instrument (`sfInst`) plus its zones.
#[derive(Clone, Debug, Default)]
pub struct RawInstrument {
    pub name: String,
    pub zones: Vec<RawZone>,
}

/// The exact shape a parsed SF2 structure must expose: presets,
/// instruments, sample headers, and the file-wide 16-bit PCM block (§6).
/// A real RIFF `sfbk` parser lives in an external crate and implements this
/// trait; [`SoundFontData`] is a lightweight in-memory implementation for
/// tests and for callers who already have parsed data from elsewhere.
pub trait SoundFontSource {
    fn presets(&self) -> &[RawPreset];
    fn instruments(&self) -> &[RawInstrument];
    fn sample_headers(&self) -> &[SampleHeader];
    fn pcm(&self) -> &[i16];
}

/// The three built collections the engine operates on, assembled from a
/// [`SoundFontSource`] by [`build_collections`].
pub struct BuiltSoundFont {
    pub presets: PresetCollection,
    pub instruments: InstrumentCollection,
    pub samples: SampleSourceCollection,
}

/// Decodes every raw record from `source` into this crate's own types
/// (§4.2's zone/generator/modulator model), off the render thread (§6b).
pub fn build_collections(source: &dyn SoundFontSource) -> Result<BuiltSoundFont, SynthError> {
    let instruments: Vec<Instrument> = source
        .instruments()
        .iter()
        .map(|raw| {
            let zones = raw.zones.iter().cloned().map(|z| z.build(generator::Index::SampleId)).collect();
            Instrument::build(raw.name.clone(), zones)
        })
        .collect();
    let instruments = InstrumentCollection::new(instruments);

    let presets: Vec<Preset> = source
        .presets()
        .iter()
        .map(|raw| {
            let zones = raw.zones.iter().cloned().map(|z| z.build(generator::Index::Instrument)).collect();
            Preset::build(raw.name.clone(), raw.bank, raw.program, zones)
        })
        .collect();
    let presets = PresetCollection::build(presets)?;

    let samples = SampleSourceCollection::build(source.sample_headers(), source.pcm());

    log::info!(
        "built soundfont collections: {} presets, {} instruments, {} samples",
        presets.len(),
        instruments.len(),
        samples.len()
    );

    Ok(BuiltSoundFont { presets, instruments, samples })
}

/// A programmatically constructed [`SoundFontSource`], for tests and for
/// callers who parse SF2 data themselves and just want to hand this crate
/// the result without writing their own trait implementation.
#[derive(Clone, Debug, Default)]
pub struct SoundFontData {
    presets: Vec<RawPreset>,
    instruments: Vec<RawInstrument>,
    sample_headers: Vec<SampleHeader>,
    pcm: Vec<i16>,
}

impl SoundFontData {
    pub fn new() -> Self {
        SoundFontData::default()
    }

    pub fn with_preset(mut self, preset: RawPreset) -> Self {
        self.presets.push(preset);
        self
    }

    pub fn with_instrument(mut self, instrument: RawInstrument) -> Self {
        self.instruments.push(instrument);
        self
    }

    pub fn with_sample(mut self, header: SampleHeader) -> Self {
        self.sample_headers.push(header);
        self
    }

    pub fn with_pcm(mut self, pcm: Vec<i16>) -> Self {
        self.pcm = pcm;
        self
    }
}

impl SoundFontSource for SoundFontData {
    fn presets(&self) -> &[RawPreset] {
        &self.presets
    }

    fn instruments(&self) -> &[RawInstrument] {
        &self.instruments
    }

    fn sample_headers(&self) -> &[SampleHeader] {
        &self.sample_headers
    }

    fn pcm(&self) -> &[i16] {
        &self.pcm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleType;

    fn sample_header() -> SampleHeader {
        SampleHeader {
            start: 0,
            end: 4,
            start_loop: 1,
            end_loop: 3,
            sample_rate: 44100,
            original_midi_key: 60,
            pitch_correction: 0,
            sample_type: SampleType::Mono,
        }
    }

    fn one_zone_instrument() -> RawInstrument {
        RawInstrument {
            name: "Inst".to_string(),
            zones: vec![RawZone { generators: vec![(generator::Index::SampleId, Amount::new(0))], modulators: Vec::new() }],
        }
    }

    fn one_zone_preset() -> RawPreset {
        RawPreset {
            name: "Preset".to_string(),
            bank: 0,
            program: 0,
            zones: vec![RawZone { generators: vec![(generator::Index::Instrument, Amount::new(0))], modulators: Vec::new() }],
        }
    }

    #[test]
    fn build_collections_wires_preset_to_instrument_to_sample() {
        let data = SoundFontData::new()
            .with_preset(one_zone_preset())
            .with_instrument(one_zone_instrument())
            .with_sample(sample_header())
            .with_pcm(vec![0, 100, 200, 300]);
        let built = build_collections(&data).unwrap();
        assert_eq!(built.presets.len(), 1);
        assert_eq!(built.instruments.len(), 1);
        assert_eq!(built.samples.len(), 1);
        let configs = built.presets.get(0).unwrap().find(60, 100, &built.instruments);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].sample_index, 0);
    }

    #[test]
    fn duplicate_bank_program_is_propagated_as_error() {
        let mut a = one_zone_preset();
        a.name = "A".to_string();
        let mut b = one_zone_preset();
        b.name = "B".to_string();
        let data = SoundFontData::new().with_preset(a).with_preset(b);
        let result = build_collections(&data);
        assert!(matches!(result, Err(SynthError::DuplicateBankProgram { bank: 0, program: 0 })));
    }

    #[test]
    fn modulator_with_invalid_destination_is_dropped_not_errored() {
        let zone = RawZone {
            generators: vec![(generator::Index::SampleId, Amount::new(0))],
            modulators: vec![RawModulator { source_oper: 0x0102, dest_oper: 9999, amount: 10, amount_source_oper: 0, transform_oper: 0 }],
        };
        let instrument = RawInstrument { name: "Inst".to_string(), zones: vec![zone] };
        let data = SoundFontData::new().with_preset(one_zone_preset()).with_instrument(instrument);
        let built = build_collections(&data).unwrap();
        let instrument_zone = &built.instruments.get(0).unwrap().zones[0];
        assert!(instrument_zone.modulators.is_empty());
    }

    #[test]
    fn valid_raw_modulator_decodes_into_zone_modulator_list() {
        let cc1_to_pitch = RawModulator { source_oper: 1 | (1 << 7), dest_oper: modulator::DEFAULT_MODULATORS[3].destination as u16, amount: 50, amount_source_oper: 0, transform_oper: 0 };
        let zone = RawZone { generators: vec![(generator::Index::SampleId, Amount::new(0))], modulators: vec![cc1_to_pitch] };
        let instrument = RawInstrument { name: "Inst".to_string(), zones: vec![zone] };
        let data = SoundFontData::new().with_preset(one_zone_preset()).with_instrument(instrument);
        let built = build_collections(&data).unwrap();
        let instrument_zone = &built.instruments.get(0).unwrap().zones[0];
        assert_eq!(instrument_zone.modulators.len(), 1);
    }
}
