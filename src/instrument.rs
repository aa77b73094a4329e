//! Instrument: a named collection of instrument zones (§3 "Instrument").

use crate::generator;
use crate::zone::Zone;

#[derive(Clone, Debug)]
pub struct Instrument {
    pub name: String,
    pub global_zone: Option<Zone>,
    pub zones: Vec<Zone>,
}

impl Instrument {
    /// Splits the raw zone list into an optional leading global zone and
    /// the remaining non-global zones, each of which must link to a sample.
    pub fn build(name: String, zones: Vec<Zone>) -> Instrument {
        let mut zones = zones;
        let global_zone = if zones.first().map(|z| z.is_global).unwrap_or(false) {
            Some(zones.remove(0))
        } else {
            None
        };
        Instrument { name, global_zone, zones }
    }

    /// Non-global zones whose key/velocity ranges contain (key, velocity).
    pub fn matching_zones(&self, key: u8, velocity: u8) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(move |zone| zone.applies_to(key, velocity))
    }
}

/// All loaded instruments, indexed identically to the preset zones'
/// `instrument` generator link values.
#[derive(Clone, Debug, Default)]
pub struct InstrumentCollection {
    instruments: Vec<Instrument>,
}

impl InstrumentCollection {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        InstrumentCollection { instruments }
    }

    pub fn get(&self, index: u16) -> Option<&Instrument> {
        self.instruments.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

/// Extracts the nonzero exclusive-class value from an instrument zone's
/// generators, or 0 if none is set (§4.2).
pub fn exclusive_class(zone: &Zone) -> u16 {
    zone.generator_value(generator::Index::ExclusiveClass)
        .map(|amount| amount.unsigned() as u16)
        .unwrap_or(0)
}
