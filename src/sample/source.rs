//! Immutable sample storage (§3, "Sample source").

/// SF2.01 `sfSampleType` (§7.10), reduced to what this crate needs to know:
/// whether a sample is one half of a stereo pair. Stereo linking itself
/// (playing both channels together) is a hosting-glue concern (§1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleType {
    Mono,
    Right,
    Left,
    Linked,
    RomMono,
    RomRight,
    RomLeft,
    RomLinked,
}

/// MIDI key values `128..=254` are illegal for `original_midi_key` and fall
/// back to middle C; `255` marks an unpitched (percussion) sample.
pub const UNPITCHED_ORIGINAL_KEY: u8 = 255;
const FALLBACK_ORIGINAL_KEY: u8 = 60;

#[derive(Clone, Copy, Debug)]
pub struct SampleHeader {
    pub start: u32,
    pub end: u32,
    pub start_loop: u32,
    pub end_loop: u32,
    pub sample_rate: u32,
    pub original_midi_key: u8,
    pub pitch_correction: i8,
    pub sample_type: SampleType,
}

impl SampleHeader {
    /// Resolves `original_midi_key` per the SF2.01 convention: `128..=254`
    /// is illegal and maps to middle C; `255` means unpitched.
    pub fn resolved_original_key(&self) -> u8 {
        match self.original_midi_key {
            0..=127 | UNPITCHED_ORIGINAL_KEY => self.original_midi_key,
            _ => FALLBACK_ORIGINAL_KEY,
        }
    }

    pub fn is_unpitched(&self) -> bool {
        self.original_midi_key == UNPITCHED_ORIGINAL_KEY
    }

    pub fn has_loop(&self) -> bool {
        self.start_loop > self.start && self.start_loop < self.end_loop && self.end_loop <= self.end
    }
}

/// Number of trailing zero samples appended past `end` so that cubic
/// interpolation near the end of a non-looping sample never reads
/// out-of-bounds (SF2 spec §7.10).
pub const TRAILING_ZERO_SAMPLES: usize = 46;

/// A single contiguous, immutable, normalized sample buffer shared by
/// reference across every voice that plays it.
#[derive(Clone, Debug)]
pub struct SampleSource {
    pub header: SampleHeader,
    samples: Vec<f32>,
    peak_magnitude: f32,
}

impl SampleSource {
    /// Normalizes 16-bit PCM to `[-1, 1]` floats and appends the 46 trailing
    /// zero samples. `peak_magnitude` is computed once here, over the
    /// audible `[start, end)` range, and cached for the release-stage
    /// noise-floor check (§4.9 step 7).
    pub fn from_pcm16(pcm: &[i16], header: SampleHeader) -> Self {
        let mut samples: Vec<f32> = pcm.iter().map(|&s| s as f32 / 32768.0).collect();
        samples.resize(samples.len() + TRAILING_ZERO_SAMPLES, 0.0);

        let start = header.start as usize;
        let end = (header.end as usize).min(pcm.len());
        let peak_magnitude = samples[start.min(end)..end]
            .iter()
            .fold(0.0f32, |peak, &s| peak.max(s.abs()))
            .max(f32::MIN_POSITIVE);

        SampleSource { header, samples, peak_magnitude }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn peak_magnitude(&self) -> f32 {
        self.peak_magnitude
    }
}

/// All loaded sample sources, indexed identically to the instrument zones'
/// `sampleID` generator link values (§3 "Sample source").
#[derive(Clone, Debug, Default)]
pub struct SampleSourceCollection {
    sources: Vec<SampleSource>,
}

impl SampleSourceCollection {
    pub fn new(sources: Vec<SampleSource>) -> Self {
        SampleSourceCollection { sources }
    }

    /// Builds one [`SampleSource`] per header by slicing the shared
    /// file-wide PCM buffer at `[header.start, header.end)` and rebasing
    /// the header's own indices into that slice's local `0`-based frame,
    /// matching how the RIFF `sdta` chunk stores every sample concatenated
    /// in one array addressed by file-absolute offsets.
    pub fn build(headers: &[SampleHeader], pcm: &[i16]) -> SampleSourceCollection {
        let sources = headers
            .iter()
            .map(|header| {
                let start = (header.start as usize).min(pcm.len());
                let end = (header.end as usize).min(pcm.len()).max(start);
                let local = SampleHeader {
                    start: 0,
                    end: (end - start) as u32,
                    start_loop: header.start_loop.saturating_sub(header.start),
                    end_loop: header.end_loop.saturating_sub(header.start),
                    sample_rate: header.sample_rate,
                    original_midi_key: header.original_midi_key,
                    pitch_correction: header.pitch_correction,
                    sample_type: header.sample_type,
                };
                SampleSource::from_pcm16(&pcm[start..end], local)
            })
            .collect();
        SampleSourceCollection { sources }
    }

    pub fn get(&self, index: u16) -> Option<&SampleSource> {
        self.sources.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> SampleHeader {
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

    #[test]
    fn appends_forty_six_trailing_zeros() {
        let source = SampleSource::from_pcm16(&[100, 200, 300, 400], header());
        assert_eq!(source.len(), 4 + TRAILING_ZERO_SAMPLES);
        assert_eq!(source.samples()[4], 0.0);
        assert_eq!(*source.samples().last().unwrap(), 0.0);
    }

    #[test]
    fn peak_magnitude_is_over_audible_range_only() {
        let source = SampleSource::from_pcm16(&[100, 32767, 300, 400], header());
        assert!((source.peak_magnitude() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn unpitched_sample_detected_by_sentinel_key() {
        let mut h = header();
        h.original_midi_key = UNPITCHED_ORIGINAL_KEY;
        assert!(h.is_unpitched());
        assert_eq!(h.resolved_original_key(), UNPITCHED_ORIGINAL_KEY);
    }

    #[test]
    fn illegal_original_key_falls_back_to_middle_c() {
        let mut h = header();
        h.original_midi_key = 200;
        assert_eq!(h.resolved_original_key(), FALLBACK_ORIGINAL_KEY);
    }

    #[test]
    fn has_loop_requires_well_ordered_bounds() {
        assert!(header().has_loop());
        let mut h = header();
        h.start_loop = 0;
        assert!(!h.has_loop());
    }

    #[test]
    fn collection_build_rebases_headers_to_local_frame() {
        let raw = SampleHeader {
            start: 10,
            end: 14,
            start_loop: 11,
            end_loop: 13,
            sample_rate: 44100,
            original_midi_key: 60,
            pitch_correction: 0,
            sample_type: SampleType::Mono,
        };
        let pcm = [0i16, 0, 0, 0, 0, 100, 200, 300, 400, 0, 0, 0];
        let collection = SampleSourceCollection::build(&[raw], &pcm);
        let source = collection.get(0).unwrap();
        assert_eq!(source.header.start, 0);
        assert_eq!(source.header.end, 4);
        assert_eq!(source.header.start_loop, 1);
        assert_eq!(source.header.end_loop, 3);
        assert_eq!(source.samples()[0], pcm[10] as f32 / 32768.0);
    }

    #[test]
    fn collection_get_out_of_range_is_none() {
        let collection = SampleSourceCollection::build(&[], &[]);
        assert!(collection.get(0).is_none());
    }
}
