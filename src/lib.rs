//! Real-time synthesis core for a SoundFont 2 sample-based polyphonic
//! synthesizer: preset/instrument/zone resolution, the modulator graph,
//! per-voice envelopes/LFOs/filter/sample playback, and the voice-pool
//! engine that drives it all from a MIDI event stream (see each module's
//! own docs for the corresponding section of the design).
//!
//! SF2 RIFF parsing, MIDI transport decoding, and SysEx Base64/file-path
//! resolution are external collaborators; this crate only defines the
//! narrow [`soundfont::SoundFontSource`] seam a parser fills in and accepts
//! already-extracted MIDI event bytes via [`engine::Engine::handle_midi`].

pub mod channel_state;
pub mod dsp;
pub mod engine;
pub mod envelope;
mod error;
pub mod filter;
pub mod generator;
pub mod instrument;
pub mod lfo;
pub mod lru;
pub mod mixer;
pub mod modulator;
pub mod pitch;
pub mod preset;
pub mod sample;
pub mod soundfont;
pub mod value_transformer;
pub mod voice;
pub mod zone;

pub use engine::{Engine, EngineConfig};
pub use error::SynthError;

/// Forces every lazily-built lookup table (`dsp`, `value_transformer`,
/// `modulator::DEFAULT_MODULATORS`) to construct. Callers that care about
/// bounding worst-case latency on the very first `render`/`note_on` after
/// startup should call this once, off the render thread, before traffic
/// begins; it is otherwise unnecessary, since every table builds itself
/// lazily and idempotently on first use (§5 "Scheduling model").
pub fn warm_lookup_tables() {
    dsp::warm_lookup_tables();
    value_transformer::warm_value_transformer_tables();
    once_cell::sync::Lazy::force(&modulator::DEFAULT_MODULATORS);
}
