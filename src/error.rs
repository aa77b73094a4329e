//! Error taxonomy for the off-render-thread (`load`) operations.
//!
//! Render-path methods (`render`, `handle_midi`, `note_on`, `note_off`) never
//! return this type — they are total, per the concurrency model, and report
//! nothing back to the caller beyond silently dropping malformed input.

use thiserror::Error;

/// Failure modes for loading a parsed SF2 structure into the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthError {
    #[error("soundfont source could not be opened")]
    NotFound,

    #[error("soundfont source is not a valid SF2 structure: {reason}")]
    InvalidFormat { reason: String },

    #[error("duplicate preset bank/program ({bank}, {program})")]
    DuplicateBankProgram { bank: u8, program: u8 },
}
