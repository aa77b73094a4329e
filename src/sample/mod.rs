//! Sample storage, per-voice bounds resolution, phase tracking and
//! interpolated generation (§3 "Sample source"/"Bounds", §4.6).

mod bounds;
mod generator;
mod phase;
mod source;

pub use bounds::Bounds;
pub use generator::{Interpolation, LoopingMode, SampleGenerator};
pub use phase::SamplePhase;
pub use source::{SampleHeader, SampleSource, SampleSourceCollection, SampleType};
