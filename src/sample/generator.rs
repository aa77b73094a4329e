//! Interpolated sample playback with loop-wrap handling (§4.6).

use super::bounds::Bounds;
use super::phase::SamplePhase;
use crate::dsp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Cubic,
}

/// `sampleModes` generator values: 0 = none, 1 = loop continuously while the
/// volume envelope is active, 2 is reserved (treated as none), 3 = loop
/// only while the key is held and play the remainder once released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopingMode {
    None,
    ActiveEnvelope,
    DuringKeyPress,
}

impl LoopingMode {
    pub fn from_raw(raw: u16) -> LoopingMode {
        match raw {
            1 => LoopingMode::ActiveEnvelope,
            3 => LoopingMode::DuringKeyPress,
            _ => LoopingMode::None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SampleGenerator {
    bounds: Bounds,
    phase: SamplePhase,
    looping_mode: LoopingMode,
    interpolation: Interpolation,
    done: bool,
    looped: bool,
}

impl SampleGenerator {
    pub fn new(bounds: Bounds, looping_mode: LoopingMode, interpolation: Interpolation) -> Self {
        SampleGenerator {
            phase: SamplePhase::new(bounds.start_pos),
            bounds,
            looping_mode,
            interpolation,
            done: false,
            looped: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// True once the phase has wrapped at `endLoopPos` at least once. Used
    /// by the release-stage noise-floor check (§4.9 step 7), which applies
    /// a laxer threshold once a voice has entered its loop.
    pub fn has_looped(&self) -> bool {
        self.looped
    }

    pub fn looping_mode(&self) -> LoopingMode {
        self.looping_mode
    }

    /// Whether looping is currently permitted, given the volume envelope's
    /// idle state and whether the initiating key is still held (§4.6).
    pub fn can_loop(&self, volume_envelope_active: bool, key_down: bool) -> bool {
        self.bounds.can_loop()
            && match self.looping_mode {
                LoopingMode::None => false,
                LoopingMode::ActiveEnvelope => volume_envelope_active,
                LoopingMode::DuringKeyPress => key_down,
            }
    }

    fn wrap(&self, index: i64, can_loop: bool) -> i64 {
        if !can_loop {
            return index;
        }
        let end = self.bounds.end_loop_pos as i64;
        let len = self.bounds.loop_length() as i64;
        if len == 0 {
            return index;
        }
        let mut index = index;
        while index >= end {
            index -= len;
        }
        index
    }

    fn at(&self, samples: &[f32], index: i64, can_loop: bool) -> f32 {
        let index = self.wrap(index, can_loop);
        if index < 0 {
            0.0
        } else {
            samples.get(index as usize).copied().unwrap_or(0.0)
        }
    }

    /// Produces one interpolated output sample and advances the phase by
    /// `increment`. Returns 0 once [`is_done`] has latched.
    pub fn generate(&mut self, samples: &[f32], increment: f32, can_loop: bool) -> f32 {
        if self.done {
            return 0.0;
        }

        let n = self.phase.index;
        let f = self.phase.partial;

        let output = match self.interpolation {
            Interpolation::Linear => {
                let x0 = self.at(samples, n, can_loop);
                let x1 = self.at(samples, n + 1, can_loop);
                x0 * (1.0 - f) + x1 * f
            }
            Interpolation::Cubic => {
                let x_minus_1 = if n == 0 { 0.0 } else { self.at(samples, n - 1, can_loop) };
                let x0 = self.at(samples, n, can_loop);
                let x1 = self.at(samples, n + 1, can_loop);
                let x2 = self.at(samples, n + 2, can_loop);
                let (w0, w1, w2, w3) = dsp::cubic_weights_table(f);
                x_minus_1 * w0 + x0 * w1 + x1 * w2 + x2 * w3
            }
        };

        self.phase.advance(increment);

        if can_loop {
            let end = self.bounds.end_loop_pos as i64;
            let len = self.bounds.loop_length() as i64;
            while len > 0 && self.phase.index >= end {
                self.phase.rewind(len as usize);
                self.looped = true;
            }
        } else if self.phase.index >= self.bounds.end_pos as i64 {
            self.done = true;
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::source::{SampleHeader, SampleType};

    fn test_bounds() -> Bounds {
        let header = SampleHeader {
            start: 0,
            end: 8,
            start_loop: 2,
            end_loop: 6,
            sample_rate: 44100,
            original_midi_key: 60,
            pitch_correction: 0,
            sample_type: SampleType::Mono,
        };
        Bounds::make(&header, 0, 0, 0, 0, 0, 0, 0, 0)
    }

    #[test]
    fn linear_interpolation_at_integer_phase_reads_exact_sample() {
        let samples = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 0.0, 0.0];
        let mut generator = SampleGenerator::new(test_bounds(), LoopingMode::None, Interpolation::Linear);
        let out = generator.generate(&samples, 1.0, false);
        assert_eq!(out, 0.0);
        let out = generator.generate(&samples, 1.0, false);
        assert_eq!(out, 1.0);
    }

    #[test]
    fn non_looping_generator_finishes_at_end_pos() {
        let samples = vec![1.0f32; 8 + super::super::source::TRAILING_ZERO_SAMPLES];
        let mut generator = SampleGenerator::new(test_bounds(), LoopingMode::None, Interpolation::Linear);
        for _ in 0..8 {
            assert!(!generator.is_done());
            generator.generate(&samples, 1.0, false);
        }
        assert!(generator.is_done());
    }

    #[test]
    fn looping_generator_wraps_at_end_loop_pos() {
        let samples = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 0.0, 0.0];
        let mut generator = SampleGenerator::new(test_bounds(), LoopingMode::ActiveEnvelope, Interpolation::Linear);
        for _ in 0..20 {
            generator.generate(&samples, 1.0, true);
            assert!(!generator.is_done());
        }
    }

    #[test]
    fn has_looped_latches_after_first_wrap() {
        let samples = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 0.0, 0.0];
        let mut generator = SampleGenerator::new(test_bounds(), LoopingMode::ActiveEnvelope, Interpolation::Linear);
        assert!(!generator.has_looped());
        for _ in 0..10 {
            generator.generate(&samples, 1.0, true);
        }
        assert!(generator.has_looped());
    }

    #[test]
    fn looping_mode_from_raw_matches_sf2_encoding() {
        assert_eq!(LoopingMode::from_raw(0), LoopingMode::None);
        assert_eq!(LoopingMode::from_raw(1), LoopingMode::ActiveEnvelope);
        assert_eq!(LoopingMode::from_raw(2), LoopingMode::None);
        assert_eq!(LoopingMode::from_raw(3), LoopingMode::DuringKeyPress);
    }
}
