//! Sample playback position: an integer sample index plus a `[0, 1)`
//! fractional part (§4.6).

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePhase {
    pub index: i64,
    pub partial: f32,
}

impl SamplePhase {
    pub fn new(start_index: usize) -> Self {
        SamplePhase { index: start_index as i64, partial: 0.0 }
    }

    /// Advances by a positive phase increment, carrying whole samples into
    /// `index` and keeping `partial` normalized to `[0, 1)`.
    pub fn advance(&mut self, increment: f32) {
        let total = self.partial + increment;
        let whole = total.floor();
        self.index += whole as i64;
        self.partial = total - whole;
    }

    /// Rewinds by exactly `length` samples, used when a loop wrap occurs.
    pub fn rewind(&mut self, length: usize) {
        self.index -= length as i64;
    }
}
