//! Dry + chorus-send + reverb-send accumulation buses (§4.10), grounded on
//! the reference `Render::Engine::Mixer` / `DSPHeaders::BusBuffers` pair.
//!
//! Where the reference implementation holds long-lived `BusBuffers` that
//! advance an internal write cursor by `shiftOver(frameCount)` after each
//! render call, this crate instead borrows exactly-sized caller-owned
//! slices for the duration of one [`Engine::render`](crate::engine::Engine::render)
//! call: there is no persistent cursor to shift, since the host always
//! hands over a fresh `frame_count`-sized buffer per call.

/// Borrowed left/right planar buffer pair for one audio bus.
pub struct Bus<'a> {
    left: &'a mut [f32],
    right: &'a mut [f32],
}

impl<'a> Bus<'a> {
    pub fn new(left: &'a mut [f32], right: &'a mut [f32]) -> Self {
        Bus { left, right }
    }

    fn zero(&mut self, frame_count: usize) {
        self.left[..frame_count].fill(0.0);
        self.right[..frame_count].fill(0.0);
    }

    fn add(&mut self, frame: usize, left: f32, right: f32) {
        self.left[frame] += left;
        self.right[frame] += right;
    }
}

/// The three stereo buses a voice accumulates into: dry (always present),
/// and optional chorus-send / reverb-send pairs (§6, "Audio output").
pub struct Mixer<'a> {
    dry: Bus<'a>,
    chorus_send: Option<Bus<'a>>,
    reverb_send: Option<Bus<'a>>,
}

impl<'a> Mixer<'a> {
    pub fn new(dry: Bus<'a>, chorus_send: Option<Bus<'a>>, reverb_send: Option<Bus<'a>>) -> Self {
        Mixer { dry, chorus_send, reverb_send }
    }

    /// Zero-initializes every present bus's first `frame_count` samples,
    /// done once per render block before voices accumulate into them.
    pub fn zero(&mut self, frame_count: usize) {
        self.dry.zero(frame_count);
        if let Some(bus) = &mut self.chorus_send {
            bus.zero(frame_count);
        }
        if let Some(bus) = &mut self.reverb_send {
            bus.zero(frame_count);
        }
    }

    /// Accumulates one voice's already left/right-panned sample at `frame`,
    /// scaling the chorus/reverb contribution by the voice's own per-voice
    /// send amounts (§4.10).
    pub fn add(&mut self, frame: usize, left: f32, right: f32, chorus_level: f32, reverb_level: f32) {
        self.dry.add(frame, left, right);
        if let Some(bus) = &mut self.chorus_send {
            bus.add(frame, left * chorus_level, right * chorus_level);
        }
        if let Some(bus) = &mut self.reverb_send {
            bus.add(frame, left * reverb_level, right * reverb_level);
        }
    }
}
