/// Sample clock translating caller-supplied millisecond presentation
/// timestamps into the container's tick domain.
#[derive(Debug, Clone, Copy)]
pub struct SampleClock {
    ticks_per_second: u32,
    /// Ticks per frame at the nominal rate, used for synthesized timestamps.
    frame_interval: u64,
    /// Tick position of the most recent sample.
    position: u64,
}

impl SampleClock {
    /// Create a clock. `frame_rate` must be non-zero (the session validates
    /// geometry before constructing one).
    pub fn new(ticks_per_second: u32, frame_rate: u32) -> Self {
        Self {
            ticks_per_second,
            frame_interval: (ticks_per_second / frame_rate) as u64,
            position: 0,
        }
    }

    /// Translate a presentation timestamp to container ticks.
    ///
    /// A positive `pts_ms` is converted directly (`ms * ticks_per_second /
    /// 1000`) and repositions the running counter, so a later synthesized
    /// timestamp continues one frame interval after it. A non-positive value
    /// means "no timestamp supplied": the counter advances by one frame
    /// interval and the new position is returned.
    ///
    /// Known quirk, kept for compatibility: a legitimately-zero first
    /// timestamp is indistinguishable from "none" and will be synthesized.
    pub fn translate(&mut self, pts_ms: i64) -> u64 {
        if pts_ms > 0 {
            self.position = pts_ms as u64 * self.ticks_per_second as u64 / 1000;
        } else {
            self.position += self.frame_interval;
        }
        self.position
    }
}
