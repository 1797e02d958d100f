use foundation::time::Time;

/// Frame metadata handed to anything that animates.
///
/// Host event loops deliver frames at irregular intervals, so `dt_s` varies per
/// frame; `time` is the running sum of all deltas so far.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds elapsed since the previous frame.
    pub dt_s: f64,
    /// Engine time at the end of this frame (seconds).
    pub time: Time,
}

impl Frame {
    pub fn first() -> Self {
        Self {
            index: 0,
            dt_s: 0.0,
            time: Time(0.0),
        }
    }

    /// Produces the next frame. Negative or non-finite deltas count as zero.
    pub fn advance(self, dt_s: f64) -> Self {
        let dt_s = if dt_s.is_finite() { dt_s.max(0.0) } else { 0.0 };
        Self {
            index: self.index + 1,
            dt_s,
            time: Time(self.time.0 + dt_s),
        }
    }
}
