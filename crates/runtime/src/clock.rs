/// Derives per-tick deltas from the host's running elapsed time.
///
/// The host reports seconds since the loop started; the clock remembers the
/// previous reading. The first reading is measured against 0 and a reading
/// that goes backwards yields a zero delta.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    previous_elapsed: f64,
    current_elapsed: f64,
}

impl FrameClock {
    /// Clock at elapsed time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all readings.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record a new reading and return the delta since the previous one.
    pub fn advance(&mut self, elapsed: f64) -> f32 {
        self.previous_elapsed = self.current_elapsed;
        if elapsed.is_finite() && elapsed > self.current_elapsed {
            self.current_elapsed = elapsed;
        }
        self.delta()
    }

    /// Seconds between the last two readings.
    pub fn delta(&self) -> f32 {
        (self.current_elapsed - self.previous_elapsed) as f32
    }

    /// Latest accepted reading.
    pub fn elapsed(&self) -> f64 {
        self.current_elapsed
    }
}
