//! Speed and distance estimation from wheel triggers

/// Wheel motion derived from accepted triggers.
///
/// Distance only ever grows and speed is never negative. Both are in
/// feet and feet/second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionState {
    previous_trigger_ms: Option<u64>,
    last_trigger_ms: Option<u64>,
    speed_fps: f32,
    distance_ft: f32,
}

impl MotionState {
    pub const fn new() -> Self {
        Self {
            previous_trigger_ms: None,
            last_trigger_ms: None,
            speed_fps: 0.0,
            distance_ft: 0.0,
        }
    }

    /// Start from an odometer reading restored from storage.
    pub const fn with_distance(distance_ft: f32) -> Self {
        let mut state = Self::new();
        state.distance_ft = distance_ft;
        state
    }

    /// Record an accepted trigger at `now_ms`.
    ///
    /// Adds one trigger's worth of distance. Speed is computed from the
    /// interval to the previous trigger; the very first trigger after boot
    /// has no interval and leaves speed at zero, since boot time says nothing
    /// about where the wheel was. Returns the interval used.
    pub fn record_trigger(&mut self, now_ms: u64, distance_per_trigger_ft: f32) -> Option<u64> {
        let interval_ms = self
            .last_trigger_ms
            .map(|last| now_ms.saturating_sub(last))
            .filter(|interval| *interval > 0);

        self.previous_trigger_ms = self.last_trigger_ms;
        self.last_trigger_ms = Some(now_ms);
        self.distance_ft += distance_per_trigger_ft;

        if let Some(interval) = interval_ms {
            self.speed_fps = distance_per_trigger_ft / (interval as f32 / 1000.0);
        }

        interval_ms
    }

    /// Force speed to zero when no trigger arrived for longer than
    /// `timeout_ms`. Returns true when the speed was changed.
    pub fn decay_if_stale(&mut self, now_ms: u64, timeout_ms: u32) -> bool {
        let stale = match self.last_trigger_ms {
            Some(last) => now_ms.saturating_sub(last) > u64::from(timeout_ms),
            None => true,
        };

        if stale && self.speed_fps != 0.0 {
            self.speed_fps = 0.0;
            return true;
        }
        false
    }

    pub fn set_distance_ft(&mut self, distance_ft: f32) {
        self.distance_ft = distance_ft;
    }

    pub const fn previous_trigger_ms(&self) -> Option<u64> {
        self.previous_trigger_ms
    }

    pub const fn last_trigger_ms(&self) -> Option<u64> {
        self.last_trigger_ms
    }

    pub const fn speed_fps(&self) -> f32 {
        self.speed_fps
    }

    pub const fn distance_ft(&self) -> f32 {
        self.distance_ft
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self::new()
    }
}
