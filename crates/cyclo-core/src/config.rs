//! Instrument configuration
//!
//! Every tunable the hardware revisions disagreed on lives here instead of
//! being hardwired: wheel size, sensor magnet count, debounce window and
//! trigger edge polarity. Firmware builds override the defaults at build
//! time, the simulator at runtime.

use core::f32::consts::PI;

/// Wheel diameter of the reference bike (inches)
pub const DEFAULT_WHEEL_DIAMETER_IN: f32 = 21.5;

/// Magnets passing the reed switch per wheel revolution
pub const DEFAULT_TRIGGERS_PER_REVOLUTION: u8 = 2;

/// Minimum spacing between accepted edges (ms)
pub const DEFAULT_DEBOUNCE_MS: u32 = 100;

/// Heartbeat task period (ms)
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u32 = 500;

/// Time without an accepted trigger after which speed reads zero (ms)
pub const STALE_TIMEOUT_MS: u32 = 5000;

/// Byte offset of the odometer record inside non-volatile storage
pub const DEFAULT_RECORD_OFFSET: u32 = 0;

/// Which transition of the sensor line counts as a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEdge {
    Rising,
    Falling,
}

impl TriggerEdge {
    /// Parse a polarity name as used in `.env` files and environment
    /// variables (`rising` / `falling`, case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("rising") {
            Some(Self::Rising)
        } else if value.eq_ignore_ascii_case("falling") {
            Some(Self::Falling)
        } else {
            None
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
        }
    }
}

/// Static configuration of one instrument
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometerConfig {
    pub wheel_diameter_in: f32,
    pub triggers_per_revolution: u8,
    pub debounce_ms: u32,
    pub trigger_edge: TriggerEdge,
    pub heartbeat_interval_ms: u32,
    pub stale_timeout_ms: u32,
    pub record_offset: u32,
}

impl OdometerConfig {
    pub const fn new() -> Self {
        Self {
            wheel_diameter_in: DEFAULT_WHEEL_DIAMETER_IN,
            triggers_per_revolution: DEFAULT_TRIGGERS_PER_REVOLUTION,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            trigger_edge: TriggerEdge::Falling,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            stale_timeout_ms: STALE_TIMEOUT_MS,
            record_offset: DEFAULT_RECORD_OFFSET,
        }
    }

    pub const fn with_wheel_diameter_in(mut self, inches: f32) -> Self {
        self.wheel_diameter_in = inches;
        self
    }

    pub const fn with_debounce_ms(mut self, debounce_ms: u32) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub const fn with_trigger_edge(mut self, edge: TriggerEdge) -> Self {
        self.trigger_edge = edge;
        self
    }

    /// Wheel circumference in feet
    pub const fn circumference_ft(&self) -> f32 {
        self.wheel_diameter_in * PI / 12.0
    }

    /// Distance covered between two consecutive triggers (feet)
    ///
    /// A zero magnet count is treated as one magnet.
    pub const fn distance_per_trigger_ft(&self) -> f32 {
        let triggers = if self.triggers_per_revolution == 0 {
            1
        } else {
            self.triggers_per_revolution
        };
        self.circumference_ft() / triggers as f32
    }
}

impl Default for OdometerConfig {
    fn default() -> Self {
        Self::new()
    }
}
