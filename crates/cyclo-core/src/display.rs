//! Values handed to the display collaborator
//!
//! Layout, fonts and the panel driver live outside the core. The core hands
//! over a [`RenderSnapshot`] whenever something changed and expects the
//! renderer to paint and flush it as one frame.

use crate::sensors::WheelSnapshot;
use crate::units;

/// Read-only copy of everything a frame shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSnapshot {
    pub speed_fps: f32,
    pub distance_ft: f32,
    pub rpm: f32,
    pub elapsed_ms: u64,
    pub spinner: char,
    pub led_on: bool,
}

impl RenderSnapshot {
    pub fn new(wheel: &WheelSnapshot, circumference_ft: f32, elapsed_ms: u64, led_on: bool) -> Self {
        let speed_fps = wheel.motion.speed_fps();
        Self {
            speed_fps,
            distance_ft: wheel.motion.distance_ft(),
            rpm: units::fps_to_rpm(speed_fps, circumference_ft),
            elapsed_ms,
            spinner: wheel.spinner(),
            led_on,
        }
    }

    pub fn mph(&self) -> f32 {
        units::fps_to_mph(self.speed_fps)
    }

    pub fn miles(&self) -> f32 {
        units::feet_to_miles(self.distance_ft)
    }

    /// Elapsed device time as (hours, minutes, seconds)
    pub const fn elapsed_hms(&self) -> (u64, u8, u8) {
        units::split_hms(self.elapsed_ms)
    }

    /// Liveness marker shown in the header
    pub const fn led_marker(&self) -> char {
        if self.led_on { '+' } else { ' ' }
    }
}

/// Something that can show a frame
pub trait Renderer {
    type Error: core::fmt::Debug;

    /// Paint `snapshot` and flush it. On error the frame is retried on the
    /// next loop pass.
    fn render(&mut self, snapshot: &RenderSnapshot) -> Result<(), Self::Error>;
}
