//! Wheel rotation sensing
//!
//! - [`wheel`]: debounced trigger capture shared with the edge context
//! - [`motion`]: speed and distance estimation from accepted triggers

pub mod motion;
pub mod wheel;

pub use motion::MotionState;
pub use wheel::{SPINNER, TriggerOutcome, WheelSensor, WheelSnapshot, run_capture};
