//! Hardware-independent core library for cyclo
//!
//! This crate contains all platform-agnostic logic for the cyclo wheel
//! speed and odometer instrument: debounced trigger capture, speed and
//! distance estimation, the cooperative heartbeat scheduler, and the
//! version-tagged odometer record kept in non-volatile storage.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3)
//! and desktop hosts (for the simulator and tests).

#![no_std]

pub mod app_state;
pub mod config;
pub mod display;
pub mod scheduler;
pub mod sensors;
pub mod storage;
pub mod units;
