//! ESP32-S3 firmware-specific modules for cyclo
//!
//! This crate contains the hardware-specific code that cannot compile on
//! desktop targets: build-time bike settings, the SD-card backed odometer
//! storage, and the RTT frame output.

#![no_std]

pub mod config;
pub mod render;
pub mod sd_storage;
