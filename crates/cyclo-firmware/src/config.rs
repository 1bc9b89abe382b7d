//! Bike settings baked in by `build.rs`

use cyclo_core::config::{OdometerConfig, TriggerEdge};
use log::warn;

/// Instrument configuration with any `.env` overrides applied
pub fn build_config() -> OdometerConfig {
    let mut config = OdometerConfig::default();

    if let Some(raw) = option_env!("CYCLO_WHEEL_DIAMETER_IN") {
        match raw.parse::<f32>() {
            Ok(inches) if inches > 0.0 => config = config.with_wheel_diameter_in(inches),
            _ => warn!("Ignoring CYCLO_WHEEL_DIAMETER_IN={}", raw),
        }
    }

    if let Some(raw) = option_env!("CYCLO_DEBOUNCE_MS") {
        match raw.parse::<u32>() {
            Ok(ms) => config = config.with_debounce_ms(ms),
            Err(_) => warn!("Ignoring CYCLO_DEBOUNCE_MS={}", raw),
        }
    }

    if let Some(raw) = option_env!("CYCLO_TRIGGER_EDGE") {
        match TriggerEdge::parse(raw) {
            Some(edge) => config = config.with_trigger_edge(edge),
            None => warn!("Ignoring CYCLO_TRIGGER_EDGE={}", raw),
        }
    }

    config
}
