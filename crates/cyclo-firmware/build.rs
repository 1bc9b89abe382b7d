//! Bakes per-bike settings from an optional `.env` file into the firmware.
//!
//! Recognised keys: `CYCLO_WHEEL_DIAMETER_IN`, `CYCLO_DEBOUNCE_MS`,
//! `CYCLO_TRIGGER_EDGE` (`rising` or `falling`). Missing keys fall back to
//! the defaults in `cyclo_core::config`.

const KEYS: [&str; 3] = [
    "CYCLO_WHEEL_DIAMETER_IN",
    "CYCLO_DEBOUNCE_MS",
    "CYCLO_TRIGGER_EDGE",
];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for key in KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            panic!("Failed to read .env: {e}");
        }
    }

    for key in KEYS {
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
