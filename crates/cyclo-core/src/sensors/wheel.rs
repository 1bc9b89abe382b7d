//! Wheel trigger capture
//!
//! The reed switch is serviced from a context that interrupts the main loop
//! at arbitrary points. All state it shares with the main loop sits in one
//! critical-section mutex, and every access copies in or out as a unit so a
//! reader never sees half of an update.

use core::cell::RefCell;
use core::convert::Infallible;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal_async::digital::Wait;
use log::debug;

use super::motion::MotionState;
use crate::config::{OdometerConfig, TriggerEdge};

/// Glyphs cycled once per sensor edge, debounced or not
pub const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Result of feeding one sensor edge to the capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Edge accepted; carries the interval to the previous trigger if any
    Accepted { interval_ms: Option<u64> },
    /// Edge arrived inside the debounce window and was dropped
    Debounced,
}

/// Consistent copy of the shared wheel state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSnapshot {
    pub motion: MotionState,
    pub spinner_index: u8,
}

impl WheelSnapshot {
    pub const fn spinner(&self) -> char {
        SPINNER[self.spinner_index as usize % SPINNER.len()]
    }
}

struct Shared {
    motion: MotionState,
    spinner_index: u8,
    dirty: bool,
}

/// Debounced wheel sensor shared between the edge handler and the main loop
pub struct WheelSensor {
    shared: Mutex<CriticalSectionRawMutex, RefCell<Shared>>,
    debounce_ms: u32,
    distance_per_trigger_ft: f32,
}

impl WheelSensor {
    /// Create a sensor. It starts dirty so the first loop pass renders.
    pub const fn new(config: &OdometerConfig) -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                motion: MotionState::new(),
                spinner_index: 0,
                dirty: true,
            })),
            debounce_ms: config.debounce_ms,
            distance_per_trigger_ft: config.distance_per_trigger_ft(),
        }
    }

    /// Handle one sensor edge observed at `now_ms`.
    pub fn on_edge(&self, now_ms: u64) -> TriggerOutcome {
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            shared.spinner_index = (shared.spinner_index + 1) % SPINNER.len() as u8;

            if let Some(last) = shared.motion.last_trigger_ms()
                && now_ms.saturating_sub(last) < u64::from(self.debounce_ms)
            {
                return TriggerOutcome::Debounced;
            }

            let interval_ms = shared
                .motion
                .record_trigger(now_ms, self.distance_per_trigger_ft);
            shared.dirty = true;
            TriggerOutcome::Accepted { interval_ms }
        })
    }

    /// Re-apply the staleness rule. Returns true if speed dropped to zero.
    pub fn decay_if_stale(&self, now_ms: u64, timeout_ms: u32) -> bool {
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            let changed = shared.motion.decay_if_stale(now_ms, timeout_ms);
            if changed {
                shared.dirty = true;
            }
            changed
        })
    }

    pub fn snapshot(&self) -> WheelSnapshot {
        self.shared.lock(|cell| {
            let shared = cell.borrow();
            WheelSnapshot {
                motion: shared.motion,
                spinner_index: shared.spinner_index,
            }
        })
    }

    /// Read and clear the refresh flag together with the state it covers.
    pub fn take_if_dirty(&self) -> Option<WheelSnapshot> {
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            if !shared.dirty {
                return None;
            }
            shared.dirty = false;
            Some(WheelSnapshot {
                motion: shared.motion,
                spinner_index: shared.spinner_index,
            })
        })
    }

    pub fn mark_dirty(&self) {
        self.shared.lock(|cell| cell.borrow_mut().dirty = true);
    }

    pub fn is_dirty(&self) -> bool {
        self.shared.lock(|cell| cell.borrow().dirty)
    }

    /// Seed the odometer with a value restored from storage.
    pub fn restore_distance(&self, distance_ft: f32) {
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            shared.motion.set_distance_ft(distance_ft);
            shared.dirty = true;
        });
    }

    pub const fn debounce_ms(&self) -> u32 {
        self.debounce_ms
    }

    pub const fn distance_per_trigger_ft(&self) -> f32 {
        self.distance_per_trigger_ft
    }
}

/// Feed edges from `pin` into `sensor` forever.
///
/// Only returns when the pin reports an error. `now_ms` must be a
/// monotonic millisecond clock.
pub async fn run_capture<P, C>(
    pin: &mut P,
    edge: TriggerEdge,
    sensor: &WheelSensor,
    now_ms: C,
) -> Result<Infallible, P::Error>
where
    P: Wait,
    C: Fn() -> u64,
{
    loop {
        match edge {
            TriggerEdge::Rising => pin.wait_for_rising_edge().await?,
            TriggerEdge::Falling => pin.wait_for_falling_edge().await?,
        }

        let now = now_ms();
        match sensor.on_edge(now) {
            TriggerOutcome::Accepted { interval_ms } => {
                debug!("Trigger at {} ms (interval {:?} ms)", now, interval_ms);
            }
            TriggerOutcome::Debounced => {}
        }
    }
}
