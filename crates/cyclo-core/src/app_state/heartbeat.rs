use embedded_hal::digital::{OutputPin, PinState};
use log::warn;

use super::AppState;
use crate::scheduler::TaskTick;

/// Name the heartbeat is registered under
pub const HEARTBEAT_TASK: &str = "heartbeat";

/// Periodic housekeeping: advance device uptime by the real elapsed time,
/// zero a stale speed, blink the status LED and ask for a redraw.
pub fn heartbeat<L: OutputPin>(state: &mut AppState<'_, L>, tick: TaskTick) {
    state.elapsed_ms = state.elapsed_ms.saturating_add(tick.delta_ms);
    state
        .sensor
        .decay_if_stale(tick.now_ms, state.stale_timeout_ms);

    state.led_on = !state.led_on;
    if let Err(e) = state.status_led.set_state(PinState::from(state.led_on)) {
        warn!("Status LED write failed: {:?}", e);
    }

    state.sensor.mark_dirty();
}
