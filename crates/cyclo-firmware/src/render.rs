use core::convert::Infallible;

use cyclo_core::display::{RenderSnapshot, Renderer};
use log::info;

/// Frame output over RTT until a panel driver is wired in
pub struct RttRenderer;

impl Renderer for RttRenderer {
    type Error = Infallible;

    fn render(&mut self, snapshot: &RenderSnapshot) -> Result<(), Self::Error> {
        let (hours, minutes, seconds) = snapshot.elapsed_hms();
        info!(
            "{} {}:{:02}:{:02} ft/s {:.2} ft {:.2} mph {:.4} mi {:.4} rpm {} {:.2}",
            snapshot.led_marker(),
            hours,
            minutes,
            seconds,
            snapshot.speed_fps,
            snapshot.distance_ft,
            snapshot.mph(),
            snapshot.miles(),
            snapshot.spinner,
            snapshot.rpm,
        );
        Ok(())
    }
}
