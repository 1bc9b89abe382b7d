//! Desktop simulator for the cyclo instrument.
//!
//! Runs the real `cyclo-core` main loop against a synthetic rider. A
//! background thread plays the reed switch, including contact bounce, while
//! the main thread polls the instrument and prints each frame as log lines.
//! The odometer record lives in a file so restarts pick up where the last
//! run stopped.
//!
//! # Environment
//!
//! | Variable                  | Default             |
//! |---------------------------|---------------------|
//! | `CYCLO_WHEEL_DIAMETER_IN` | 21.5                |
//! | `CYCLO_DEBOUNCE_MS`       | 100                 |
//! | `CYCLO_TRIGGER_EDGE`      | falling             |
//! | `CYCLO_SIM_SECONDS`       | 20                  |
//! | `CYCLO_SIM_STATE`         | cyclo-odometer.bin  |
//!
//! Set `RUST_LOG=debug` to see individual triggers.

use std::convert::Infallible;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, error, info, warn};

use cyclo_core::app_state::Instrument;
use cyclo_core::config::{OdometerConfig, TriggerEdge};
use cyclo_core::display::{RenderSnapshot, Renderer};
use cyclo_core::sensors::WheelSensor;
use cyclo_core::storage::NvStorage;

// ---------------------------------------------------------------------------
// Timing constants
// ---------------------------------------------------------------------------

/// Main loop pass period.
const LOOP_PERIOD: Duration = Duration::from_millis(5);

/// Contact bounce following every fifth wheel edge.
const BOUNCE_DELAY: Duration = Duration::from_millis(3);

/// Rider accelerates for this long, cruises, then stops.
const ACCEL_SECS: f32 = 8.0;
const CRUISE_SECS: f32 = 4.0;
const CRUISE_SPEED_FPS: f32 = 20.0;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Odometer storage backed by a file on disk.
///
/// Bytes past the end of the file read as zero, which fails the version
/// tag check on a first run.
struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NvStorage for FileStorage {
    type Error = io::Error;

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        buf.fill(0);
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        file.seek(SeekFrom::Start(u64::from(offset)))?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), Self::Error> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)?;
        file.seek(SeekFrom::Start(u64::from(offset)))?;
        file.write_all(data)?;
        file.sync_all()
    }
}

/// Status LED that only reports its state in the log.
#[derive(Default)]
struct LogLed;

impl ErrorType for LogLed {
    type Error = Infallible;
}

impl OutputPin for LogLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        debug!("LED off");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        debug!("LED on");
        Ok(())
    }
}

/// Prints frames in the layout of the 128x64 panel, one log line per row.
struct LogRenderer;

impl Renderer for LogRenderer {
    type Error = Infallible;

    fn render(&mut self, snapshot: &RenderSnapshot) -> Result<(), Self::Error> {
        let (hours, minutes, seconds) = snapshot.elapsed_hms();
        info!(
            "{} {:>3}:{:02}:{:02} | ft/s {:7.2} | ft {:8.2} | mph {:7.4} | mi {:7.4} | rpm {} {:7.2}",
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

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparsable {}={:?}", name, raw);
            None
        }
    }
}

fn config_from_env() -> OdometerConfig {
    let mut config = OdometerConfig::default();
    if let Some(inches) = env_parse::<f32>("CYCLO_WHEEL_DIAMETER_IN") {
        config = config.with_wheel_diameter_in(inches);
    }
    if let Some(ms) = env_parse::<u32>("CYCLO_DEBOUNCE_MS") {
        config = config.with_debounce_ms(ms);
    }
    if let Ok(edge) = std::env::var("CYCLO_TRIGGER_EDGE") {
        match TriggerEdge::parse(&edge) {
            Some(edge) => config = config.with_trigger_edge(edge),
            None => warn!("Ignoring unknown trigger edge {:?}", edge),
        }
    }
    config
}

// ---------------------------------------------------------------------------
// Synthetic rider
// ---------------------------------------------------------------------------

/// Ground speed of the simulated rider `t` seconds into the run.
fn rider_speed_fps(t: f32) -> f32 {
    if t < ACCEL_SECS {
        CRUISE_SPEED_FPS * (t / ACCEL_SECS)
    } else if t < ACCEL_SECS + CRUISE_SECS {
        CRUISE_SPEED_FPS
    } else {
        0.0
    }
}

/// Plays the reed switch until `stop` is set.
fn ride(sensor: &WheelSensor, start: Instant, stop: &AtomicBool) {
    let now_ms = || start.elapsed().as_millis() as u64;
    let mut edges: u32 = 0;

    while !stop.load(Ordering::Relaxed) {
        let speed = rider_speed_fps(start.elapsed().as_secs_f32());
        if speed < 0.5 {
            thread::sleep(Duration::from_millis(50));
            continue;
        }

        let gap = Duration::from_secs_f32(sensor.distance_per_trigger_ft() / speed);
        thread::sleep(gap);
        sensor.on_edge(now_ms());
        edges += 1;

        if edges % 5 == 0 {
            thread::sleep(BOUNCE_DELAY);
            sensor.on_edge(now_ms());
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config_from_env();
    let run_for = Duration::from_secs(env_parse("CYCLO_SIM_SECONDS").unwrap_or(20));
    let state_path: PathBuf = env_parse("CYCLO_SIM_STATE").unwrap_or_else(|| "cyclo-odometer.bin".into());
    info!("Odometer state file: {}", state_path.display());

    let sensor = WheelSensor::new(&config);
    let start = Instant::now();
    let now_ms = || start.elapsed().as_millis() as u64;
    let stop = AtomicBool::new(false);

    let mut instrument = match Instrument::start(
        config,
        &sensor,
        FileStorage::new(state_path),
        LogLed,
        now_ms(),
    ) {
        Ok(instrument) => instrument,
        Err(e) => {
            error!("Startup failed: {}", e);
            return;
        }
    };
    let mut renderer = LogRenderer;

    thread::scope(|scope| {
        scope.spawn(|| ride(&sensor, start, &stop));

        while start.elapsed() < run_for {
            if let Err(e) = instrument.poll(now_ms(), &mut renderer) {
                match e {}
            }
            thread::sleep(LOOP_PERIOD);
        }
        stop.store(true, Ordering::Relaxed);
    });

    match instrument.save_now() {
        Ok(()) => info!("Final odometer saved"),
        Err(e) => error!("Final save failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyclo_core::storage::{LoadOutcome, PersistedRecord, PersistenceManager};

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cyclo-sim-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let mut pm = PersistenceManager::new(FileStorage::new(temp_path("missing")), 0);
        assert!(matches!(pm.load().unwrap(), LoadOutcome::Defaults(_)));
    }

    #[test]
    fn test_file_round_trip_at_offset() {
        let path = temp_path("round-trip");
        let record = PersistedRecord::new(777.25, 123_456);

        let mut pm = PersistenceManager::new(FileStorage::new(path.clone()), 32);
        pm.save_now(&record).unwrap();

        let mut reopened = PersistenceManager::new(FileStorage::new(path.clone()), 32);
        assert_eq!(reopened.load().unwrap(), LoadOutcome::Restored(record));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 48);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_rider_profile_stops() {
        assert_eq!(rider_speed_fps(0.0), 0.0);
        assert_eq!(rider_speed_fps(ACCEL_SECS + 1.0), CRUISE_SPEED_FPS);
        assert_eq!(rider_speed_fps(ACCEL_SECS + CRUISE_SECS + 1.0), 0.0);
    }
}
