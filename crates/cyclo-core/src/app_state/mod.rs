//! Application state for the instrument
//!
//! [`Instrument`] is the one context object the main loop owns: the
//! heartbeat's [`AppState`], the scheduler that drives it and the
//! persistence manager. The only thing shared with the edge context is the
//! borrowed [`WheelSensor`].

mod heartbeat;

pub use heartbeat::{HEARTBEAT_TASK, heartbeat};

use embedded_hal::digital::OutputPin;
use log::{error, info};
use thiserror_no_std::Error;

use crate::config::OdometerConfig;
use crate::display::{RenderSnapshot, Renderer};
use crate::scheduler::{Scheduler, SchedulerError};
use crate::sensors::WheelSensor;
use crate::storage::{LoadOutcome, NvStorage, PersistError, PersistedRecord, PersistenceManager};

/// Capacity of the task table
pub const MAX_TASKS: usize = 2;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Task registration failed: {0}")]
    Scheduler(SchedulerError),
}

/// State the periodic tasks operate on
pub struct AppState<'a, L> {
    sensor: &'a WheelSensor,
    status_led: L,
    led_on: bool,
    elapsed_ms: u64,
    stale_timeout_ms: u32,
}

impl<'a, L> AppState<'a, L> {
    pub fn new(sensor: &'a WheelSensor, status_led: L, elapsed_ms: u64, stale_timeout_ms: u32) -> Self {
        Self {
            sensor,
            status_led,
            led_on: false,
            elapsed_ms,
            stale_timeout_ms,
        }
    }

    pub fn sensor(&self) -> &'a WheelSensor {
        self.sensor
    }

    /// Device uptime accumulated across power cycles (ms)
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub const fn led_on(&self) -> bool {
        self.led_on
    }

    pub fn status_led(&self) -> &L {
        &self.status_led
    }
}

/// The instrument's main-loop context
pub struct Instrument<'a, S, L> {
    config: OdometerConfig,
    state: AppState<'a, L>,
    scheduler: Scheduler<AppState<'a, L>, MAX_TASKS>,
    persistence: PersistenceManager<S>,
}

impl<'a, S, L> Instrument<'a, S, L>
where
    S: NvStorage,
    L: OutputPin,
{
    /// Restore the odometer from `storage` and register the heartbeat.
    ///
    /// An unreadable or foreign record is logged and the odometer starts
    /// from zero.
    pub fn start(
        config: OdometerConfig,
        sensor: &'a WheelSensor,
        storage: S,
        status_led: L,
        now_ms: u64,
    ) -> Result<Self, AppError> {
        info!("Starting...");

        let mut persistence = PersistenceManager::new(storage, config.record_offset);
        let elapsed_ms = match persistence.load() {
            Ok(LoadOutcome::Restored(record)) => {
                sensor.restore_distance(record.distance_ft);
                persistence.note_restored(record.elapsed_ms);
                record.elapsed_ms
            }
            Ok(LoadOutcome::Defaults(_)) => 0,
            Err(e) => {
                error!("Odometer load failed: {}", e);
                0
            }
        };

        let mut scheduler = Scheduler::new();
        scheduler
            .register(
                HEARTBEAT_TASK,
                config.heartbeat_interval_ms,
                heartbeat::<L>,
                now_ms,
            )
            .map_err(AppError::Scheduler)?;

        info!(
            "Wheel {} in, {} ms debounce on {} edge",
            config.wheel_diameter_in,
            config.debounce_ms,
            config.trigger_edge.label()
        );

        Ok(Self {
            config,
            state: AppState::new(sensor, status_led, elapsed_ms, config.stale_timeout_ms),
            scheduler,
            persistence,
        })
    }

    /// One main-loop pass: run due tasks, then redraw if anything changed.
    ///
    /// Saving is checked on the redraw path. Returns true when a frame was
    /// rendered; a failed render leaves the refresh pending.
    pub fn poll<R: Renderer>(&mut self, now_ms: u64, renderer: &mut R) -> Result<bool, R::Error> {
        self.scheduler.run_pending(&mut self.state, now_ms);

        let Some(wheel) = self.state.sensor.take_if_dirty() else {
            return Ok(false);
        };

        if let Err(e) = self
            .persistence
            .maybe_save(wheel.motion.distance_ft(), self.state.elapsed_ms)
        {
            error!("Odometer save failed: {}", e);
        }

        let snapshot = RenderSnapshot::new(
            &wheel,
            self.config.circumference_ft(),
            self.state.elapsed_ms,
            self.state.led_on,
        );
        if let Err(e) = renderer.render(&snapshot) {
            self.state.sensor.mark_dirty();
            return Err(e);
        }
        Ok(true)
    }

    /// Write the current odometer and uptime regardless of the save schedule.
    pub fn save_now(&mut self) -> Result<(), PersistError<S::Error>> {
        let distance_ft = self.state.sensor.snapshot().motion.distance_ft();
        self.persistence
            .save_now(&PersistedRecord::new(distance_ft, self.state.elapsed_ms))
    }

    /// Current frame contents without touching the refresh flag
    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot::new(
            &self.state.sensor.snapshot(),
            self.config.circumference_ft(),
            self.state.elapsed_ms,
            self.state.led_on,
        )
    }

    pub const fn config(&self) -> &OdometerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState<'a, L> {
        &self.state
    }

    pub fn scheduler(&self) -> &Scheduler<AppState<'a, L>, MAX_TASKS> {
        &self.scheduler
    }

    pub fn persistence(&self) -> &PersistenceManager<S> {
        &self.persistence
    }

    pub fn persistence_mut(&mut self) -> &mut PersistenceManager<S> {
        &mut self.persistence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{RECORD_LEN, RamStorage};
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    const MIN: u64 = 60 * 1000;

    #[derive(Default)]
    struct MockLed {
        high: bool,
        writes: u32,
    }

    impl ErrorType for MockLed {
        type Error = Infallible;
    }

    impl OutputPin for MockLed {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockRenderer {
        frames: u32,
        last: Option<RenderSnapshot>,
        fail: bool,
    }

    impl Renderer for MockRenderer {
        type Error = ();

        fn render(&mut self, snapshot: &RenderSnapshot) -> Result<(), Self::Error> {
            if self.fail {
                return Err(());
            }
            self.frames += 1;
            self.last = Some(*snapshot);
            Ok(())
        }
    }

    fn storage_with(record: PersistedRecord) -> RamStorage<RECORD_LEN> {
        let mut storage = RamStorage::new();
        storage.as_bytes_mut().copy_from_slice(&record.to_bytes());
        storage
    }

    #[test]
    fn test_first_boot_uses_defaults_and_renders() {
        let wheel = WheelSensor::new(&OdometerConfig::default());
        let mut instrument = Instrument::start(
            OdometerConfig::default(),
            &wheel,
            RamStorage::<RECORD_LEN>::new(),
            MockLed::default(),
            0,
        )
        .unwrap();
        let mut renderer = MockRenderer::default();

        assert!(instrument.poll(1, &mut renderer).unwrap());
        let frame = renderer.last.unwrap();
        assert_eq!(frame.distance_ft, 0.0);
        assert_eq!(frame.elapsed_ms, 0);

        // Nothing changed since
        assert!(!instrument.poll(2, &mut renderer).unwrap());
        assert_eq!(instrument.scheduler().tasks()[0].name(), HEARTBEAT_TASK);
    }

    #[test]
    fn test_restores_stored_record() {
        let wheel = WheelSensor::new(&OdometerConfig::default());
        let instrument = Instrument::start(
            OdometerConfig::default(),
            &wheel,
            storage_with(PersistedRecord::new(5280.0, 2 * MIN)),
            MockLed::default(),
            0,
        )
        .unwrap();

        assert_eq!(wheel.snapshot().motion.distance_ft(), 5280.0);
        assert_eq!(instrument.state().elapsed_ms(), 2 * MIN);
    }

    #[test]
    fn test_foreign_record_is_ignored() {
        let mut record = PersistedRecord::new(5280.0, 2 * MIN);
        record.version_tag = *b"004\0";
        let wheel = WheelSensor::new(&OdometerConfig::default());
        let instrument = Instrument::start(
            OdometerConfig::default(),
            &wheel,
            storage_with(record),
            MockLed::default(),
            0,
        )
        .unwrap();

        assert_eq!(wheel.snapshot().motion.distance_ft(), 0.0);
        assert_eq!(instrument.state().elapsed_ms(), 0);
    }

    #[test]
    fn test_heartbeat_accumulates_actual_delta_and_blinks() {
        let wheel = WheelSensor::new(&OdometerConfig::default());
        let mut instrument = Instrument::start(
            OdometerConfig::default(),
            &wheel,
            RamStorage::<RECORD_LEN>::new(),
            MockLed::default(),
            0,
        )
        .unwrap();
        let mut renderer = MockRenderer::default();

        instrument.poll(100, &mut renderer).unwrap();
        assert!(instrument.poll(530, &mut renderer).unwrap());
        assert_eq!(instrument.state().elapsed_ms(), 530);
        assert!(instrument.state().led_on());
        assert!(instrument.state().status_led().high);
        assert!(renderer.last.unwrap().led_on);

        instrument.poll(1100, &mut renderer).unwrap();
        assert_eq!(instrument.state().elapsed_ms(), 1100);
        assert!(!instrument.state().status_led().high);
        assert_eq!(instrument.state().status_led().writes, 2);
    }

    #[test]
    fn test_speed_decays_through_heartbeat() {
        let wheel = WheelSensor::new(&OdometerConfig::default());
        let mut instrument = Instrument::start(
            OdometerConfig::default(),
            &wheel,
            RamStorage::<RECORD_LEN>::new(),
            MockLed::default(),
            0,
        )
        .unwrap();
        let mut renderer = MockRenderer::default();

        wheel.on_edge(0);
        wheel.on_edge(500);
        instrument.poll(510, &mut renderer).unwrap();
        assert!(renderer.last.unwrap().speed_fps > 5.0);

        let mut now = 510;
        while now < 6000 {
            now += 500;
            instrument.poll(now, &mut renderer).unwrap();
        }
        assert_eq!(renderer.last.unwrap().speed_fps, 0.0);
        assert!(renderer.last.unwrap().distance_ft > 5.0);
    }

    #[test]
    fn test_saves_on_half_hour_boundary() {
        let wheel = WheelSensor::new(&OdometerConfig::default());
        let mut instrument = Instrument::start(
            OdometerConfig::default(),
            &wheel,
            storage_with(PersistedRecord::new(100.0, 30 * MIN - 500)),
            MockLed::default(),
            0,
        )
        .unwrap();
        let mut renderer = MockRenderer::default();

        instrument.poll(10, &mut renderer).unwrap();
        assert_eq!(instrument.persistence().storage().writes(), 0);

        instrument.poll(500, &mut renderer).unwrap();
        assert_eq!(instrument.state().elapsed_ms(), 30 * MIN);
        assert_eq!(instrument.persistence().storage().writes(), 1);

        // Next heartbeat lands in the same second and must not write again
        instrument.poll(1000, &mut renderer).unwrap();
        assert_eq!(instrument.persistence().storage().writes(), 1);

        let stored = PersistedRecord::from_bytes(
            instrument.persistence().storage().as_bytes(),
            crate::storage::VERSION_TAG,
        )
        .unwrap();
        assert_eq!(stored.elapsed_ms, 30 * MIN);
        assert_eq!(stored.distance_ft, 100.0);
    }

    #[test]
    fn test_power_cycle_does_not_rewrite_record() {
        let wheel = WheelSensor::new(&OdometerConfig::default());
        let mut instrument = Instrument::start(
            OdometerConfig::default(),
            &wheel,
            storage_with(PersistedRecord::new(100.0, 30 * MIN + 250)),
            MockLed::default(),
            0,
        )
        .unwrap();
        let mut renderer = MockRenderer::default();

        assert!(instrument.poll(1, &mut renderer).unwrap());
        assert_eq!(instrument.persistence().storage().writes(), 0);

        // Next heartbeat is still inside the restored save second
        instrument.poll(500, &mut renderer).unwrap();
        assert_eq!(instrument.state().elapsed_ms(), 30 * MIN + 750);
        assert_eq!(instrument.persistence().storage().writes(), 0);
    }

    #[test]
    fn test_failed_render_stays_pending() {
        let wheel = WheelSensor::new(&OdometerConfig::default());
        let mut instrument = Instrument::start(
            OdometerConfig::default(),
            &wheel,
            RamStorage::<RECORD_LEN>::new(),
            MockLed::default(),
            0,
        )
        .unwrap();
        let mut renderer = MockRenderer {
            fail: true,
            ..Default::default()
        };

        assert!(instrument.poll(1, &mut renderer).is_err());
        assert!(wheel.is_dirty());

        renderer.fail = false;
        assert!(instrument.poll(2, &mut renderer).unwrap());
        assert_eq!(renderer.frames, 1);
    }

    #[test]
    fn test_save_now_round_trip() {
        let wheel = WheelSensor::new(&OdometerConfig::default());
        let mut instrument = Instrument::start(
            OdometerConfig::default(),
            &wheel,
            RamStorage::<RECORD_LEN>::new(),
            MockLed::default(),
            0,
        )
        .unwrap();
        let mut renderer = MockRenderer::default();

        wheel.on_edge(0);
        wheel.on_edge(400);
        instrument.poll(700, &mut renderer).unwrap();
        instrument.save_now().unwrap();
        let before = instrument.snapshot();

        match instrument.persistence_mut().load().unwrap() {
            LoadOutcome::Restored(record) => {
                assert_eq!(record.distance_ft.to_bits(), before.distance_ft.to_bits());
                assert_eq!(record.elapsed_ms, before.elapsed_ms);
            }
            other => panic!("expected restored record, got {:?}", other),
        }
    }
}
