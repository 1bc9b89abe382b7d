use log::{info, warn};
use thiserror_no_std::Error;

use super::NvStorage;
use super::record::{PersistedRecord, RECORD_LEN, RecordError, VERSION_TAG};

/// Saves happen when device time hits a minute that is a multiple of this
pub const SAVE_EVERY_MINUTES: u64 = 30;

#[derive(Error, Debug)]
pub enum PersistError<E> {
    #[error("Storage access failed: {0:?}")]
    Storage(E),
}

/// What `load` found in storage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOutcome {
    /// Stored record was valid and should replace the defaults
    Restored(PersistedRecord),
    /// Stored record was rejected; keep the built-in defaults
    Defaults(RecordError),
}

/// Keeps the odometer record in non-volatile storage.
///
/// Non-volatile memory wears out, so saves are rate limited to device-time
/// instants whose minute component is a multiple of 30 and whose second
/// component is zero: roughly one write per half hour of uptime.
pub struct PersistenceManager<S> {
    storage: S,
    offset: u32,
    last_saved_second: Option<u64>,
}

impl<S: NvStorage> PersistenceManager<S> {
    pub const fn new(storage: S, offset: u32) -> Self {
        Self {
            storage,
            offset,
            last_saved_second: None,
        }
    }

    /// Read the stored record.
    ///
    /// A record with a foreign version tag is not an error: the outcome says
    /// to keep defaults. Only a failing storage device yields `Err`.
    pub fn load(&mut self) -> Result<LoadOutcome, PersistError<S::Error>> {
        let mut bytes = [0u8; RECORD_LEN];
        self.storage
            .read(self.offset, &mut bytes)
            .map_err(PersistError::Storage)?;

        match PersistedRecord::from_bytes(&bytes, VERSION_TAG) {
            Ok(record) => {
                info!(
                    "Loaded odometer record: {} ft, {} ms uptime",
                    record.distance_ft, record.elapsed_ms
                );
                Ok(LoadOutcome::Restored(record))
            }
            Err(e) => {
                warn!("Stored odometer record rejected ({}), using defaults", e);
                Ok(LoadOutcome::Defaults(e))
            }
        }
    }

    /// Save if `elapsed_ms` is at a save point not yet written.
    ///
    /// Returns true when a write happened.
    pub fn maybe_save(
        &mut self,
        distance_ft: f32,
        elapsed_ms: u64,
    ) -> Result<bool, PersistError<S::Error>> {
        if !is_save_point(elapsed_ms) {
            return Ok(false);
        }

        let second = elapsed_ms / 1000;
        if self.last_saved_second == Some(second) {
            return Ok(false);
        }

        self.save_now(&PersistedRecord::new(distance_ft, elapsed_ms))?;
        self.last_saved_second = Some(second);
        Ok(true)
    }

    /// Treat the save point a restored record was written at as already
    /// saved, so resuming from it does not write the same record again.
    pub fn note_restored(&mut self, elapsed_ms: u64) {
        if is_save_point(elapsed_ms) {
            self.last_saved_second = Some(elapsed_ms / 1000);
        }
    }

    /// Write `record` unconditionally, tag and fields in one write.
    pub fn save_now(&mut self, record: &PersistedRecord) -> Result<(), PersistError<S::Error>> {
        self.storage
            .write(self.offset, &record.to_bytes())
            .map_err(PersistError::Storage)?;
        info!(
            "Saved odometer record: {} ft, {} ms uptime",
            record.distance_ft, record.elapsed_ms
        );
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}

/// Minute component a multiple of 30 and second component exactly zero
pub const fn is_save_point(elapsed_ms: u64) -> bool {
    let secs = elapsed_ms / 1000;
    let minute = (secs / 60) % 60;
    let second = secs % 60;
    second == 0 && minute % SAVE_EVERY_MINUTES == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RamStorage;

    const MIN: u64 = 60 * 1000;

    fn manager() -> PersistenceManager<RamStorage<64>> {
        PersistenceManager::new(RamStorage::new(), 8)
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let mut pm = manager();
        let record = PersistedRecord::new(31_415.926, 5 * 60 * MIN + 123);
        pm.save_now(&record).unwrap();

        match pm.load().unwrap() {
            LoadOutcome::Restored(loaded) => {
                assert_eq!(loaded.distance_ft.to_bits(), record.distance_ft.to_bits());
                assert_eq!(loaded.elapsed_ms, record.elapsed_ms);
            }
            other => panic!("expected restored record, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_storage_keeps_defaults() {
        let mut pm = manager();
        assert_eq!(
            pm.load().unwrap(),
            LoadOutcome::Defaults(RecordError::VersionMismatch { found: [0xFF; 4] })
        );
    }

    #[test]
    fn test_altered_tag_keeps_defaults() {
        let mut pm = manager();
        pm.save_now(&PersistedRecord::new(500.0, 1000)).unwrap();
        pm.storage_mut().as_bytes_mut()[8 + 1] = b'4';

        assert!(matches!(
            pm.load().unwrap(),
            LoadOutcome::Defaults(RecordError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_record_written_at_offset() {
        let mut pm = manager();
        pm.save_now(&PersistedRecord::new(1.0, 2)).unwrap();
        let bytes = pm.storage().as_bytes();
        assert_eq!(&bytes[0..8], &[0xFF; 8]);
        assert_eq!(&bytes[8..12], b"005\0");
    }

    #[test]
    fn test_save_points() {
        assert!(is_save_point(0));
        assert!(is_save_point(30 * MIN));
        assert!(is_save_point(30 * MIN + 999));
        assert!(is_save_point(60 * MIN));
        assert!(is_save_point(90 * MIN + 500));
        assert!(!is_save_point(30 * MIN + 1000));
        assert!(!is_save_point(15 * MIN));
        assert!(!is_save_point(31 * MIN));
    }

    #[test]
    fn test_maybe_save_writes_once_per_save_point() {
        let mut pm = manager();

        assert!(!pm.maybe_save(10.0, 29 * MIN + 59_500).unwrap());
        assert!(pm.maybe_save(10.0, 30 * MIN).unwrap());
        assert!(!pm.maybe_save(12.0, 30 * MIN + 500).unwrap());
        assert!(!pm.maybe_save(12.0, 30 * MIN + 1000).unwrap());
        assert_eq!(pm.storage().writes(), 1);

        assert!(pm.maybe_save(99.0, 60 * MIN + 250).unwrap());
        assert_eq!(pm.storage().writes(), 2);
    }

    #[test]
    fn test_restored_save_point_is_not_rewritten() {
        let mut pm = manager();
        pm.note_restored(30 * MIN + 250);

        assert!(!pm.maybe_save(10.0, 30 * MIN + 750).unwrap());
        assert_eq!(pm.storage().writes(), 0);
        assert!(pm.maybe_save(10.0, 60 * MIN).unwrap());
    }

    #[test]
    fn test_note_restored_ignores_other_times() {
        let mut pm = manager();
        pm.note_restored(31 * MIN);
        assert!(pm.maybe_save(10.0, 30 * MIN).unwrap());
    }

    #[test]
    fn test_storage_failure_is_reported() {
        let mut pm = PersistenceManager::new(RamStorage::<4>::new(), 0);
        assert!(matches!(pm.load(), Err(PersistError::Storage(_))));
        assert!(pm.save_now(&PersistedRecord::default()).is_err());
    }
}
