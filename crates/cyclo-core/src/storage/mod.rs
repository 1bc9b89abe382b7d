//! Non-volatile odometer storage
//!
//! - [`record`]: fixed-width, version-tagged record encoding
//! - [`manager`]: load at startup and rate-limited saves
//! - [`ram`]: in-memory backend for tests and the simulator

pub mod manager;
pub mod ram;
pub mod record;

pub use manager::{LoadOutcome, PersistError, PersistenceManager};
pub use ram::{RamStorage, RamStorageError};
pub use record::{PersistedRecord, RECORD_LEN, RecordError, VERSION_TAG};

/// Byte-addressed non-volatile memory (EEPROM, flash page, file on a card)
///
/// Writes must be durable once `write` returns. Implementations report
/// hardware failures through `Error`; the core never retries.
pub trait NvStorage {
    type Error: core::fmt::Debug;

    /// Fill `buf` with the bytes stored at `offset`.
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Store `data` at `offset`.
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), Self::Error>;
}

impl<T: NvStorage + ?Sized> NvStorage for &mut T {
    type Error = T::Error;

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::read(self, offset, buf)
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), Self::Error> {
        T::write(self, offset, data)
    }
}
