use thiserror_no_std::Error;

use super::NvStorage;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamStorageError {
    #[error("Access of {len} bytes at offset {offset} is out of bounds")]
    OutOfBounds { offset: u32, len: usize },
}

/// `N` bytes of RAM pretending to be erased EEPROM (all `0xFF`)
pub struct RamStorage<const N: usize> {
    bytes: [u8; N],
    writes: u32,
}

impl<const N: usize> RamStorage<N> {
    pub const fn new() -> Self {
        Self {
            bytes: [0xFF; N],
            writes: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; N] {
        &mut self.bytes
    }

    /// Number of successful writes so far
    pub const fn writes(&self) -> u32 {
        self.writes
    }

    fn range(offset: u32, len: usize) -> Result<core::ops::Range<usize>, RamStorageError> {
        let start = offset as usize;
        match start.checked_add(len) {
            Some(end) if end <= N => Ok(start..end),
            _ => Err(RamStorageError::OutOfBounds { offset, len }),
        }
    }
}

impl<const N: usize> Default for RamStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> NvStorage for RamStorage<N> {
    type Error = RamStorageError;

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        let range = Self::range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), Self::Error> {
        let range = Self::range(offset, data.len())?;
        self.bytes[range].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}
