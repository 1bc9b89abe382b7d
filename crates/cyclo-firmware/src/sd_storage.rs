use cyclo_core::storage::NvStorage;
use embedded_sdmmc::{
    Error, Mode, SdCard, SdCardError, TimeSource, Timestamp, VolumeIdx, VolumeManager,
};

/// File on the card holding the odometer record
pub const ODOMETER_FILE: &str = "ODOMETER.BIN";

/// The instrument has no wall clock; files are stamped with a fixed date.
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 56,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

/// Odometer storage in a single file on the SD card.
///
/// Offsets are byte positions inside [`ODOMETER_FILE`]. Every access opens
/// and closes the volume so the card is consistent if power drops between
/// writes.
pub struct SdCardStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: VolumeManager<SdCard<S, D>, T, 4, 4, 1>,
}

impl<S, D, T> SdCardStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    pub fn new(sd_card: SdCard<S, D>, ts: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(sd_card, ts),
        }
    }
}

impl<S, D, T> NvStorage for SdCardStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    type Error = Error<SdCardError>;

    /// A missing file or short read leaves zeros, which no valid record has
    /// as its tag.
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        buf.fill(0);

        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = match root_dir.open_file_in_dir(ODOMETER_FILE, Mode::ReadOnly) {
            Ok(file) => file,
            Err(Error::NotFound) => return Ok(()),
            Err(e) => return Err(e),
        };

        if offset < file.length() {
            file.seek_from_start(offset)?;
            let mut filled = 0;
            while filled < buf.len() {
                match file.read(&mut buf[filled..])? {
                    0 => break,
                    n => filled += n,
                }
            }
        }

        file.close()?;
        root_dir.close()?;
        volume0.close()?;
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), Self::Error> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = match root_dir.open_file_in_dir(ODOMETER_FILE, Mode::ReadWriteAppend) {
            Ok(file) => file,
            Err(Error::NotFound) => {
                root_dir.open_file_in_dir(ODOMETER_FILE, Mode::ReadWriteCreate)?
            }
            Err(e) => return Err(e),
        };

        // Pad a short file up to the record offset
        let zeros = [0u8; 16];
        while file.length() < offset {
            let missing = (offset - file.length()) as usize;
            file.write(&zeros[..missing.min(zeros.len())])?;
        }

        file.seek_from_start(offset)?;
        file.write(data)?;
        file.flush()?;

        file.close()?;
        root_dir.close()?;
        volume0.close()?;
        Ok(())
    }
}
