//! Flash-backed key-value store
//!
//! The core [`NorFlashStore`] on the `nvs` data partition. esp-storage is
//! blocking; `BlockingAsync` gives it the async `NorFlash` interface the map
//! expects.

use core::ops::Range;

use embassy_embedded_hal::adapter::BlockingAsync;
use envclock_core::storage::NorFlashStore;
use esp_hal::peripherals::FLASH;
use esp_storage::FlashStorage;

/// The `nvs` partition of the default partition table: 0x9000, six 4 KiB
/// sectors.
const NVS_RANGE: Range<u32> = 0x9000..0xF000;

pub type FlashStore = NorFlashStore<BlockingAsync<FlashStorage<'static>>>;

pub fn flash_store(flash: FLASH<'static>) -> FlashStore {
    NorFlashStore::new(BlockingAsync::new(FlashStorage::new(flash)), NVS_RANGE)
}
