//! Wear-levelled key-value store on a NOR flash range
//!
//! Records live in a `sequential-storage` map; a [`StoreKey::Format`] record
//! carries the layout version so a partition written by newer firmware is
//! detected and erased instead of misread.

use core::ops::Range;

use embedded_storage_async::nor_flash::{NorFlash, NorFlashError};
use log::{debug, error};
use sequential_storage::Error;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

use super::{CONFIG_MAX_LEN, KeyValueStore, StoreError, StoreKey};

/// Layout version written to fresh partitions.
pub const FORMAT_VERSION: u8 = 1;

/// Scratch space for one record: key, value and item header.
const DATA_BUFFER_LEN: usize = CONFIG_MAX_LEN + 32;

pub struct NorFlashStore<F> {
    flash: F,
    range: Range<u32>,
}

impl<F: NorFlash> NorFlashStore<F> {
    /// `range` must be aligned to the flash erase size and span at least two
    /// erase pages.
    pub fn new(flash: F, range: Range<u32>) -> Self {
        Self { flash, range }
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }
}

fn map_error<E: core::fmt::Debug>(err: Error<E>) -> StoreError {
    match err {
        Error::FullStorage => StoreError::NoFreePages,
        Error::Corrupted { .. } => StoreError::NewVersionFound,
        Error::Storage { value, .. } => {
            error!("Flash access failed: {:?}", value);
            StoreError::Flash
        }
        other => {
            error!("Store record rejected: {:?}", other);
            StoreError::Encoding
        }
    }
}

impl<F: NorFlash> KeyValueStore for NorFlashStore<F> {
    async fn open(&mut self) -> Result<(), StoreError> {
        let mut data_buffer = [0u8; DATA_BUFFER_LEN];
        let stored = map::fetch_item::<StoreKey, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &StoreKey::Format,
        )
        .await
        .map_err(map_error)?;

        match stored {
            Some(&[version]) if version <= FORMAT_VERSION => {
                debug!("Store open, format v{}", version);
                Ok(())
            }
            Some(_) => Err(StoreError::NewVersionFound),
            None => {
                debug!("Formatting empty store partition");
                self.write(StoreKey::Format, &[FORMAT_VERSION]).await
            }
        }
    }

    async fn erase(&mut self) -> Result<(), StoreError> {
        self.flash
            .erase(self.range.start, self.range.end)
            .await
            .map_err(|err| {
                error!("Flash erase failed: {:?}", err.kind());
                StoreError::Flash
            })
    }

    async fn read(&mut self, key: StoreKey, buf: &mut [u8]) -> Result<usize, StoreError> {
        let mut data_buffer = [0u8; DATA_BUFFER_LEN];
        let data = map::fetch_item::<StoreKey, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
        )
        .await
        .map_err(map_error)?
        .ok_or(StoreError::NotFound)?;

        let dest = buf.get_mut(..data.len()).ok_or(StoreError::Encoding)?;
        dest.copy_from_slice(data);
        Ok(data.len())
    }

    async fn write(&mut self, key: StoreKey, value: &[u8]) -> Result<(), StoreError> {
        let mut data_buffer = [0u8; DATA_BUFFER_LEN];
        map::store_item(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
            &value,
        )
        .await
        .map_err(map_error)
    }
}
