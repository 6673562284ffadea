//! Persistent key-value store policy
//!
//! The store itself sits on a NOR flash partition ([`NorFlashStore`]); this
//! module owns the bring-up rule and the encoding of the [`Config`] record.

mod flash;

pub use self::flash::{FORMAT_VERSION, NorFlashStore};

use core::future::Future;

use log::{info, warn};
use sequential_storage::map::SerializationError;
use thiserror_no_std::Error;

use crate::config::Config;

/// Largest encoded [`Config`] record.
pub const CONFIG_MAX_LEN: usize = 128;

/// Identifies a record in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StoreKey {
    /// Layout version of the partition.
    Format = 0,
    /// The postcard-encoded [`Config`] record.
    Config = 1,
}

impl StoreKey {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Format),
            1 => Some(Self::Config),
            _ => None,
        }
    }
}

impl sequential_storage::map::Key for StoreKey {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        let slot = buffer.first_mut().ok_or(SerializationError::BufferTooSmall)?;
        *slot = self.as_u8();
        Ok(1)
    }

    fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError> {
        let byte = *buffer.first().ok_or(SerializationError::BufferTooSmall)?;
        Self::from_u8(byte)
            .map(|key| (key, 1))
            .ok_or(SerializationError::InvalidFormat)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("store partition has no free pages")]
    NoFreePages,
    #[error("store partition was written by a newer format version")]
    NewVersionFound,
    #[error("flash access failed")]
    Flash,
    #[error("record could not be encoded or decoded")]
    Encoding,
    #[error("record does not exist")]
    NotFound,
}

impl StoreError {
    /// Conditions cleared by erasing the partition.
    pub const fn needs_erase(self) -> bool {
        matches!(self, Self::NoFreePages | Self::NewVersionFound)
    }
}

/// Byte-oriented persistent storage.
pub trait KeyValueStore {
    /// Validate the partition and make it ready for reads and writes.
    fn open(&mut self) -> impl Future<Output = Result<(), StoreError>>;

    /// Wipe the whole partition.
    fn erase(&mut self) -> impl Future<Output = Result<(), StoreError>>;

    /// Copy the value for `key` into `buf`, returning its length.
    fn read(
        &mut self,
        key: StoreKey,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<usize, StoreError>>;

    fn write(&mut self, key: StoreKey, value: &[u8]) -> impl Future<Output = Result<(), StoreError>>;
}

/// Open `store`, erasing and re-opening it once if the partition is full or
/// from a newer format. Any other failure, or a failure after the erase, is
/// returned to the caller.
pub async fn init_store<S: KeyValueStore>(store: &mut S) -> Result<(), StoreError> {
    match store.open().await {
        Ok(()) => {}
        Err(err) if err.needs_erase() => {
            warn!("Store unusable ({}), erasing", err);
            store.erase().await?;
            store.open().await?;
        }
        Err(err) => return Err(err),
    }
    info!("Store ready");
    Ok(())
}

/// Decode the stored [`Config`] into `buf`.
pub async fn load_config<'b, S: KeyValueStore>(
    store: &mut S,
    buf: &'b mut [u8],
) -> Result<Config<'b>, StoreError> {
    let len = store.read(StoreKey::Config, buf).await?;
    let bytes = buf.get(..len).ok_or(StoreError::Encoding)?;
    postcard::from_bytes(bytes).map_err(|_| StoreError::Encoding)
}

pub async fn save_config<S: KeyValueStore>(
    store: &mut S,
    config: &Config<'_>,
) -> Result<(), StoreError> {
    let mut buf = [0u8; CONFIG_MAX_LEN];
    let encoded = postcard::to_slice(config, &mut buf).map_err(|_| StoreError::Encoding)?;
    store.write(StoreKey::Config, encoded).await
}
