//! Async I2C device handles on a shared bus
//!
//! A [`I2cDeviceHandle`] is what a peripheral driver sees instead of the raw
//! bus: every transaction locks the shared bus for its duration, so the
//! sensor and display drivers can run from independent tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

use crate::bus::DeviceConfig;

/// The shared bus as stored by the [`BusRegistry`](crate::bus::BusRegistry).
pub type SharedBus<T> = Mutex<CriticalSectionRawMutex, T>;

/// One peripheral attached to a [`SharedBus`].
///
/// Holds a non-owning reference to the bus plus the device's address and
/// clock speed. Handles are cheap to copy; the registry hands out copies of
/// the one it created.
///
/// Embassy's `Mutex` is held across the await points of a transaction, so a
/// transfer from one task never interleaves with another task's transfer.
pub struct I2cDeviceHandle<'a, T> {
    bus: &'a SharedBus<T>,
    config: DeviceConfig,
}

impl<'a, T> I2cDeviceHandle<'a, T> {
    #[inline]
    pub const fn new(bus: &'a SharedBus<T>, config: DeviceConfig) -> Self {
        Self { bus, config }
    }

    pub const fn address(&self) -> u8 {
        self.config.address
    }

    /// The bus this device is attached to.
    pub const fn bus(&self) -> &'a SharedBus<T> {
        self.bus
    }
}

impl<T: I2c> I2cDeviceHandle<'_, T> {
    /// Address-only write; succeeds if the device acknowledges its address.
    pub async fn probe(&mut self) -> Result<(), T::Error> {
        let mut bus = self.bus.lock().await;
        bus.write(self.config.address, &[]).await
    }
}

impl<T> Clone for I2cDeviceHandle<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for I2cDeviceHandle<'_, T> {}

impl<T> PartialEq for I2cDeviceHandle<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.bus, other.bus) && self.config == other.config
    }
}

impl<T> core::fmt::Debug for I2cDeviceHandle<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("I2cDeviceHandle")
            .field("address", &self.config.address)
            .field("speed_hz", &self.config.speed_hz)
            .finish()
    }
}

impl<T> ErrorType for I2cDeviceHandle<'_, T>
where
    T: ErrorType,
{
    type Error = T::Error;
}

impl<T> I2c for I2cDeviceHandle<'_, T>
where
    T: I2c,
{
    #[inline]
    async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.read(address, read).await
    }

    #[inline]
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write(address, write).await
    }

    #[inline]
    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write_read(address, write, read).await
    }

    /// Executes multiple I2C operations as a single locked transaction.
    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.transaction(address, operations).await
    }
}
