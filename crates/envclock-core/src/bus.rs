//! Shared I2C bus registry
//!
//! The registry is the one place that creates the shared bus and the device
//! handles for the sensor and the display. It is an explicit context object:
//! constructed once at boot, initialised once, and then asked for handles by
//! whoever needs them.
//!
//! Initialisation is idempotent. A second [`BusRegistry::initialize`] returns
//! `Ok(())` without calling the factory again, so hardware is touched only
//! once.

use embedded_hal_async::i2c::I2c;
use log::{debug, info};
use static_cell::StaticCell;
use thiserror_no_std::Error;

use crate::async_i2c_bus::{I2cDeviceHandle, SharedBus};

/// Lowest and highest non-reserved 7-bit I2C addresses.
const ADDRESS_MIN: u8 = 0x08;
const ADDRESS_MAX: u8 = 0x77;

/// Fast-mode plus is the highest speed the bus supports.
const MAX_SPEED_HZ: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    Default,
    Apb,
    RefTick,
}

/// Physical bus parameters.
///
/// Port and pins select the hardware. The electrical settings are applied
/// only where the platform's driver exposes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub port: u8,
    pub sda_gpio: u8,
    pub scl_gpio: u8,
    pub clock_source: ClockSource,
    /// Pulses shorter than this many APB cycles are filtered out.
    pub glitch_ignore_cycles: u8,
    pub internal_pullup: bool,
}

/// A peripheral's attachment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// 7-bit address.
    pub address: u8,
    pub speed_hz: u32,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("bus on port {port} could not be claimed")]
    Claim { port: u8 },
    #[error("device at {address:#04x} could not be attached")]
    DeviceAttach { address: u8 },
    #[error("two devices share address {address:#04x}")]
    AddressConflict { address: u8 },
    #[error("bus storage already in use")]
    SlotTaken,
}

/// Creates the platform bus from a [`BusConfig`].
pub trait BusFactory {
    /// The raw bus type that will be shared between device handles.
    type Bus: I2c;

    /// Claim the bus peripheral and its pins.
    ///
    /// `frequency_hz` is the highest speed every attached device supports.
    fn create(&mut self, config: &BusConfig, frequency_hz: u32) -> Result<Self::Bus, BusError>;
}

/// Owner of the shared bus and the two device handles.
pub struct BusRegistry<B: 'static> {
    slot: &'static StaticCell<SharedBus<B>>,
    config: BusConfig,
    sensor_config: DeviceConfig,
    display_config: DeviceConfig,
    bus: Option<&'static SharedBus<B>>,
    sensor: Option<I2cDeviceHandle<'static, B>>,
    display: Option<I2cDeviceHandle<'static, B>>,
}

impl<B: I2c + 'static> BusRegistry<B> {
    /// Create an uninitialised registry.
    ///
    /// `slot` is where the shared bus will live once created; it lives for
    /// the rest of the program, as do the handles.
    pub const fn new(
        slot: &'static StaticCell<SharedBus<B>>,
        config: BusConfig,
        sensor_config: DeviceConfig,
        display_config: DeviceConfig,
    ) -> Self {
        Self {
            slot,
            config,
            sensor_config,
            display_config,
            bus: None,
            sensor: None,
            display: None,
        }
    }

    /// Create the bus and attach both devices.
    ///
    /// Returns immediately if the bus already exists.
    pub fn initialize<F>(&mut self, factory: &mut F) -> Result<(), BusError>
    where
        F: BusFactory<Bus = B>,
    {
        if self.bus.is_some() {
            debug!("I2C bus already initialized");
            return Ok(());
        }

        let frequency_hz = self.bus_frequency_hz();
        let raw = factory.create(&self.config, frequency_hz)?;
        let bus: &'static SharedBus<B> = self
            .slot
            .try_init(SharedBus::new(raw))
            .ok_or(BusError::SlotTaken)?;
        info!(
            "I2C{} ready (SDA={}, SCL={}, {} Hz)",
            self.config.port, self.config.sda_gpio, self.config.scl_gpio, frequency_hz
        );

        let display = Self::attach(bus, self.display_config)?;
        let sensor = Self::attach(bus, self.sensor_config)?;
        if sensor.address() == display.address() {
            return Err(BusError::AddressConflict {
                address: sensor.address(),
            });
        }

        self.bus = Some(bus);
        self.sensor = Some(sensor);
        self.display = Some(display);
        Ok(())
    }

    fn attach(
        bus: &'static SharedBus<B>,
        config: DeviceConfig,
    ) -> Result<I2cDeviceHandle<'static, B>, BusError> {
        let address_ok = (ADDRESS_MIN..=ADDRESS_MAX).contains(&config.address);
        let speed_ok = config.speed_hz > 0 && config.speed_hz <= MAX_SPEED_HZ;
        if !address_ok || !speed_ok {
            return Err(BusError::DeviceAttach {
                address: config.address,
            });
        }
        debug!("Attached I2C device at {:#04x}", config.address);
        Ok(I2cDeviceHandle::new(bus, config))
    }

    /// The bus runs at the speed of its slowest device.
    pub fn bus_frequency_hz(&self) -> u32 {
        self.sensor_config.speed_hz.min(self.display_config.speed_hz)
    }

    pub fn is_initialized(&self) -> bool {
        self.bus.is_some()
    }

    pub fn bus(&self) -> Option<&'static SharedBus<B>> {
        self.bus
    }

    pub fn sensor_device(&self) -> Option<I2cDeviceHandle<'static, B>> {
        self.sensor
    }

    pub fn display_device(&self) -> Option<I2cDeviceHandle<'static, B>> {
        self.display
    }
}
