//! Boot sequencing
//!
//! Bring-up is strictly ordered: bus, then persistent store, then network,
//! then time, then the two periodic tasks. [`BootSequence`] records how far
//! the device has come and refuses to skip ahead.

use embedded_hal_async::i2c::I2c;
use log::info;

use crate::async_i2c_bus::I2cDeviceHandle;
use crate::bus::{BusError, BusFactory, BusRegistry};
use crate::config::MEASUREMENT_MODE;
use crate::display::{DisplayAdapter, DisplayError, DisplayPanel};
use crate::error::{AppError, Operation, require};
use crate::sensors::{EnvironmentalSensor, SensorAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootStage {
    Uninitialized,
    BusReady,
    StoreReady,
    NetworkUp,
    TimeKnown,
    TasksRunning,
}

impl BootStage {
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Uninitialized => Some(Self::BusReady),
            Self::BusReady => Some(Self::StoreReady),
            Self::StoreReady => Some(Self::NetworkUp),
            Self::NetworkUp => Some(Self::TimeKnown),
            Self::TimeKnown => Some(Self::TasksRunning),
            Self::TasksRunning => None,
        }
    }
}

#[derive(Debug)]
pub struct BootSequence {
    stage: BootStage,
}

impl BootSequence {
    pub const fn new() -> Self {
        Self {
            stage: BootStage::Uninitialized,
        }
    }

    pub fn stage(&self) -> BootStage {
        self.stage
    }

    /// Move to `stage`, which must directly follow the current one.
    pub fn advance(&mut self, stage: BootStage) -> Result<(), AppError> {
        if self.stage.next() != Some(stage) {
            return Err(AppError::BootOrder {
                current: self.stage,
                attempted: stage,
            });
        }
        info!("Boot stage: {:?}", stage);
        self.stage = stage;
        Ok(())
    }
}

impl Default for BootSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// The two adapters, configured and ready for the periodic tasks.
pub struct Peripherals<S, P> {
    pub sensor: SensorAdapter<S>,
    pub display: DisplayAdapter<P>,
}

/// Create the bus, then bring up the display and the sensor on it.
///
/// Bus and display failures halt the device. A sensor that rejects its
/// configuration is kept.
pub async fn bring_up_peripherals<B, F, S, P, MS, MP>(
    registry: &mut BusRegistry<B>,
    factory: &mut F,
    boot: &mut BootSequence,
    make_sensor: MS,
    make_panel: MP,
) -> Result<Peripherals<S, P>, AppError>
where
    B: I2c + 'static,
    F: BusFactory<Bus = B>,
    S: EnvironmentalSensor,
    P: DisplayPanel,
    MS: FnOnce(I2cDeviceHandle<'static, B>) -> S,
    MP: FnOnce(I2cDeviceHandle<'static, B>) -> P,
{
    let result = registry.initialize(factory);
    let op = match result {
        Err(BusError::DeviceAttach { .. } | BusError::AddressConflict { .. }) => {
            Operation::DeviceAttach
        }
        _ => Operation::BusCreate,
    };
    require(op, result);
    boot.advance(BootStage::BusReady)?;

    let display_device = require(
        Operation::DeviceAttach,
        registry.display_device().ok_or(BusError::SlotTaken),
    );
    let sensor_device = require(
        Operation::DeviceAttach,
        registry.sensor_device().ok_or(BusError::SlotTaken),
    );

    let result = DisplayAdapter::configure(display_device, make_panel).await;
    let op = match &result {
        Err(DisplayError::Flush) => Operation::DisplayFlush,
        _ => Operation::DisplayProbe,
    };
    let display = require(op, result);

    let sensor = SensorAdapter::configure(make_sensor(sensor_device), MEASUREMENT_MODE).await;

    Ok(Peripherals { sensor, display })
}
