#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use envclock_core::async_i2c_bus::{I2cDeviceHandle, SharedBus};
use envclock_core::bus::{BusConfig, BusError, BusFactory};
use envclock_core::config::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use envclock_core::display::{DisplayError, DisplayPanel};
use envclock_core::sensors::{EnvironmentalSensor, Measurement, ModeSettings, SensorError};
use static_cell::StaticCell;

// ---------------------------------------------------------------------------
// Mock bus
// ---------------------------------------------------------------------------

/// A bus on which only the listed addresses acknowledge.
#[derive(Debug)]
pub struct MockBus {
    present: Vec<u8>,
    transactions: Arc<AtomicUsize>,
}

impl ErrorType for MockBus {
    type Error = ErrorKind;
}

impl I2c for MockBus {
    async fn transaction(
        &mut self,
        address: u8,
        _operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        if self.present.contains(&address) {
            Ok(())
        } else {
            Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
        }
    }
}

/// Counters shared between a factory and the test that owns it.
#[derive(Clone, Default)]
pub struct MockCounters {
    pub created: Arc<AtomicUsize>,
    pub transactions: Arc<AtomicUsize>,
}

impl MockCounters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }
}

pub struct MockFactory {
    pub present: Vec<u8>,
    pub counters: MockCounters,
}

impl MockFactory {
    pub fn with_devices(present: &[u8]) -> Self {
        Self {
            present: present.to_vec(),
            counters: MockCounters::default(),
        }
    }
}

impl BusFactory for MockFactory {
    type Bus = MockBus;

    fn create(&mut self, _config: &BusConfig, _frequency_hz: u32) -> Result<MockBus, BusError> {
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(MockBus {
            present: self.present.clone(),
            transactions: self.counters.transactions.clone(),
        })
    }
}

/// A fresh bus slot per test.
pub fn bus_slot() -> &'static StaticCell<SharedBus<MockBus>> {
    Box::leak(Box::new(StaticCell::new()))
}

// ---------------------------------------------------------------------------
// Mock sensor
// ---------------------------------------------------------------------------

/// Sensor that talks to its device handle and returns a fixed reading.
pub struct MockSensor {
    device: I2cDeviceHandle<'static, MockBus>,
    pub reading: Measurement,
    pub reject_configuration: bool,
}

impl MockSensor {
    pub fn new(device: I2cDeviceHandle<'static, MockBus>, reading: Measurement) -> Self {
        Self {
            device,
            reading,
            reject_configuration: false,
        }
    }
}

impl EnvironmentalSensor for MockSensor {
    const NAME: &'static str = "MOCK";

    async fn configure(&mut self, _settings: ModeSettings) -> Result<(), SensorError> {
        if self.reject_configuration {
            return Err(SensorError::Bus {
                sensor: Self::NAME,
                operation: "write config",
            });
        }
        let address = self.device.address();
        self.device
            .write(address, &[0xF4, 0x25])
            .await
            .map_err(|_| SensorError::Bus {
                sensor: Self::NAME,
                operation: "write config",
            })
    }

    async fn measure(&mut self) -> Result<Measurement, SensorError> {
        let address = self.device.address();
        let mut raw = [0u8; 8];
        self.device
            .write_read(address, &[0xF7], &mut raw)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: Self::NAME,
                operation: "read data",
            })?;
        Ok(self.reading)
    }
}

// ---------------------------------------------------------------------------
// Mock panel
// ---------------------------------------------------------------------------

/// In-memory 128x64 frame buffer that records flushes.
pub struct MockPanel {
    device: I2cDeviceHandle<'static, MockBus>,
    pixels: Vec<bool>,
    pub flushes: usize,
    pub fail_flush: bool,
}

impl MockPanel {
    pub fn new(device: I2cDeviceHandle<'static, MockBus>) -> Self {
        Self {
            device,
            pixels: vec![false; (DISPLAY_WIDTH_PX * DISPLAY_HEIGHT_PX) as usize],
            flushes: 0,
            fail_flush: false,
        }
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&on| on).count()
    }
}

impl OriginDimensions for MockPanel {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for MockPanel {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let bounds = Rectangle::new(Point::zero(), self.size());
        for Pixel(point, color) in pixels {
            if bounds.contains(point) {
                let index = point.y as usize * DISPLAY_WIDTH_PX as usize + point.x as usize;
                self.pixels[index] = color.is_on();
            }
        }
        Ok(())
    }
}

impl DisplayPanel for MockPanel {
    async fn init_panel(&mut self) -> Result<(), DisplayError> {
        let address = self.device.address();
        self.device
            .write(address, &[0x00, 0xAE])
            .await
            .map_err(|_| DisplayError::Init)
    }

    async fn flush_panel(&mut self) -> Result<(), DisplayError> {
        if self.fail_flush {
            return Err(DisplayError::Flush);
        }
        self.flushes += 1;
        Ok(())
    }
}
