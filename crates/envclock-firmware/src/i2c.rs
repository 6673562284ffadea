//! I2C0 bus factory
//!
//! Owns the I2C0 peripheral and its two pins until the bus registry asks for
//! the bus. The peripherals can only be handed out once.

use envclock_core::bus::{BusConfig, BusError, BusFactory};
use esp_hal::Async;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::peripherals::{GPIO22, GPIO23, I2C0};
use esp_hal::time::Rate;
use log::{debug, error};

pub type EspI2cBus = I2c<'static, Async>;

struct Pins {
    i2c0: I2C0<'static>,
    sda: GPIO23<'static>,
    scl: GPIO22<'static>,
}

pub struct EspI2cFactory {
    pins: Option<Pins>,
}

impl EspI2cFactory {
    pub fn new(i2c0: I2C0<'static>, sda: GPIO23<'static>, scl: GPIO22<'static>) -> Self {
        Self {
            pins: Some(Pins { i2c0, sda, scl }),
        }
    }
}

impl BusFactory for EspI2cFactory {
    type Bus = EspI2cBus;

    fn create(&mut self, config: &BusConfig, frequency_hz: u32) -> Result<EspI2cBus, BusError> {
        let claim = BusError::Claim { port: config.port };
        if config.port != 0 || config.sda_gpio != 23 || config.scl_gpio != 22 {
            error!(
                "I2C{} on SDA={} SCL={} is not wired on this board",
                config.port, config.sda_gpio, config.scl_gpio
            );
            return Err(claim);
        }
        let pins = self.pins.take().ok_or(claim)?;

        // The esp-hal master config only takes the frequency. Clock source,
        // glitch filter and pull-ups stay at the driver's fixed settings, so
        // the configured values are informational here.
        debug!(
            "I2C{}: requested clock {:?}, glitch filter {} cycles, pull-ups {} (not applied)",
            config.port, config.clock_source, config.glitch_ignore_cycles, config.internal_pullup
        );

        let bus = I2c::new(
            pins.i2c0,
            I2cConfig::default().with_frequency(Rate::from_hz(frequency_hz)),
        )
        .map_err(|err| {
            error!("I2C{} config rejected: {:?}", config.port, err);
            claim
        })?
        .with_sda(pins.sda)
        .with_scl(pins.scl)
        .into_async();

        Ok(bus)
    }
}
