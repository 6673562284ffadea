//! Device configuration
//!
//! Compile-time hardware and timing constants, plus the runtime
//! [`Config`] record that is persisted in the key-value store.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::bus::{BusConfig, ClockSource, DeviceConfig};
use crate::sensors::MeasurementMode;
use crate::time::TimeSyncPolicy;
use crate::time::zone::DstZone;

/// I2C clock speed for fast-mode devices.
pub const CLK_SPEED_400KHZ: u32 = 400_000;

/// The single shared I2C bus.
pub const BUS: BusConfig = BusConfig {
    port: 0,
    sda_gpio: 23,
    scl_gpio: 22,
    clock_source: ClockSource::Default,
    glitch_ignore_cycles: 7,
    internal_pullup: true,
};

/// BME280 at its primary address (SDO tied low). Use 0x77 if SDO is high.
pub const SENSOR_DEVICE: DeviceConfig = DeviceConfig {
    address: 0x76,
    speed_hz: CLK_SPEED_400KHZ,
};

/// SSD1306 at its default address.
pub const DISPLAY_DEVICE: DeviceConfig = DeviceConfig {
    address: 0x3C,
    speed_hz: CLK_SPEED_400KHZ,
};

pub const DISPLAY_WIDTH_PX: u32 = 128;
pub const DISPLAY_HEIGHT_PX: u32 = 64;

/// Width of one glyph of the display font, used for centering.
pub const GLYPH_WIDTH_PX: u32 = 6;
pub const GLYPH_HEIGHT_PX: u32 = 10;

/// Rows on an SSD1306 are addressed in 8-pixel pages.
pub const PIXELS_PER_PAGE: u32 = 8;

pub const SAMPLING_PERIOD: Duration = Duration::from_millis(2500);
pub const RENDER_PERIOD: Duration = Duration::from_millis(1000);

/// Operating mode applied to the sensor at bring-up.
pub const MEASUREMENT_MODE: MeasurementMode = MeasurementMode::WeatherMonitoring;

pub const NTP_SERVER: &str = "pool.ntp.org";
pub const NTP_PORT: u16 = 123;

/// Interval between background re-synchronisations once the clock is set.
pub const TIME_RESYNC_INTERVAL: Duration = Duration::from_secs(3600);

pub const TIME_SYNC: TimeSyncPolicy = TimeSyncPolicy {
    timeout: Duration::from_millis(10_000),
    fallback_retries: 10,
    fallback_interval: Duration::from_millis(500),
    retry_interval: Duration::from_secs(30),
    sentinel_year: 2016,
};

/// Europe/Bucharest (`EET-2EEST,M3.5.0/3,M10.5.0/4`).
pub const TIME_ZONE: DstZone = DstZone::EASTERN_EUROPE;

/// Runtime configuration persisted in the key-value store.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

impl<'a> Config<'a> {
    pub const fn new(ssid: &'a str, password: &'a str) -> Self {
        Self {
            internet: InternetConfig { ssid, password },
        }
    }

    /// A record is usable once it names a network to join.
    pub fn is_usable(&self) -> bool {
        !self.internet.ssid.is_empty()
    }
}
