use ::bme280::i2c::AsyncBME280;
use ::bme280::{Configuration, IIRFilter, Oversampling as BmeOversampling};
use embassy_time::Delay;
use embedded_hal_async::i2c::I2c;
use log::warn;

use super::{EnvironmentalSensor, IirFilter, Measurement, ModeSettings, Oversampling, SensorError};

const NAME: &str = "BME280";

/// Bosch BME280 over I2C at 0x76 (SDO low).
///
/// The driver only reads the calibration block as part of its init. If that
/// init fails, the next [`measure`](EnvironmentalSensor::measure) repeats it
/// with the last requested settings before converting.
pub struct Bme280Sensor<I2C> {
    driver: AsyncBME280<I2C>,
    delay: Delay,
    settings: Option<ModeSettings>,
    calibrated: bool,
}

impl<I2C: I2c> Bme280Sensor<I2C> {
    pub fn new_primary(i2c: I2C) -> Self {
        Self {
            driver: AsyncBME280::new_primary(i2c),
            delay: Delay,
            settings: None,
            calibrated: false,
        }
    }

    async fn init(&mut self, settings: ModeSettings) -> Result<(), SensorError> {
        let config = Configuration::default()
            .with_temperature_oversampling(oversampling(settings.temperature))
            .with_pressure_oversampling(oversampling(settings.pressure))
            .with_humidity_oversampling(oversampling(settings.humidity))
            .with_iir_filter(filter(settings.filter));

        let result = self
            .driver
            .init_with_config(&mut self.delay, config)
            .await
            .map_err(|e| map_error(e, "init"));
        self.calibrated = result.is_ok();
        result
    }
}

fn oversampling(value: Oversampling) -> BmeOversampling {
    match value {
        Oversampling::Skipped => BmeOversampling::OversamplingDisabled,
        Oversampling::X1 => BmeOversampling::Oversampling1X,
        Oversampling::X2 => BmeOversampling::Oversampling2X,
        Oversampling::X4 => BmeOversampling::Oversampling4X,
        Oversampling::X8 => BmeOversampling::Oversampling8X,
        Oversampling::X16 => BmeOversampling::Oversampling16X,
    }
}

fn filter(value: IirFilter) -> IIRFilter {
    match value {
        IirFilter::Off => IIRFilter::Off,
        IirFilter::X2 => IIRFilter::Coefficient2,
        IirFilter::X4 => IIRFilter::Coefficient4,
        IirFilter::X8 => IIRFilter::Coefficient8,
        IirFilter::X16 => IIRFilter::Coefficient16,
    }
}

fn map_error<E>(err: ::bme280::Error<E>, operation: &'static str) -> SensorError {
    match err {
        ::bme280::Error::UnsupportedChip => SensorError::UnsupportedChip { sensor: NAME },
        ::bme280::Error::NoCalibrationData => SensorError::NoCalibration { sensor: NAME },
        ::bme280::Error::InvalidData | ::bme280::Error::CompensationFailed => {
            SensorError::InvalidData { sensor: NAME }
        }
        _ => SensorError::Bus {
            sensor: NAME,
            operation,
        },
    }
}

impl<I2C: I2c> EnvironmentalSensor for Bme280Sensor<I2C> {
    const NAME: &'static str = NAME;

    async fn configure(&mut self, settings: ModeSettings) -> Result<(), SensorError> {
        self.settings = Some(settings);
        self.init(settings).await
    }

    async fn measure(&mut self) -> Result<Measurement, SensorError> {
        if let (false, Some(settings)) = (self.calibrated, self.settings) {
            warn!("{} has no calibration data, re-running init", NAME);
            self.init(settings).await?;
        }

        let sample = self
            .driver
            .measure(&mut self.delay)
            .await
            .map_err(|e| map_error(e, "measure"))?;

        Ok(Measurement::new(
            sample.temperature,
            sample.pressure,
            sample.humidity,
        ))
    }
}
