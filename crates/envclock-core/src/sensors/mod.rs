//! Environmental sensor adapter
//!
//! [`EnvironmentalSensor`] is the narrow contract a sensor driver fulfils;
//! [`SensorAdapter`] applies the device's operating mode at bring-up and
//! produces one complete [`Measurement`] per [`SensorAdapter::read_once`].

#[cfg(feature = "sensor-bme280")]
mod bme280;

#[cfg(feature = "sensor-bme280")]
pub use self::bme280::Bme280Sensor;

use log::{error, info};
use thiserror_no_std::Error;

use crate::error::{Operation, escalate};

/// Latest environmental reading.
///
/// Pressure is kept in the sensor's native unit (Pa).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// Degrees Celsius
    pub temperature: f32,
    /// Pascal
    pub pressure: f32,
    /// Relative humidity, percent
    pub humidity: f32,
}

impl Measurement {
    pub const ZERO: Self = Self {
        temperature: 0.0,
        pressure: 0.0,
        humidity: 0.0,
    };

    pub const fn new(temperature: f32, pressure: f32, humidity: f32) -> Self {
        Self {
            temperature,
            pressure,
            humidity,
        }
    }

    pub const fn pressure_hpa(&self) -> f32 {
        self.pressure / 100.0
    }

    fn is_finite(&self) -> bool {
        self.temperature.is_finite() && self.pressure.is_finite() && self.humidity.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    Skipped,
    X1,
    X2,
    X4,
    X8,
    X16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IirFilter {
    Off,
    X2,
    X4,
    X8,
    X16,
}

/// Register-level settings for one operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSettings {
    pub temperature: Oversampling,
    pub pressure: Oversampling,
    pub humidity: Oversampling,
    pub filter: IirFilter,
    /// Forced modes convert once per trigger; otherwise the sensor samples
    /// continuously in the background.
    pub forced: bool,
}

/// Named operating modes, after the BME280 datasheet's recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementMode {
    /// Forced, 1x oversampling everywhere, filter off. One conversion per read.
    WeatherMonitoring,
    /// Forced, pressure skipped.
    HumiditySensing,
    /// Normal (continuous) mode with heavy pressure oversampling.
    IndoorNavigation,
}

impl MeasurementMode {
    pub const fn settings(self) -> ModeSettings {
        match self {
            Self::WeatherMonitoring => ModeSettings {
                temperature: Oversampling::X1,
                pressure: Oversampling::X1,
                humidity: Oversampling::X1,
                filter: IirFilter::Off,
                forced: true,
            },
            Self::HumiditySensing => ModeSettings {
                temperature: Oversampling::X1,
                pressure: Oversampling::Skipped,
                humidity: Oversampling::X1,
                filter: IirFilter::Off,
                forced: true,
            },
            Self::IndoorNavigation => ModeSettings {
                temperature: Oversampling::X2,
                pressure: Oversampling::X16,
                humidity: Oversampling::X1,
                filter: IirFilter::X16,
                forced: false,
            },
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: {operation} failed")]
    Bus {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: unexpected chip id")]
    UnsupportedChip { sensor: &'static str },
    #[error("{sensor}: calibration data unavailable")]
    NoCalibration { sensor: &'static str },
    #[error("{sensor}: measurement out of range")]
    InvalidData { sensor: &'static str },
    #[error("{mode:?} is not a one-shot mode")]
    UnsupportedMode { mode: MeasurementMode },
}

/// A sensor that produces temperature, pressure and humidity.
pub trait EnvironmentalSensor {
    /// Name used in log lines.
    const NAME: &'static str;

    /// Write the configuration registers for `settings`.
    fn configure(
        &mut self,
        settings: ModeSettings,
    ) -> impl Future<Output = Result<(), SensorError>>;

    /// Trigger one conversion and wait for it to complete.
    fn measure(&mut self) -> impl Future<Output = Result<Measurement, SensorError>>;
}

/// Sensor bound to its device handle with the operating mode applied.
pub struct SensorAdapter<S> {
    sensor: S,
    mode: MeasurementMode,
    configured: bool,
}

impl<S: EnvironmentalSensor> SensorAdapter<S> {
    /// Apply `mode` to the sensor.
    ///
    /// A configuration failure is logged and tolerated; the adapter is
    /// returned regardless and reads use whatever configuration the sensor
    /// ended up with.
    pub async fn configure(mut sensor: S, mode: MeasurementMode) -> Self {
        let settings = mode.settings();
        let result = if settings.forced {
            sensor.configure(settings).await
        } else {
            Err(SensorError::UnsupportedMode { mode })
        };

        let configured = escalate(Operation::SensorConfigure, result).is_some();
        if configured {
            info!("{} configured for {:?}", S::NAME, mode);
        }

        Self {
            sensor,
            mode,
            configured,
        }
    }

    /// One forced conversion, returned only once complete.
    pub async fn read_once(&mut self) -> Result<Measurement, SensorError> {
        let measurement = self.sensor.measure().await?;
        if !measurement.is_finite() {
            error!("{} returned a non-finite sample: {:?}", S::NAME, measurement);
            return Err(SensorError::InvalidData { sensor: S::NAME });
        }
        Ok(measurement)
    }

    pub fn mode(&self) -> MeasurementMode {
        self.mode
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    struct FakeSensor {
        configure_result: Result<(), SensorError>,
        reading: Measurement,
        applied: Option<ModeSettings>,
    }

    impl FakeSensor {
        fn new(configure_result: Result<(), SensorError>, reading: Measurement) -> Self {
            Self {
                configure_result,
                reading,
                applied: None,
            }
        }
    }

    impl EnvironmentalSensor for FakeSensor {
        const NAME: &'static str = "FAKE";

        async fn configure(&mut self, settings: ModeSettings) -> Result<(), SensorError> {
            self.configure_result?;
            self.applied = Some(settings);
            Ok(())
        }

        async fn measure(&mut self) -> Result<Measurement, SensorError> {
            Ok(self.reading)
        }
    }

    #[test]
    fn test_forced_mode_is_applied() {
        let sensor = FakeSensor::new(Ok(()), Measurement::new(21.3, 101_325.0, 45.0));
        let adapter = block_on(SensorAdapter::configure(sensor, MeasurementMode::WeatherMonitoring));

        assert!(adapter.is_configured());
        assert_eq!(
            adapter.sensor().applied,
            Some(MeasurementMode::WeatherMonitoring.settings())
        );
    }

    #[test]
    fn test_read_succeeds_after_failed_configuration() {
        let failure = Err(SensorError::Bus {
            sensor: "FAKE",
            operation: "write ctrl_meas",
        });
        let uncalibrated = Measurement::new(-40.0, 30_000.0, 0.0);
        let sensor = FakeSensor::new(failure, uncalibrated);

        let mut adapter = block_on(SensorAdapter::configure(sensor, MeasurementMode::WeatherMonitoring));
        assert!(!adapter.is_configured());
        assert_eq!(block_on(adapter.read_once()), Ok(uncalibrated));
    }

    #[test]
    fn test_continuous_mode_is_tolerated_but_not_applied() {
        let sensor = FakeSensor::new(Ok(()), Measurement::ZERO);
        let adapter = block_on(SensorAdapter::configure(sensor, MeasurementMode::IndoorNavigation));

        assert!(!adapter.is_configured());
        assert!(adapter.sensor().applied.is_none());
    }

    #[test]
    fn test_non_finite_sample_is_rejected() {
        let sensor = FakeSensor::new(Ok(()), Measurement::new(f32::NAN, 101_325.0, 45.0));
        let mut adapter = block_on(SensorAdapter::configure(sensor, MeasurementMode::WeatherMonitoring));

        assert_eq!(
            block_on(adapter.read_once()),
            Err(SensorError::InvalidData { sensor: "FAKE" })
        );
    }

    #[test]
    fn test_pressure_in_hpa() {
        assert_eq!(Measurement::new(0.0, 101_325.0, 0.0).pressure_hpa(), 1013.25);
    }
}
