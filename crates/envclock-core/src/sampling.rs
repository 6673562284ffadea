//! Sampling task
//!
//! Reads the sensor once per sampling period and publishes the result to the
//! [`MeasurementStore`]. A failed read leaves the previous record in place.

use embassy_time::{Duration, Timer};
use log::debug;

use crate::error::{Operation, escalate};
use crate::sensors::{EnvironmentalSensor, SensorAdapter};
use crate::store::MeasurementStore;

/// One sampling pass. Returns whether a new record was published.
pub async fn sample_once<S: EnvironmentalSensor>(
    sensor: &mut SensorAdapter<S>,
    store: &MeasurementStore,
) -> bool {
    let Some(measurement) = escalate(Operation::SensorRead, sensor.read_once().await) else {
        return false;
    };

    store.publish(measurement);
    debug!(
        "Sampled {:.1}C {:.2}hPa {:.1}%",
        measurement.temperature,
        measurement.pressure_hpa(),
        measurement.humidity
    );
    true
}

/// Sample forever, once every `period`.
pub async fn run<S: EnvironmentalSensor>(
    sensor: &mut SensorAdapter<S>,
    store: &MeasurementStore,
    period: Duration,
) -> ! {
    loop {
        sample_once(sensor, store).await;
        Timer::after(period).await;
    }
}
