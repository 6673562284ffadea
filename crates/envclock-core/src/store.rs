//! Shared measurement store
//!
//! Holds the single most recent [`Measurement`]. The sampling task writes it,
//! the render loop reads it. Both sides copy the whole record under the lock,
//! so a reader never sees fields from two different samples.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::sensors::Measurement;

pub struct MeasurementStore {
    latest: Mutex<CriticalSectionRawMutex, Cell<Measurement>>,
}

impl MeasurementStore {
    /// Store holding all-zero values until the first successful read.
    pub const fn new() -> Self {
        Self {
            latest: Mutex::new(Cell::new(Measurement::ZERO)),
        }
    }

    /// Replace the stored record.
    pub fn publish(&self, measurement: Measurement) {
        self.latest.lock(|latest| latest.set(measurement));
    }

    /// Copy of the stored record.
    pub fn snapshot(&self) -> Measurement {
        self.latest.lock(Cell::get)
    }
}

impl Default for MeasurementStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The device-wide store shared by the sampling task and the render loop.
pub static MEASUREMENTS: MeasurementStore = MeasurementStore::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot_is_zero() {
        let store = MeasurementStore::new();
        assert_eq!(store.snapshot(), Measurement::ZERO);
    }

    #[test]
    fn test_publish_replaces_whole_record() {
        let store = MeasurementStore::new();
        store.publish(Measurement::new(21.3, 101_325.0, 45.0));
        store.publish(Measurement::new(22.0, 101_300.0, 44.5));
        assert_eq!(store.snapshot(), Measurement::new(22.0, 101_300.0, 44.5));
    }
}
