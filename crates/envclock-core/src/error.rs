//! Error severity classification
//!
//! Peripherals are not all treated alike: a sensor that refuses its
//! configuration is tolerated, a display that does not answer is not. Rather
//! than deciding this ad hoc at every call site, each fallible operation is
//! listed in [`Operation`] and mapped to a [`Severity`] in one table.

use core::fmt::Debug;

use log::{error, warn};
use thiserror_no_std::Error;

use crate::bus::BusError;
use crate::display::DisplayError;
use crate::storage::StoreError;

/// How a failure of an [`Operation`] is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The peripheral set is unusable. Log and halt.
    Fatal,
    /// Log and continue with whatever state the operation left behind.
    Tolerated,
    /// Log and continue in a reduced mode (e.g. unsynchronised clock).
    Degraded,
    /// Handled by the collaborator itself, which retries without bound.
    SilentRetry,
}

/// Every fallible operation the device performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    BusCreate,
    DeviceAttach,
    DisplayProbe,
    DisplayFlush,
    StoreInit,
    SensorConfigure,
    SensorRead,
    TimeSync,
    NetworkJoin,
}

impl Operation {
    pub const fn severity(self) -> Severity {
        match self {
            Self::BusCreate
            | Self::DeviceAttach
            | Self::DisplayProbe
            | Self::DisplayFlush
            | Self::StoreInit => Severity::Fatal,
            Self::SensorConfigure | Self::SensorRead => Severity::Tolerated,
            Self::TimeSync => Severity::Degraded,
            Self::NetworkJoin => Severity::SilentRetry,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BusCreate => "bus create",
            Self::DeviceAttach => "device attach",
            Self::DisplayProbe => "display probe",
            Self::DisplayFlush => "display flush",
            Self::StoreInit => "store init",
            Self::SensorConfigure => "sensor configure",
            Self::SensorRead => "sensor read",
            Self::TimeSync => "time sync",
            Self::NetworkJoin => "network join",
        }
    }
}

/// Apply the severity of `op` to `result`.
///
/// Returns the value on success and `None` for a non-fatal failure. A fatal
/// failure panics, which ends in the platform's abort path.
pub fn escalate<T, E: Debug>(op: Operation, result: Result<T, E>) -> Option<T> {
    let err = match result {
        Ok(value) => return Some(value),
        Err(err) => err,
    };

    match op.severity() {
        Severity::Fatal => {
            error!("{} failed: {:?}", op.label(), err);
            panic!("fatal: {} failed: {:?}", op.label(), err);
        }
        Severity::Tolerated => error!("{} failed: {:?}", op.label(), err),
        Severity::Degraded | Severity::SilentRetry => {
            warn!("{} failed: {:?}", op.label(), err)
        }
    }
    None
}

/// Unwrap the result of a [`Severity::Fatal`] operation, halting on failure.
pub fn require<T, E: Debug>(op: Operation, result: Result<T, E>) -> T {
    debug_assert_eq!(op.severity(), Severity::Fatal);
    match escalate(op, result) {
        Some(value) => value,
        None => panic!("fatal: {} failed", op.label()),
    }
}

/// Top-level error for the bring-up sequence.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bus error: {0}")]
    Bus(BusError),
    #[error("display error: {0}")]
    Display(DisplayError),
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("boot stage {attempted:?} reached out of order (current {current:?})")]
    BootOrder {
        current: crate::app_state::BootStage,
        attempted: crate::app_state::BootStage,
    },
}

impl From<BusError> for AppError {
    fn from(value: BusError) -> Self {
        Self::Bus(value)
    }
}

impl From<DisplayError> for AppError {
    fn from(value: DisplayError) -> Self {
        Self::Display(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
