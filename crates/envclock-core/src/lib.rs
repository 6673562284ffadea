//! Hardware-independent core library for envclock
//!
//! This crate contains the platform-agnostic logic of the envclock device:
//! the shared I2C bus registry and device handles, the sensor and display
//! adapters, the measurement store shared between the sampling and render
//! loops, wall-clock and time-sync handling, and the boot sequencing and
//! error severity rules.
//!
//! It is `#![no_std]` so it compiles on both the ESP32 target and desktop
//! hosts (for the simulator and tests).

#![no_std]

#[cfg(test)]
extern crate std;

pub mod app_state;
pub mod async_i2c_bus;
pub mod bus;
pub mod config;
pub mod display;
pub mod error;
pub mod render;
pub mod sampling;
pub mod sensors;
pub mod storage;
pub mod store;
pub mod time;
