//! ESP32 firmware-specific modules for envclock
//!
//! Everything here touches ESP32 peripherals and cannot compile on desktop
//! targets: the I2C bus factory, Wi-Fi station bring-up, the SNTP time
//! source and the flash-backed key-value store.

#![no_std]

pub mod flash_store;
pub mod i2c;
pub mod sntp;
pub mod wifi;
