//! Bakes the fallback Wi-Fi credentials into the firmware.
//!
//! Values come from a `.env` file next to this crate or in the workspace
//! root, or from the build environment. Missing values become empty strings,
//! which leaves the device waiting for credentials in the persistent store.

use std::env;
use std::path::PathBuf;

const KEYS: [&str; 2] = ["WIFI_SSID", "WIFI_PASSWORD"];

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    for dir in [manifest_dir.clone(), manifest_dir.join("../..")] {
        let path = dir.join(".env");
        println!("cargo:rerun-if-changed={}", path.display());
        if path.exists() {
            if let Err(err) = dotenvy::from_path(&path) {
                println!("cargo:warning=could not read {}: {err}", path.display());
            }
            break;
        }
    }

    for key in KEYS {
        println!("cargo:rerun-if-env-changed={key}");
        let value = env::var(key).unwrap_or_default();
        if value.is_empty() {
            println!("cargo:warning={key} is not set");
        }
        println!("cargo:rustc-env={key}={value}");
    }
}
