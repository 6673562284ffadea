//! Desktop simulator for the envclock sensor clock.
//!
//! Runs the envclock-core bring-up, sampling and rendering code against a
//! simulated I2C bus, a synthetic sensor and an SDL2 window standing in for
//! the 128x64 OLED. Wall-clock time comes from the host.
//!
//! # Key bindings
//!
//! | Key | Action                         |
//! |-----|--------------------------------|
//! | D   | Toggle the sensor dropping out |
//! | Q   | Quit                           |

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use embassy_futures::block_on;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    sdl2::Keycode,
};
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use log::{error, info};
use static_cell::StaticCell;

use envclock_core::app_state::{BootSequence, BootStage, Peripherals, bring_up_peripherals};
use envclock_core::async_i2c_bus::{I2cDeviceHandle, SharedBus};
use envclock_core::bus::{BusConfig, BusError, BusFactory, BusRegistry};
use envclock_core::config::{
    BUS, DISPLAY_DEVICE, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, RENDER_PERIOD, SAMPLING_PERIOD,
    SENSOR_DEVICE, TIME_SYNC, TIME_ZONE,
};
use envclock_core::display::{DisplayError, DisplayPanel};
use envclock_core::sensors::{EnvironmentalSensor, Measurement, ModeSettings, SensorError};
use envclock_core::store::MEASUREMENTS;
use envclock_core::time::{SYSTEM_CLOCK, TimeSource, TimeSyncError, wait_for_time_blocking};
use envclock_core::{render, sampling};

// ---------------------------------------------------------------------------
// Display constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 4;

/// Sleep between event-loop iterations.
const FRAME_DURATION: std::time::Duration = std::time::Duration::from_millis(33);

// ---------------------------------------------------------------------------
// Simulated bus
// ---------------------------------------------------------------------------

/// A bus on which the configured sensor and display acknowledge.
#[derive(Debug)]
struct SimBus {
    present: [u8; 2],
}

impl ErrorType for SimBus {
    type Error = ErrorKind;
}

impl I2c for SimBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if !self.present.contains(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for operation in operations {
            if let Operation::Read(buf) = operation {
                buf.fill(0);
            }
        }
        Ok(())
    }
}

struct SimBusFactory;

impl BusFactory for SimBusFactory {
    type Bus = SimBus;

    fn create(&mut self, config: &BusConfig, frequency_hz: u32) -> Result<SimBus, BusError> {
        info!(
            "Simulated I2C{} on SDA={} SCL={} at {} Hz",
            config.port, config.sda_gpio, config.scl_gpio, frequency_hz
        );
        Ok(SimBus {
            present: [SENSOR_DEVICE.address, DISPLAY_DEVICE.address],
        })
    }
}

static BUS_SLOT: StaticCell<SharedBus<SimBus>> = StaticCell::new();

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// Generates synthetic readings that drift slowly over time.
struct SyntheticSensor {
    device: I2cDeviceHandle<'static, SimBus>,
    started: Instant,
    /// While set, every read fails as if the sensor stopped answering.
    dropped_out: bool,
}

impl SyntheticSensor {
    fn new(device: I2cDeviceHandle<'static, SimBus>) -> Self {
        Self {
            device,
            started: Instant::now(),
            dropped_out: false,
        }
    }

    fn sample(&self) -> Measurement {
        let t = self.started.elapsed().as_secs_f64();

        // Temperature: 20–26 °C sinusoidal with slow drift
        let temperature = 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();

        // Pressure: 1003–1023 hPa on a long cycle
        let pressure = 101_325.0 + 1_000.0 * (t / 600.0).sin() + 40.0 * (t / 29.0).cos();

        // Humidity: 40–60 % with different period
        let humidity = 50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos();

        Measurement::new(temperature as f32, pressure as f32, humidity as f32)
    }
}

impl EnvironmentalSensor for SyntheticSensor {
    const NAME: &'static str = "SYNTH";

    async fn configure(&mut self, settings: ModeSettings) -> Result<(), SensorError> {
        info!("Synthetic sensor configured: {:?}", settings);
        let address = self.device.address();
        self.device
            .write(address, &[0xF4, 0x25])
            .await
            .map_err(|_| SensorError::Bus {
                sensor: Self::NAME,
                operation: "write config",
            })
    }

    async fn measure(&mut self) -> Result<Measurement, SensorError> {
        if self.dropped_out {
            return Err(SensorError::Bus {
                sensor: Self::NAME,
                operation: "read data",
            });
        }
        Ok(self.sample())
    }
}

// ---------------------------------------------------------------------------
// Simulated panel
// ---------------------------------------------------------------------------

/// OLED stand-in. Drawing goes to a local frame buffer; a flush marks it
/// ready for the window.
struct SimPanel {
    device: I2cDeviceHandle<'static, SimBus>,
    framebuffer: SimulatorDisplay<BinaryColor>,
    presented: bool,
}

impl SimPanel {
    fn new(device: I2cDeviceHandle<'static, SimBus>) -> Self {
        Self {
            device,
            framebuffer: SimulatorDisplay::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)),
            presented: false,
        }
    }

    /// The flushed frame, if one is waiting for the window.
    fn take_flushed(&mut self) -> Option<&SimulatorDisplay<BinaryColor>> {
        if core::mem::take(&mut self.presented) {
            Some(&self.framebuffer)
        } else {
            None
        }
    }
}

impl OriginDimensions for SimPanel {
    fn size(&self) -> Size {
        self.framebuffer.size()
    }
}

impl DrawTarget for SimPanel {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.framebuffer.draw_iter(pixels)
    }
}

impl DisplayPanel for SimPanel {
    async fn init_panel(&mut self) -> Result<(), DisplayError> {
        let address = self.device.address();
        self.device
            .write(address, &[0x00, 0xAF])
            .await
            .map_err(|_| DisplayError::Init)
    }

    async fn flush_panel(&mut self) -> Result<(), DisplayError> {
        self.presented = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Host time
// ---------------------------------------------------------------------------

struct HostTime;

impl TimeSource for HostTime {
    async fn sync(&mut self) -> Result<i64, TimeSyncError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TimeSyncError::Network)?;
        i64::try_from(now.as_secs()).map_err(|_| TimeSyncError::Network)
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting envclock simulator");
    info!(
        "Display: {}×{} (scale {}×)",
        DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE
    );
    info!("Keys: D=Toggle sensor dropout  Q=Quit");

    let mut boot = BootSequence::new();
    let mut registry: BusRegistry<SimBus> =
        BusRegistry::new(&BUS_SLOT, BUS, SENSOR_DEVICE, DISPLAY_DEVICE);

    let devices: Peripherals<SyntheticSensor, SimPanel> = match block_on(bring_up_peripherals(
        &mut registry,
        &mut SimBusFactory,
        &mut boot,
        SyntheticSensor::new,
        SimPanel::new,
    )) {
        Ok(devices) => devices,
        Err(err) => {
            error!("Bring-up failed: {}", err);
            return;
        }
    };
    let Peripherals {
        mut sensor,
        mut display,
    } = devices;

    // The simulator has no persistent store or network; step through their
    // stages so the boot order matches the device.
    for stage in [BootStage::StoreReady, BootStage::NetworkUp] {
        if let Err(err) = boot.advance(stage) {
            error!("{}", err);
            return;
        }
    }

    let status = block_on(wait_for_time_blocking(
        &mut HostTime,
        &SYSTEM_CLOCK,
        &TIME_SYNC,
    ));
    info!("Time status: {:?}", status);
    if let Err(err) = boot
        .advance(BootStage::TimeKnown)
        .and_then(|()| boot.advance(BootStage::TasksRunning))
    {
        error!("{}", err);
        return;
    }

    // SDL2 window, showing the splash flushed during bring-up
    let output_settings = OutputSettingsBuilder::new()
        .scale(WINDOW_SCALE)
        .theme(BinaryColorTheme::OledBlue)
        .build();
    let mut window = Window::new("envclock Simulator", &output_settings);

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    if let Some(frame) = display.panel_mut().take_flushed() {
        window.update(frame);
    }

    let sampling_period = std::time::Duration::from_millis(SAMPLING_PERIOD.as_millis());
    let render_period = std::time::Duration::from_millis(RENDER_PERIOD.as_millis());
    let mut last_sample: Option<Instant> = None;
    let mut last_render: Option<Instant> = None;

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------
    'running: loop {
        // --- SDL events ---------------------------------------------------
        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,

                SimulatorEvent::KeyDown { keycode, .. } => match keycode {
                    Keycode::Q | Keycode::Escape => break 'running,
                    Keycode::D => {
                        let dropped = !sensor.sensor().dropped_out;
                        sensor.sensor_mut().dropped_out = dropped;
                        info!("Sensor dropout {}", if dropped { "on" } else { "off" });
                    }
                    _ => {}
                },

                _ => {}
            }
        }

        // --- Sampling -----------------------------------------------------
        if last_sample.is_none_or(|at| at.elapsed() >= sampling_period) {
            block_on(sampling::sample_once(&mut sensor, &MEASUREMENTS));
            last_sample = Some(Instant::now());
        }

        // --- Render -------------------------------------------------------
        if last_render.is_none_or(|at| at.elapsed() >= render_period) {
            let frame = block_on(render::render_step(
                &mut display,
                &SYSTEM_CLOCK,
                &TIME_ZONE,
                &MEASUREMENTS,
            ));
            for line in &frame.lines {
                log::trace!("{:>3},{:>2} {}", line.x, line.y, line.text);
            }
            last_render = Some(Instant::now());
        }

        if let Some(frame) = display.panel_mut().take_flushed() {
            window.update(frame);
        }

        std::thread::sleep(FRAME_DURATION);
    }

    info!("Simulator exiting");
}
