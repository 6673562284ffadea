#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_net::StackResources;
use envclock_core::app_state::{BootSequence, BootStage, Peripherals, bring_up_peripherals};
use envclock_core::async_i2c_bus::{I2cDeviceHandle, SharedBus};
use envclock_core::bus::BusRegistry;
use envclock_core::config::{
    BUS, Config, DISPLAY_DEVICE, RENDER_PERIOD, SAMPLING_PERIOD, SENSOR_DEVICE,
    TIME_RESYNC_INTERVAL, TIME_SYNC, TIME_ZONE,
};
use envclock_core::display::{Ssd1306Panel, ssd1306_panel};
use envclock_core::error::{AppError, Operation, escalate, require};
use envclock_core::sensors::{Bme280Sensor, SensorAdapter};
use envclock_core::storage::{CONFIG_MAX_LEN, init_store, load_config, save_config};
use envclock_core::store::MEASUREMENTS;
use envclock_core::time::{SYSTEM_CLOCK, wait_for_time_blocking};
use envclock_core::{render, sampling};
use envclock_firmware::flash_store::flash_store;
use envclock_firmware::i2c::{EspI2cBus, EspI2cFactory};
use envclock_firmware::sntp::{SntpSource, resync_task};
use envclock_firmware::wifi;
use esp_hal::clock::CpuClock;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::{info, warn};
use static_cell::StaticCell;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

type Sensor = Bme280Sensor<I2cDeviceHandle<'static, EspI2cBus>>;
type Panel = Ssd1306Panel<I2cDeviceHandle<'static, EspI2cBus>>;

static BUS_SLOT: StaticCell<SharedBus<EspI2cBus>> = StaticCell::new();
static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
static CONFIG_BUF: StaticCell<[u8; CONFIG_MAX_LEN]> = StaticCell::new();

/// Credentials baked in by `build.rs`, used when the store holds none.
const FALLBACK_CONFIG: Config<'static> = Config::new(env!("WIFI_SSID"), env!("WIFI_PASSWORD"));

#[embassy_executor::task]
async fn sampling_task(mut sensor: SensorAdapter<Sensor>) -> ! {
    sampling::run(&mut sensor, &MEASUREMENTS, SAMPLING_PERIOD).await
}

fn halt(err: AppError) -> ! {
    panic!("bring-up failed: {}", err)
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let mut boot = BootSequence::new();

    // Bus, display and sensor
    let mut factory = EspI2cFactory::new(peripherals.I2C0, peripherals.GPIO23, peripherals.GPIO22);
    let mut registry: BusRegistry<EspI2cBus> =
        BusRegistry::new(&BUS_SLOT, BUS, SENSOR_DEVICE, DISPLAY_DEVICE);
    let devices: Peripherals<Sensor, Panel> = bring_up_peripherals(
        &mut registry,
        &mut factory,
        &mut boot,
        Bme280Sensor::new_primary,
        ssd1306_panel,
    )
    .await
    .unwrap_or_else(|err| halt(err));
    let Peripherals {
        sensor,
        mut display,
    } = devices;

    // Persistent store and runtime configuration
    let mut store = flash_store(peripherals.FLASH);
    require(Operation::StoreInit, init_store(&mut store).await);
    boot.advance(BootStage::StoreReady).unwrap_or_else(|err| halt(err));

    let config = match load_config(&mut store, CONFIG_BUF.init([0; CONFIG_MAX_LEN])).await {
        Ok(stored) if stored.is_usable() => stored,
        result => {
            if let Err(err) = result {
                warn!("No stored configuration ({}), using build-time credentials", err);
            }
            if FALLBACK_CONFIG.is_usable() {
                if let Err(err) = save_config(&mut store, &FALLBACK_CONFIG).await {
                    warn!("Could not persist configuration: {}", err);
                }
            }
            FALLBACK_CONFIG
        }
    };

    // Network
    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (mut controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");
    escalate(
        Operation::NetworkJoin,
        wifi::configure_station(&mut controller, &config),
    );

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );

    spawner.spawn(wifi::connection_task(controller).expect("connection task already spawned"));
    spawner.spawn(wifi::net_task(runner).expect("net task already spawned"));

    wifi::wait_for_ip(stack).await;
    boot.advance(BootStage::NetworkUp).unwrap_or_else(|err| halt(err));

    // Time
    let mut source = SntpSource::new(stack);
    let status = wait_for_time_blocking(&mut source, &SYSTEM_CLOCK, &TIME_SYNC).await;
    info!("Time status: {:?}", status);
    boot.advance(BootStage::TimeKnown).unwrap_or_else(|err| halt(err));

    spawner.spawn(
        resync_task(source, &TIME_SYNC, TIME_RESYNC_INTERVAL, status)
            .expect("resync task already spawned"),
    );

    // Periodic tasks
    spawner.spawn(sampling_task(sensor).expect("sampling task already spawned"));
    boot.advance(BootStage::TasksRunning).unwrap_or_else(|err| halt(err));

    render::run(
        &mut display,
        &SYSTEM_CLOCK,
        &TIME_ZONE,
        &MEASUREMENTS,
        RENDER_PERIOD,
    )
    .await
}
