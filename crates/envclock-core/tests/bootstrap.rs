mod common;

use embassy_futures::block_on;
use envclock_core::app_state::{BootSequence, BootStage, bring_up_peripherals};
use envclock_core::bus::BusRegistry;
use envclock_core::config::{BUS, DISPLAY_DEVICE, SENSOR_DEVICE};
use envclock_core::display::DisplayError;
use envclock_core::render::{render_pass, render_step};
use envclock_core::sampling::sample_once;
use envclock_core::sensors::Measurement;
use envclock_core::store::MeasurementStore;
use envclock_core::time::WallClock;
use envclock_core::time::zone::DstZone;

use common::{MockFactory, MockPanel, MockSensor, bus_slot};

const READING: Measurement = Measurement::new(21.3, 101_325.0, 45.0);

#[test]
fn test_startup_creates_handles_once() {
    let mut factory = MockFactory::with_devices(&[0x76, 0x3C]);
    let mut registry = BusRegistry::new(bus_slot(), BUS, SENSOR_DEVICE, DISPLAY_DEVICE);
    let mut boot = BootSequence::new();

    let peripherals = block_on(bring_up_peripherals(
        &mut registry,
        &mut factory,
        &mut boot,
        |device| MockSensor::new(device, READING),
        MockPanel::new,
    ))
    .unwrap();

    assert_eq!(boot.stage(), BootStage::BusReady);
    assert!(peripherals.sensor.is_configured());
    assert_eq!(peripherals.display.panel().flushes, 1, "splash screen flushed");
    assert!(peripherals.display.panel().lit_pixels() > 0);

    let sensor = registry.sensor_device().unwrap();
    let display = registry.display_device().unwrap();
    assert_eq!(sensor.address(), 0x76);
    assert_eq!(display.address(), 0x3C);

    registry.initialize(&mut factory).unwrap();
    assert_eq!(factory.counters.created(), 1);
    assert_eq!(registry.sensor_device().unwrap(), sensor);
    assert_eq!(registry.display_device().unwrap(), display);
}

#[test]
fn test_steady_state_frame() {
    let mut factory = MockFactory::with_devices(&[0x76, 0x3C]);
    let mut registry = BusRegistry::new(bus_slot(), BUS, SENSOR_DEVICE, DISPLAY_DEVICE);
    let mut boot = BootSequence::new();
    let mut peripherals = block_on(bring_up_peripherals(
        &mut registry,
        &mut factory,
        &mut boot,
        |device| MockSensor::new(device, READING),
        MockPanel::new,
    ))
    .unwrap();

    let store = MeasurementStore::new();
    let clock = WallClock::new();
    // 2024-06-01T12:00:00Z
    clock.set_unix_time(1_717_243_200);

    assert!(block_on(sample_once(&mut peripherals.sensor, &store)));
    assert_eq!(store.snapshot(), READING);

    let frame = block_on(render_pass(
        &mut peripherals.display,
        &clock,
        &DstZone::UTC,
        &store,
    ))
    .unwrap();

    assert_eq!(frame.lines[1].text.as_str(), "2024-06-01");
    assert_eq!(frame.lines[2].text.as_str(), "Hum-45.0%");
    assert_eq!(frame.lines[3].text.as_str(), "Temp-21.3C");
    assert_eq!(frame.lines[4].text.as_str(), "Pres-1013.25hPa");
    assert_eq!(peripherals.display.panel().flushes, 2);
}

#[test]
fn test_rejected_sensor_configuration_still_reads() {
    let mut factory = MockFactory::with_devices(&[0x76, 0x3C]);
    let mut registry = BusRegistry::new(bus_slot(), BUS, SENSOR_DEVICE, DISPLAY_DEVICE);
    let mut boot = BootSequence::new();
    let mut peripherals = block_on(bring_up_peripherals(
        &mut registry,
        &mut factory,
        &mut boot,
        |device| {
            let mut sensor = MockSensor::new(device, READING);
            sensor.reject_configuration = true;
            sensor
        },
        MockPanel::new,
    ))
    .unwrap();

    assert!(!peripherals.sensor.is_configured());
    assert_eq!(block_on(peripherals.sensor.read_once()), Ok(READING));
}

#[test]
#[should_panic(expected = "display probe")]
fn test_missing_display_halts_bring_up() {
    let mut factory = MockFactory::with_devices(&[0x76]);
    let mut registry = BusRegistry::new(bus_slot(), BUS, SENSOR_DEVICE, DISPLAY_DEVICE);
    let mut boot = BootSequence::new();

    let _ = block_on(bring_up_peripherals(
        &mut registry,
        &mut factory,
        &mut boot,
        |device| MockSensor::new(device, READING),
        MockPanel::new,
    ));
}

#[test]
#[should_panic(expected = "display flush")]
fn test_failed_splash_flush_halts_bring_up() {
    let mut factory = MockFactory::with_devices(&[0x76, 0x3C]);
    let mut registry = BusRegistry::new(bus_slot(), BUS, SENSOR_DEVICE, DISPLAY_DEVICE);
    let mut boot = BootSequence::new();

    let _ = block_on(bring_up_peripherals(
        &mut registry,
        &mut factory,
        &mut boot,
        |device| MockSensor::new(device, READING),
        |device| {
            let mut panel = MockPanel::new(device);
            panel.fail_flush = true;
            panel
        },
    ));
}

#[test]
fn test_steady_state_flush_failure_is_reported() {
    let mut factory = MockFactory::with_devices(&[0x76, 0x3C]);
    let mut registry = BusRegistry::new(bus_slot(), BUS, SENSOR_DEVICE, DISPLAY_DEVICE);
    let mut boot = BootSequence::new();
    let mut peripherals = block_on(bring_up_peripherals(
        &mut registry,
        &mut factory,
        &mut boot,
        |device| MockSensor::new(device, READING),
        MockPanel::new,
    ))
    .unwrap();
    peripherals.display.panel_mut().fail_flush = true;

    let result = block_on(render_pass(
        &mut peripherals.display,
        &WallClock::new(),
        &DstZone::UTC,
        &MeasurementStore::new(),
    ));

    assert_eq!(result.map(|_| ()), Err(DisplayError::Flush));
    assert_eq!(peripherals.display.panel().flushes, 1);
}

#[test]
#[should_panic(expected = "display flush")]
fn test_steady_state_flush_failure_halts() {
    let mut factory = MockFactory::with_devices(&[0x76, 0x3C]);
    let mut registry = BusRegistry::new(bus_slot(), BUS, SENSOR_DEVICE, DISPLAY_DEVICE);
    let mut boot = BootSequence::new();
    let mut peripherals = block_on(bring_up_peripherals(
        &mut registry,
        &mut factory,
        &mut boot,
        |device| MockSensor::new(device, READING),
        MockPanel::new,
    ))
    .unwrap();
    peripherals.display.panel_mut().fail_flush = true;

    block_on(render_step(
        &mut peripherals.display,
        &WallClock::new(),
        &DstZone::UTC,
        &MeasurementStore::new(),
    ));
}
