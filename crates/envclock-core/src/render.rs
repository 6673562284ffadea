//! Render task
//!
//! Every render period the current local time and the latest measurement are
//! laid out as five centred text rows and pushed to the display.

use core::fmt::Write;

use chrono::{Datelike, NaiveDateTime, Timelike};
use embassy_time::{Duration, Timer};
use heapless::String;

use crate::config::{DISPLAY_WIDTH_PX, GLYPH_WIDTH_PX, PIXELS_PER_PAGE};
use crate::display::{DisplayAdapter, DisplayError, DisplayPanel};
use crate::error::{Operation, require};
use crate::sensors::Measurement;
use crate::store::MeasurementStore;
use crate::time::WallClock;
use crate::time::zone::DstZone;

pub const LINE_CAPACITY: usize = 24;

pub type Line = String<LINE_CAPACITY>;

const TIME_ROW_Y: i32 = PIXELS_PER_PAGE as i32 - 4;
const DATE_ROW_Y: i32 = PIXELS_PER_PAGE as i32 * 2;
const HUMIDITY_ROW_Y: i32 = PIXELS_PER_PAGE as i32 * 4 - 4;
const TEMPERATURE_ROW_Y: i32 = PIXELS_PER_PAGE as i32 * 5 - 2;
const PRESSURE_ROW_Y: i32 = PIXELS_PER_PAGE as i32 * 6;

/// Left edge that centres `len` glyphs on the display.
pub fn centered_x(len: usize) -> i32 {
    let half_display = DISPLAY_WIDTH_PX / 2;
    let half_text = (len as u32 * GLYPH_WIDTH_PX) / 2;
    half_display.saturating_sub(half_text) as i32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLine {
    pub text: Line,
    pub x: i32,
    pub y: i32,
}

impl FrameLine {
    fn centered(text: Line, y: i32) -> Self {
        Self {
            x: centered_x(text.len()),
            text,
            y,
        }
    }
}

/// One screenful: time, date, humidity, temperature, pressure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub lines: [FrameLine; 5],
}

pub fn format_time(now: &NaiveDateTime) -> Line {
    let mut line = Line::new();
    let _ = write!(line, "{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second());
    line
}

pub fn format_date(now: &NaiveDateTime) -> Line {
    let mut line = Line::new();
    let _ = write!(line, "{:04}-{:02}-{:02}", now.year(), now.month(), now.day());
    line
}

pub fn format_humidity(measurement: &Measurement) -> Line {
    let mut line = Line::new();
    let _ = write!(line, "Hum-{:.1}%", measurement.humidity);
    line
}

pub fn format_temperature(measurement: &Measurement) -> Line {
    let mut line = Line::new();
    let _ = write!(line, "Temp-{:.1}C", measurement.temperature);
    line
}

pub fn format_pressure(measurement: &Measurement) -> Line {
    let mut line = Line::new();
    let _ = write!(line, "Pres-{:.2}hPa", measurement.pressure_hpa());
    line
}

pub fn compose_frame(now: &NaiveDateTime, measurement: &Measurement) -> Frame {
    Frame {
        lines: [
            FrameLine::centered(format_time(now), TIME_ROW_Y),
            FrameLine::centered(format_date(now), DATE_ROW_Y),
            FrameLine::centered(format_humidity(measurement), HUMIDITY_ROW_Y),
            FrameLine::centered(format_temperature(measurement), TEMPERATURE_ROW_Y),
            FrameLine::centered(format_pressure(measurement), PRESSURE_ROW_Y),
        ],
    }
}

/// Compose one frame from `clock` and `store` and flush it.
pub async fn render_pass<P: DisplayPanel>(
    display: &mut DisplayAdapter<P>,
    clock: &WallClock,
    zone: &DstZone,
    store: &MeasurementStore,
) -> Result<Frame, DisplayError> {
    let now = clock.local_now(zone);
    let measurement = store.snapshot();
    let frame = compose_frame(&now, &measurement);

    display.clear()?;
    for line in &frame.lines {
        display.set_cursor(line.x, line.y);
        display.draw_text(&line.text, false)?;
    }
    display.flush().await?;

    Ok(frame)
}

/// One steady-state frame. A frame that cannot reach the display halts the
/// device.
pub async fn render_step<P: DisplayPanel>(
    display: &mut DisplayAdapter<P>,
    clock: &WallClock,
    zone: &DstZone,
    store: &MeasurementStore,
) -> Frame {
    require(
        Operation::DisplayFlush,
        render_pass(display, clock, zone, store).await,
    )
}

/// Render forever, one [`render_step`] per `period`.
pub async fn run<P: DisplayPanel>(
    display: &mut DisplayAdapter<P>,
    clock: &WallClock,
    zone: &DstZone,
    store: &MeasurementStore,
    period: Duration,
) -> ! {
    loop {
        render_step(display, clock, zone, store).await;
        Timer::after(period).await;
    }
}
