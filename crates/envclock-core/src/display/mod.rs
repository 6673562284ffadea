//! Display adapter
//!
//! Text is composed into the panel's local frame buffer with
//! [`DisplayAdapter::set_cursor`] and [`DisplayAdapter::draw_text`], then
//! transferred to the device in one [`DisplayAdapter::flush`].

#[cfg(feature = "display-ssd1306")]
mod ssd1306;

#[cfg(feature = "display-ssd1306")]
pub use self::ssd1306::{Ssd1306Panel, ssd1306_panel};

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use embedded_hal_async::i2c::I2c;
use log::{debug, info};
use thiserror_no_std::Error;

use crate::async_i2c_bus::I2cDeviceHandle;
use crate::config::{DISPLAY_HEIGHT_PX, GLYPH_WIDTH_PX, PIXELS_PER_PAGE};
use crate::render::centered_x;

/// Text shown between display bring-up and the first render pass.
pub const SPLASH_TEXT: &str = "Getting Data";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("no display answered at {address:#04x}")]
    NotDetected { address: u8 },
    #[error("display init sequence failed")]
    Init,
    #[error("drawing into the frame buffer failed")]
    Draw,
    #[error("frame transfer failed")]
    Flush,
}

/// A monochrome panel with a local frame buffer.
pub trait DisplayPanel: DrawTarget<Color = BinaryColor> {
    /// Send the controller's power-up command sequence.
    fn init_panel(&mut self) -> impl Future<Output = Result<(), DisplayError>>;

    /// Transfer the frame buffer to the device.
    fn flush_panel(&mut self) -> impl Future<Output = Result<(), DisplayError>>;
}

pub struct DisplayAdapter<P> {
    panel: P,
    cursor: Point,
}

impl<P: DisplayPanel> DisplayAdapter<P> {
    /// Probe the display, initialise it and show the boot splash.
    ///
    /// `make_panel` builds the driver around the device handle once the
    /// device has acknowledged its address.
    pub async fn configure<'a, T, F>(
        mut device: I2cDeviceHandle<'a, T>,
        make_panel: F,
    ) -> Result<Self, DisplayError>
    where
        T: I2c,
        F: FnOnce(I2cDeviceHandle<'a, T>) -> P,
    {
        let address = device.address();
        device
            .probe()
            .await
            .map_err(|_| DisplayError::NotDetected { address })?;
        debug!("Display acknowledged at {:#04x}", address);

        let mut adapter = Self {
            panel: make_panel(device),
            cursor: Point::zero(),
        };
        adapter.panel.init_panel().await?;

        adapter.clear()?;
        adapter.set_cursor(
            centered_x(SPLASH_TEXT.len()),
            ((DISPLAY_HEIGHT_PX / PIXELS_PER_PAGE) * 2) as i32,
        );
        adapter.draw_text(SPLASH_TEXT, false)?;
        adapter.flush().await?;

        info!("Display ready");
        Ok(adapter)
    }

    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = Point::new(x, y);
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    /// Draw `text` at the cursor and advance the cursor past it.
    ///
    /// `invert` draws light-on-dark glyphs as dark-on-light.
    pub fn draw_text(&mut self, text: &str, invert: bool) -> Result<(), DisplayError> {
        let style: MonoTextStyle<'_, BinaryColor> = if invert {
            MonoTextStyleBuilder::new()
                .font(&FONT_6X10)
                .text_color(BinaryColor::Off)
                .background_color(BinaryColor::On)
                .build()
        } else {
            MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
        };

        Text::with_baseline(text, self.cursor, style, Baseline::Top)
            .draw(&mut self.panel)
            .map_err(|_| DisplayError::Draw)?;

        self.cursor.x += (text.len() as u32 * GLYPH_WIDTH_PX) as i32;
        Ok(())
    }

    /// Blank the frame buffer. Nothing reaches the device until `flush`.
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        self.panel
            .clear(BinaryColor::Off)
            .map_err(|_| DisplayError::Draw)
    }

    pub async fn flush(&mut self) -> Result<(), DisplayError> {
        self.panel.flush_panel().await
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }
}
