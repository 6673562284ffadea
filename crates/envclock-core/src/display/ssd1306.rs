use ::ssd1306::mode::BufferedGraphicsModeAsync;
use ::ssd1306::prelude::*;
use ::ssd1306::{I2CDisplayInterface, Ssd1306Async};
use embedded_hal_async::i2c::I2c;

use super::{DisplayError, DisplayPanel};

/// SSD1306 128x64 in buffered mode over I2C.
pub type Ssd1306Panel<I2C> =
    Ssd1306Async<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsModeAsync<DisplaySize128x64>>;

pub fn ssd1306_panel<I2C: I2c>(i2c: I2C) -> Ssd1306Panel<I2C> {
    Ssd1306Async::new(
        I2CDisplayInterface::new(i2c),
        DisplaySize128x64,
        DisplayRotation::Rotate0,
    )
    .into_buffered_graphics_mode()
}

impl<I2C: I2c> DisplayPanel for Ssd1306Panel<I2C> {
    async fn init_panel(&mut self) -> Result<(), DisplayError> {
        self.init().await.map_err(|_| DisplayError::Init)
    }

    async fn flush_panel(&mut self) -> Result<(), DisplayError> {
        self.flush().await.map_err(|_| DisplayError::Flush)
    }
}
