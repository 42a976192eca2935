#![cfg(target_os = "linux")]

//! A Raspberry Pi driver for bare ST7789-class TFT panel controllers.
//!
//! This crate provides pixel-level drawing primitives for 240x320 panels
//! connected over SPI: point, rectangle fill and outline, full-panel and
//! scaled picture blits, region-of-interest blits, and grayscale blits,
//! all atop a thin command/data [`Transport`] to the controller.
//!
//! It implements both the raw blit interface and [`embedded_graphics`]'
//! traits.
//!
//! # Example
//!
//! ```no_run
//! # use rpi_st7789_driver::{PanelBlitter, SpiTransport, TransportArgs, Result};
//! # fn main() -> Result<()> {
//! let transport = SpiTransport::new(TransportArgs::default())?;
//! let mut lcd = PanelBlitter::new(transport);
//! lcd.init()?;
//!
//! lcd.clear(0x0000)?;
//! lcd.draw_point(120, 160, 0xF800)?;
//! lcd.fill_rect(10, 10, 49, 29, 0x07E0)?;
//! # Ok(()) }
//! ```
//!
//! # Concurrency
//!
//! Drawing is strictly single-threaded and run-to-completion: every blit
//! overwrites and then streams the one staging buffer, so concurrent calls
//! from threads or interrupt contexts need external mutual exclusion.

#[doc(inline)]
pub use blit::copy_raw_block;

#[doc(inline)]
pub use commands::{Command, Direction};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use gray::GRAY_RAMP;

#[doc(inline)]
pub use io::*;

#[doc(inline)]
pub use panel::*;

mod blit;
mod commands;
mod error;
mod graphics;
mod gray;
mod io;
mod panel;
