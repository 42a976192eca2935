use std::{thread::sleep, time::Duration};

use rppal::{
	gpio::{Gpio, Level, OutputPin},
	spi::{Bus, Mode as SpiMode, SlaveSelect, Spi},
};
use tracing::{instrument, trace};

use crate::{commands::Command, error::Result};

/// How the transport is expected to wait for bus completion.
///
/// Purely advisory: drawing semantics are identical either way. A transport
/// that drives DMA from interrupts may use this to pick its completion
/// strategy; the SPI transport in this crate always polls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
	#[default]
	Polling,
	Interrupt,
}

/// Byte-level transport to the panel controller.
///
/// Implementations own the bus and the command/data select line.
/// Multi-byte units go on the wire most-significant-byte first; this is
/// what the controller expects, and the blit remapping in
/// [`PanelBlitter`](crate::PanelBlitter) is laid out against it.
///
/// Errors are the transport's own and propagate through the drawing layer
/// unchanged.
pub trait Transport {
	/// Bring the panel out of hardware reset.
	///
	/// Called once, before the first command of the init sequence.
	fn hard_init(&mut self) -> Result<()>;

	/// Send a single command opcode, with the command/data line low.
	fn write_command(&mut self, command: Command) -> Result<()>;

	/// Send raw data bytes.
	fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

	/// Send 16-bit units, each most-significant-byte first.
	fn write_half_words(&mut self, data: &[u16]) -> Result<()>;

	/// Send 32-bit units, each most-significant-byte first.
	fn write_words(&mut self, data: &[u32]) -> Result<()>;

	/// Send `count` repetitions of a 32-bit pattern.
	fn fill_words(&mut self, pattern: u32, count: usize) -> Result<()>;

	/// Reprogram the bus clock.
	fn set_frequency(&mut self, frequency: u32) -> Result<()>;
}

/// Arguments to create an [`SpiTransport`].
///
/// This is a struct to hold the wiring of the display: SPI port and
/// frequency, GPIO pins.
///
/// It implements [`Default`] with the usual Raspberry Pi wiring for these
/// panels.
#[derive(Debug, Clone)]
pub struct TransportArgs {
	/// SPI port to use.
	///
	/// Defaults to 0.
	pub spi: u8,

	/// SPI CE number for the display's chip select pin.
	///
	/// Defaults to 0.
	pub ce: u8,

	/// GPIO pin number for the display's reset pin.
	///
	/// Defaults to 27.
	pub reset: u8,

	/// GPIO pin number for the display's data/command pin.
	///
	/// Defaults to 25.
	pub dc: u8,

	/// SPI frequency in Hz.
	///
	/// Defaults to 20 MHz.
	pub frequency: u32,

	/// Largest single SPI transfer, in bytes.
	///
	/// Defaults to 4096. Longer writes are split into transfers of this
	/// size; raise it together with `spidev.bufsiz` for faster full-screen
	/// blits.
	pub chunk: usize,
}

impl Default for TransportArgs {
	fn default() -> Self {
		Self {
			spi: 0,
			ce: 0,
			reset: 27,
			dc: 25,
			frequency: 20_000_000,
			chunk: 4096,
		}
	}
}

/// SPI transport for the panel controller.
///
/// Owns the SPI bus plus the reset and data/command GPIO pins, and
/// serializes half-word and word writes through a fixed reusable chunk
/// buffer.
#[derive(Debug)]
pub struct SpiTransport {
	spi: Spi,
	dc: OutputPin,
	reset: OutputPin,
	chunk: Vec<u8>,
}

impl SpiTransport {
	/// Connect to the display I/O.
	///
	/// This performs the necessary setup for the GPIO and SPI pins, but
	/// doesn't touch the display otherwise; that happens in
	/// [`hard_init`](Transport::hard_init), which the panel's init sequence
	/// calls for you.
	#[instrument(level = "debug")]
	pub fn new(args: TransportArgs) -> Result<Self> {
		let gpio = Gpio::new()?;
		let dc = gpio.get(args.dc)?.into_output();
		let reset = gpio.get(args.reset)?.into_output();

		let spi = Spi::new(
			match args.spi {
				0 => Bus::Spi0,
				1 => Bus::Spi1,
				2 => Bus::Spi2,
				3 => Bus::Spi3,
				4 => Bus::Spi4,
				5 => Bus::Spi5,
				6 => Bus::Spi6,
				_ => unreachable!("SPI bus number out of range"),
			},
			match args.ce {
				0 => SlaveSelect::Ss0,
				1 => SlaveSelect::Ss1,
				2 => SlaveSelect::Ss2,
				_ => unreachable!("SPI CE number out of range"),
			},
			args.frequency,
			SpiMode::Mode0,
		)?;

		Ok(Self {
			spi,
			dc,
			reset,
			chunk: Vec::with_capacity(args.chunk),
		})
	}

	#[instrument(level = "trace", skip(self))]
	fn set_dc(&mut self, level: Level) {
		self.dc.write(level);
	}
}

impl Transport for SpiTransport {
	#[instrument(level = "trace", skip(self))]
	fn hard_init(&mut self) -> Result<()> {
		self.reset.write(Level::High);
		sleep(Duration::from_millis(20));
		self.reset.write(Level::Low);
		sleep(Duration::from_millis(20));
		self.reset.write(Level::High);
		sleep(Duration::from_millis(120)); // wait past cancel period
		Ok(())
	}

	#[instrument(level = "trace", skip(self, command))]
	fn write_command(&mut self, command: Command) -> Result<()> {
		self.set_dc(Level::Low);
		trace!(byte = %format!("{:02X?}", command as u8), "writing command byte to SPI");
		self.spi.write(&[command as u8])?;
		Ok(())
	}

	#[instrument(level = "trace", skip(self, bytes))]
	fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
		self.set_dc(Level::High);
		trace!(length = bytes.len(), "writing data bytes to SPI");
		for part in bytes.chunks(self.chunk.capacity()) {
			self.spi.write(part)?;
		}
		Ok(())
	}

	#[instrument(level = "trace", skip(self, data))]
	fn write_half_words(&mut self, data: &[u16]) -> Result<()> {
		self.set_dc(Level::High);
		trace!(length = data.len(), "writing half-words to SPI");
		for part in data.chunks(self.chunk.capacity() / 2) {
			self.chunk.clear();
			self.chunk
				.extend(part.iter().flat_map(|half| half.to_be_bytes()));
			self.spi.write(&self.chunk)?;
		}
		Ok(())
	}

	#[instrument(level = "trace", skip(self, data))]
	fn write_words(&mut self, data: &[u32]) -> Result<()> {
		self.set_dc(Level::High);
		trace!(length = data.len(), "writing words to SPI");
		for part in data.chunks(self.chunk.capacity() / 4) {
			self.chunk.clear();
			self.chunk
				.extend(part.iter().flat_map(|word| word.to_be_bytes()));
			self.spi.write(&self.chunk)?;
		}
		Ok(())
	}

	#[instrument(level = "trace", skip(self))]
	fn fill_words(&mut self, pattern: u32, count: usize) -> Result<()> {
		self.set_dc(Level::High);
		trace!(count, "filling words over SPI");
		let per_chunk = self.chunk.capacity() / 4;
		self.chunk.clear();
		for _ in 0..count.min(per_chunk) {
			self.chunk.extend_from_slice(&pattern.to_be_bytes());
		}

		let mut remaining = count;
		while remaining > 0 {
			let n = remaining.min(per_chunk);
			self.spi.write(&self.chunk[..n * 4])?;
			remaining -= n;
		}
		Ok(())
	}

	#[instrument(level = "debug", skip(self))]
	fn set_frequency(&mut self, frequency: u32) -> Result<()> {
		self.spi.set_clock_speed(frequency)?;
		Ok(())
	}
}
