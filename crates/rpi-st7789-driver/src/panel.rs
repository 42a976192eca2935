use std::{thread::sleep, time::Duration};

use tracing::instrument;

use crate::{
	commands::{Command, Direction, COLMOD_16BPP_65K},
	error::Result,
	io::{Mode, Transport},
};

/// Native column count of the panel.
pub const X_MAX: u16 = 240;

/// Native row count of the panel.
pub const Y_MAX: u16 = 320;

/// Total pixel count of the panel, and the staging buffer capacity.
pub const PANEL_PIXELS: usize = X_MAX as usize * Y_MAX as usize;

/// Word capacity of the outline scratch buffer, two pixels per word.
const OUTLINE_SCRATCH_WORDS: usize = 640;

/// Drawing interface to an ST7789-class panel.
///
/// Wraps a [`Transport`] and owns the fixed staging buffer used to remap
/// pixel data into wire order before streaming it. Drawing is synchronous
/// and run-to-completion; there is no state carried between calls other
/// than the orientation and mode settings.
///
/// Every blit overwrites and then streams the one staging buffer, so the
/// driver must not be shared across threads or interrupt contexts without
/// external mutual exclusion.
#[derive(Debug)]
pub struct PanelBlitter<T> {
	pub(crate) transport: T,
	direction: Direction,
	width: u16,
	height: u16,
	mode: Mode,
	frequency: u32,
	// Two 16-bit pixels per word, the earlier staging slot in the low half:
	// the layout write_words() turns into the controller's byte order.
	pub(crate) staging: Box<[u32]>,
}

impl<T: Transport> PanelBlitter<T> {
	/// Wrap a connected transport.
	///
	/// Allocates the staging buffer and sets the default orientation state;
	/// performs no I/O. Call [`init`](Self::init) before drawing.
	pub fn new(transport: T) -> Self {
		let mut panel = Self {
			transport,
			direction: Direction::default(),
			width: 0,
			height: 0,
			mode: Mode::default(),
			frequency: 20_000_000,
			staging: vec![0; PANEL_PIXELS / 2].into_boxed_slice(),
		};
		panel.apply_direction(Direction::default());
		panel
	}

	/// Perform the init sequence.
	///
	/// Hardware reset through the transport, software reset, sleep-exit,
	/// 16bpp pixel format, default orientation, display on. Leaves the
	/// transport in polling mode.
	#[instrument(level = "debug", skip(self))]
	pub fn init(&mut self) -> Result<()> {
		self.transport.hard_init()?;

		self.transport.write_command(Command::SoftwareReset)?;
		sleep(Duration::from_millis(100));

		self.transport.write_command(Command::SleepOut)?;
		sleep(Duration::from_millis(100));

		self.transport.write_command(Command::InterfacePixelFormat)?;
		self.transport.write_bytes(&[COLMOD_16BPP_65K])?;

		self.set_direction(Direction::default())?;

		self.transport.write_command(Command::DisplayOn)?;
		self.set_polling_mode();
		Ok(())
	}

	/// Turn the display on or off.
	#[instrument(level = "trace", skip(self))]
	pub fn display(&mut self, on: bool) -> Result<()> {
		if on {
			self.transport.write_command(Command::DisplayOn)
		} else {
			self.transport.write_command(Command::DisplayOff)
		}
	}

	/// Expect the transport to poll for bus completion.
	pub fn set_polling_mode(&mut self) {
		self.mode = Mode::Polling;
	}

	/// Expect the transport to wait for completion interrupts.
	pub fn set_interrupt_mode(&mut self) {
		self.mode = Mode::Interrupt;
	}

	/// The current completion mode.
	pub fn mode(&self) -> Mode {
		self.mode
	}

	/// Reprogram the bus clock, and remember the setting.
	#[instrument(level = "debug", skip(self))]
	pub fn set_frequency(&mut self, frequency: u32) -> Result<()> {
		self.transport.set_frequency(frequency)?;
		self.frequency = frequency;
		Ok(())
	}

	/// The last configured bus clock, in Hz.
	pub fn frequency(&self) -> u32 {
		self.frequency
	}

	/// The current scan direction.
	pub fn direction(&self) -> Direction {
		self.direction
	}

	/// Largest addressable column coordinate under the current direction.
	pub fn width(&self) -> u16 {
		self.width
	}

	/// Largest addressable row coordinate under the current direction.
	pub fn height(&self) -> u16 {
		self.height
	}

	fn apply_direction(&mut self, direction: Direction) {
		self.direction = direction;
		if direction.swaps_axes() {
			self.width = Y_MAX - 1;
			self.height = X_MAX - 1;
		} else {
			self.width = X_MAX - 1;
			self.height = Y_MAX - 1;
		}
	}

	/// Set the memory scan direction.
	///
	/// Recomputes the addressable extent and programs the controller.
	/// Takes effect for subsequent addressing only; pixels already sent
	/// stay where they are.
	#[instrument(level = "trace", skip(self))]
	pub fn set_direction(&mut self, direction: Direction) -> Result<()> {
		self.apply_direction(direction);
		self.transport.write_command(Command::MemoryAccessControl)?;
		self.transport.write_bytes(&[direction as u8])?;
		Ok(())
	}

	/// Program the address window and arm the controller for pixel data.
	///
	/// Coordinates are inclusive on both ends; callers must keep
	/// `x1 <= x2` and `y1 <= y2`, this is not checked.
	#[instrument(level = "trace", skip(self))]
	pub(crate) fn set_window(&mut self, x1: u16, y1: u16, x2: u16, y2: u16) -> Result<()> {
		let mut data = [0u8; 4];

		data[..2].copy_from_slice(&x1.to_be_bytes());
		data[2..].copy_from_slice(&x2.to_be_bytes());
		self.transport.write_command(Command::ColumnAddressSet)?;
		self.transport.write_bytes(&data)?;

		data[..2].copy_from_slice(&y1.to_be_bytes());
		data[2..].copy_from_slice(&y2.to_be_bytes());
		self.transport.write_command(Command::RowAddressSet)?;
		self.transport.write_bytes(&data)?;

		self.transport.write_command(Command::MemoryWrite)?;
		Ok(())
	}

	/// Draw a single pixel.
	#[instrument(level = "trace", skip(self))]
	pub fn draw_point(&mut self, x: u16, y: u16, color: u16) -> Result<()> {
		self.set_window(x, y, x, y)?;
		self.transport.write_half_words(&[color])
	}

	/// Fill the whole addressable extent with one colour.
	#[instrument(level = "trace", skip(self))]
	pub fn clear(&mut self, color: u16) -> Result<()> {
		let pattern = u32::from(color) << 16 | u32::from(color);
		self.set_window(0, 0, self.width, self.height)?;
		self.transport.fill_words(pattern, PANEL_PIXELS / 2)
	}

	/// Fill a rectangle with one colour.
	///
	/// Streams exactly `(x2 + 1 - x1) * (y2 + 1 - y1)` pixels; an odd pixel
	/// count rounds up to a whole word, which wraps within the window.
	#[instrument(level = "trace", skip(self))]
	pub fn fill_rect(&mut self, x1: u16, y1: u16, x2: u16, y2: u16, color: u16) -> Result<()> {
		let pattern = u32::from(color) << 16 | u32::from(color);
		self.set_window(x1, y1, x2, y2)?;
		let pixels = usize::from(x2 + 1 - x1) * usize::from(y2 + 1 - y1);
		self.transport.fill_words(pattern, pixels.div_ceil(2))
	}

	/// Draw a rectangle outline of the given border thickness.
	///
	/// Four filled strips, each addressed and streamed independently from a
	/// 640-word scratch. Callers must keep every strip at or under 1280
	/// pixels, this is not checked.
	#[instrument(level = "trace", skip(self))]
	pub fn draw_rect(
		&mut self,
		x1: u16,
		y1: u16,
		x2: u16,
		y2: u16,
		border: u16,
		color: u16,
	) -> Result<()> {
		let pattern = u32::from(color) << 16 | u32::from(color);
		let scratch = [pattern; OUTLINE_SCRATCH_WORDS];

		let horizontal = (usize::from(x2 - x1 + 1) * usize::from(border) + 1) / 2;
		let vertical = (usize::from(y2 - y1 + 1) * usize::from(border) + 1) / 2;

		self.set_window(x1, y1, x2, y1 + border - 1)?;
		self.transport.write_words(&scratch[..horizontal])?;
		self.set_window(x1, y2 - border + 1, x2, y2)?;
		self.transport.write_words(&scratch[..horizontal])?;
		self.set_window(x1, y1, x1 + border - 1, y2)?;
		self.transport.write_words(&scratch[..vertical])?;
		self.set_window(x2 - border + 1, y1, x2, y2)?;
		self.transport.write_words(&scratch[..vertical])?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::mock::{MockTransport, Op};

	fn panel() -> PanelBlitter<MockTransport> {
		PanelBlitter::new(MockTransport::default())
	}

	#[test]
	fn test_direction_extents() {
		let mut panel = panel();
		for direction in [
			Direction::XyRightLeftUpDown,
			Direction::YxRightLeftUpDown,
			Direction::XyLeftRightUpDown,
			Direction::YxLeftRightUpDown,
			Direction::XyRightLeftDownUp,
			Direction::YxRightLeftDownUp,
			Direction::XyLeftRightDownUp,
			Direction::YxLeftRightDownUp,
		] {
			panel.set_direction(direction).unwrap();
			if direction.swaps_axes() {
				assert_eq!(panel.width(), Y_MAX - 1);
				assert_eq!(panel.height(), X_MAX - 1);
			} else {
				assert_eq!(panel.width(), X_MAX - 1);
				assert_eq!(panel.height(), Y_MAX - 1);
			}
		}
	}

	#[test]
	fn test_set_direction_sends_madctl_byte() {
		let mut panel = panel();
		panel.set_direction(Direction::XyLeftRightUpDown).unwrap();
		assert_eq!(
			panel.transport.ops,
			vec![
				Op::Command(Command::MemoryAccessControl),
				Op::Bytes(vec![0x40]),
			]
		);
	}

	#[test]
	fn test_init_sequence() {
		let mut panel = panel();
		panel.set_interrupt_mode();
		panel.init().unwrap();
		assert_eq!(
			panel.transport.ops,
			vec![
				Op::HardInit,
				Op::Command(Command::SoftwareReset),
				Op::Command(Command::SleepOut),
				Op::Command(Command::InterfacePixelFormat),
				Op::Bytes(vec![0x55]),
				Op::Command(Command::MemoryAccessControl),
				Op::Bytes(vec![0xA0]),
				Op::Command(Command::DisplayOn),
			]
		);
		assert_eq!(panel.mode(), Mode::Polling);
		assert_eq!(panel.width(), 319);
		assert_eq!(panel.height(), 239);
	}

	#[test]
	fn test_draw_point() {
		let mut panel = panel();
		panel.draw_point(7, 9, 0xF800).unwrap();
		assert_eq!(panel.transport.windows(), vec![(7, 9, 7, 9)]);
		assert_eq!(
			panel.transport.ops.last(),
			Some(&Op::HalfWords(vec![0xF800]))
		);
	}

	#[test]
	fn test_clear_fills_physical_pixel_count() {
		let mut panel = panel();
		panel.clear(0x1234).unwrap();
		assert_eq!(panel.transport.windows(), vec![(0, 0, 319, 239)]);
		assert_eq!(
			panel.transport.ops.last(),
			Some(&Op::Fill {
				pattern: 0x1234_1234,
				words: PANEL_PIXELS / 2,
			})
		);
	}

	#[test]
	fn test_fill_rect_streams_exact_pixel_count() {
		let mut panel = panel();
		panel.fill_rect(2, 3, 5, 6, 0xABCD).unwrap();
		assert_eq!(panel.transport.windows(), vec![(2, 3, 5, 6)]);
		// 4x4 window, two pixels per fill word
		assert_eq!(
			panel.transport.ops.last(),
			Some(&Op::Fill {
				pattern: 0xABCD_ABCD,
				words: 8,
			})
		);
	}

	#[test]
	fn test_draw_rect_strips() {
		let mut panel = panel();
		panel.draw_rect(10, 20, 29, 39, 2, 0x0F0F).unwrap();
		assert_eq!(
			panel.transport.windows(),
			vec![
				(10, 20, 29, 21),
				(10, 38, 29, 39),
				(10, 20, 11, 39),
				(28, 20, 29, 39),
			]
		);

		let strips: Vec<&Op> = panel
			.transport
			.ops
			.iter()
			.filter(|op| matches!(op, Op::Words(_)))
			.collect();
		assert_eq!(strips.len(), 4);
		for strip in strips {
			let Op::Words(words) = strip else {
				unreachable!()
			};
			// 20 pixels wide/high at border 2: (20 * 2 + 1) / 2 words
			assert_eq!(words.len(), 20);
			assert!(words.iter().all(|&word| word == 0x0F0F_0F0F));
		}
	}

	#[test]
	fn test_mode_toggles_do_no_io() {
		let mut panel = panel();
		panel.set_interrupt_mode();
		assert_eq!(panel.mode(), Mode::Interrupt);
		panel.set_polling_mode();
		assert_eq!(panel.mode(), Mode::Polling);
		assert!(panel.transport.ops.is_empty());
	}

	#[test]
	fn test_frequency_readback() {
		let mut panel = panel();
		assert_eq!(panel.frequency(), 20_000_000);
		panel.set_frequency(40_000_000).unwrap();
		assert_eq!(panel.transport.ops, vec![Op::Frequency(40_000_000)]);
		assert_eq!(panel.frequency(), 40_000_000);
	}
}
