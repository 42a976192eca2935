//! Image blits: byte-order remapping of caller pixel data through the
//! staging buffer, plus the direct region-of-interest paths.
//!
//! Colour sources are RGB565 in panel byte order (each `u16` holds its
//! pixel byte-swapped, the way these images live in memory when loaded as
//! little-endian half-words). The staging remap exchanges each adjacent
//! pair of pixels and swaps their bytes so that the transport's 32-bit
//! big-endian framing puts them on the wire in source order.

use itertools::Itertools;
use tracing::instrument;

use crate::{error::Result, gray::GRAY_RAMP, io::Transport, panel::PanelBlitter};

// One staging word from a pair of adjacent source pixels: the second of
// the pair lands in the low half-word, the first in the high, both with
// their bytes exchanged for the wire.
fn pack_pair(first: u16, second: u16) -> u32 {
	u32::from(first.swap_bytes()) << 16 | u32::from(second.swap_bytes())
}

impl<T: Transport> PanelBlitter<T> {
	/// Blit a full-panel image.
	///
	/// The staging remap always consumes the source up to the full panel
	/// pixel count ([`PANEL_PIXELS`](crate::PANEL_PIXELS)), regardless of
	/// `width` and `height`; this call is only specified for
	/// full-panel-sized sources. For partial images use
	/// [`draw_picture_exact`](Self::draw_picture_exact).
	#[instrument(level = "trace", skip(self, src))]
	pub fn draw_picture(
		&mut self,
		x: u16,
		y: u16,
		width: u16,
		height: u16,
		src: &[u16],
	) -> Result<()> {
		self.set_window(x, y, x + width - 1, y + height - 1)?;
		for (word, (&first, &second)) in self.staging.iter_mut().zip(src.iter().tuples()) {
			*word = pack_pair(first, second);
		}
		let words = usize::from(width) * usize::from(height) / 2;
		self.transport.write_words(&self.staging[..words])
	}

	/// Blit an image sized exactly `width` by `height`.
	///
	/// Same remap as [`draw_picture`](Self::draw_picture), but only the
	/// addressed region's worth of source is consumed, so partial images
	/// of any (even-total) size work.
	#[instrument(level = "trace", skip(self, src))]
	pub fn draw_picture_exact(
		&mut self,
		x: u16,
		y: u16,
		width: u16,
		height: u16,
		src: &[u16],
	) -> Result<()> {
		self.set_window(x, y, x + width - 1, y + height - 1)?;
		let words = usize::from(width) * usize::from(height) / 2;
		let pairs = src.iter().tuples();
		for (word, (&first, &second)) in self.staging[..words].iter_mut().zip(pairs) {
			*word = pack_pair(first, second);
		}
		self.transport.write_words(&self.staging[..words])
	}

	/// Blit an image resampled to `width` by `height`.
	///
	/// Nearest-neighbour sampling with truncating integer division, so the
	/// output is reproducible bit for bit. `width` must be even, and `src`
	/// must hold at least `src_width * src_height` pixels.
	#[instrument(level = "trace", skip(self, src))]
	#[allow(clippy::too_many_arguments)]
	pub fn draw_picture_scaled(
		&mut self,
		x: u16,
		y: u16,
		width: u16,
		height: u16,
		src_width: u16,
		src_height: u16,
		src: &[u16],
	) -> Result<()> {
		self.set_window(x, y, x + width - 1, y + height - 1)?;

		let (width, height) = (usize::from(width), usize::from(height));
		let (src_width, src_height) = (usize::from(src_width), usize::from(src_height));
		for xx in (0..width).step_by(2) {
			for yy in 0..height {
				let row = yy * src_height / height * src_width;
				let orig = xx * src_width / width + row;
				let orig1 = (xx + 1) * src_width / width + row;
				self.staging[(xx + width * yy) / 2] = pack_pair(src[orig], src[orig1]);
			}
		}

		self.transport.write_words(&self.staging[..width * height / 2])
	}

	/// Blit a sub-rectangle of a larger image, line by line.
	///
	/// `src` is the whole logical image, `width` pixels per row and two
	/// bytes per pixel, already in the controller's byte order; the
	/// `rw` by `rh` region at (`rx`, `ry`) within it is streamed directly,
	/// with no staging remap. `height` is the logical image height and is
	/// not consulted.
	#[instrument(level = "trace", skip(self, src))]
	#[allow(clippy::too_many_arguments)]
	pub fn draw_picture_roi(
		&mut self,
		x: u16,
		y: u16,
		width: u16,
		height: u16,
		rx: u16,
		ry: u16,
		rw: u16,
		rh: u16,
		src: &[u8],
	) -> Result<()> {
		for line in 0..rh {
			let offset = usize::from(width) * 2 * usize::from(ry + line) + 2 * usize::from(rx);
			self.set_window(x, y + line, x + rw - 1, y + line)?;
			self.transport
				.write_bytes(&src[offset..offset + usize::from(rw) * 2])?;
		}
		Ok(())
	}

	/// Blit a full-panel 8-bit grayscale image.
	///
	/// Each source sample indexes [`GRAY_RAMP`] by its top six bits; pairs
	/// keep the same exchanged staging order as
	/// [`draw_picture`](Self::draw_picture), and the same full-panel source
	/// consumption applies.
	#[instrument(level = "trace", skip(self, src))]
	pub fn draw_grayscale(
		&mut self,
		x: u16,
		y: u16,
		width: u16,
		height: u16,
		src: &[u8],
	) -> Result<()> {
		self.set_window(x, y, x + width - 1, y + height - 1)?;
		for (word, (&first, &second)) in self.staging.iter_mut().zip(src.iter().tuples()) {
			*word = u32::from(GRAY_RAMP[usize::from(first >> 2)]) << 16
				| u32::from(GRAY_RAMP[usize::from(second >> 2)]);
		}
		let words = usize::from(width) * usize::from(height) / 2;
		self.transport.write_words(&self.staging[..words])
	}

	/// Blit a sub-rectangle of a larger grayscale image, line by line.
	///
	/// Delegates each scanline of the `rw` by `rh` region at (`rx`, `ry`)
	/// to [`draw_grayscale`](Self::draw_grayscale), addressed one row at a
	/// time. `height` is the logical image height and is not consulted.
	#[instrument(level = "trace", skip(self, src))]
	#[allow(clippy::too_many_arguments)]
	pub fn draw_grayscale_roi(
		&mut self,
		x: u16,
		y: u16,
		width: u16,
		height: u16,
		rx: u16,
		ry: u16,
		rw: u16,
		rh: u16,
		src: &[u8],
	) -> Result<()> {
		for line in 0..rh {
			let offset = usize::from(width) * usize::from(ry + line) + usize::from(rx);
			self.draw_grayscale(x, y + line, rw, 1, &src[offset..])?;
		}
		Ok(())
	}
}

/// Copy a rectangular block between raw RGB565 buffers, two bytes per pixel.
///
/// Rows of the `src_w` by `src_h` block at the top-left of `src` (which is
/// `src_stride` pixels wide) are copied into `dst` (`dst_stride` pixels
/// wide) at pixel position (`x`, `y`). Pure memory operation, no device I/O.
pub fn copy_raw_block(
	dst: &mut [u8],
	dst_stride: usize,
	src: &[u8],
	src_stride: usize,
	src_w: usize,
	src_h: usize,
	x: usize,
	y: usize,
) {
	for row in 0..src_h {
		let to = dst_stride * 2 * (y + row) + x * 2;
		let from = src_stride * 2 * row;
		dst[to..to + src_w * 2].copy_from_slice(&src[from..from + src_w * 2]);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::mock::{MockTransport, Op};

	fn panel() -> PanelBlitter<MockTransport> {
		PanelBlitter::new(MockTransport::default())
	}

	// Streamed words decoded back to source-domain pixel values, in
	// destination order: the high half-word of each transport word goes on
	// the wire first, and the byte swap cancels the staging swap.
	fn decoded_stream(words: &[u32]) -> Vec<u16> {
		words
			.iter()
			.flat_map(|word| [(word >> 16) as u16, *word as u16])
			.map(u16::swap_bytes)
			.collect()
	}

	#[test]
	fn test_picture_pair_swap() {
		let mut panel = panel();
		let src = [0x1234, 0xABCD];
		panel.draw_picture(0, 0, 2, 1, &src).unwrap();

		assert_eq!(panel.transport.windows(), vec![(0, 0, 1, 0)]);
		let words = panel.transport.streamed_words();
		assert_eq!(words.len(), 1);
		// second pixel byte-swapped into the earlier staging slot
		assert_eq!(words[0] as u16, 0xABCD_u16.swap_bytes());
		assert_eq!((words[0] >> 16) as u16, 0x1234_u16.swap_bytes());
	}

	#[test]
	fn test_picture_streams_addressed_pixel_count() {
		let mut panel = panel();
		let src = vec![0x5555_u16; 64];
		panel.draw_picture(4, 8, 8, 4, &src).unwrap();

		assert_eq!(panel.transport.windows(), vec![(4, 8, 11, 11)]);
		// 8x4 destination, two pixels per word, extra source ignored
		assert_eq!(panel.transport.streamed_words().len(), 16);
	}

	#[test]
	fn test_picture_exact_partial() {
		let mut panel = panel();
		let src = [0x0102, 0x0304, 0x0506, 0x0708];
		panel.draw_picture_exact(10, 20, 2, 2, &src).unwrap();

		assert_eq!(panel.transport.windows(), vec![(10, 20, 11, 21)]);
		assert_eq!(
			decoded_stream(&panel.transport.streamed_words()),
			src.to_vec()
		);
	}

	#[test]
	fn test_scaled_identity() {
		let mut panel = panel();
		let src = [0x1111, 0x2222, 0x3333, 0x4444];
		panel.draw_picture_scaled(0, 0, 2, 2, 2, 2, &src).unwrap();

		assert_eq!(panel.transport.windows(), vec![(0, 0, 1, 1)]);
		assert_eq!(
			decoded_stream(&panel.transport.streamed_words()),
			src.to_vec()
		);
	}

	#[test]
	fn test_scaled_floor_sampling() {
		let mut panel = panel();
		// 4x4 source counting up, halved in both axes
		let src: Vec<u16> = (0..16).collect();
		panel.draw_picture_scaled(0, 0, 2, 2, 4, 4, &src).unwrap();

		assert_eq!(
			decoded_stream(&panel.transport.streamed_words()),
			vec![src[0], src[2], src[8], src[10]]
		);
	}

	#[test]
	fn test_grayscale_ramp_lookup() {
		let mut panel = panel();
		let src = [8u8, 200];
		panel.draw_grayscale(0, 0, 2, 1, &src).unwrap();

		let words = panel.transport.streamed_words();
		assert_eq!(words.len(), 1);
		// first sample in the high half, second in the low, both via the ramp
		assert_eq!((words[0] >> 16) as u16, GRAY_RAMP[8 >> 2]);
		assert_eq!(words[0] as u16, GRAY_RAMP[200 >> 2]);
	}

	#[test]
	fn test_picture_roi_line_addressing() {
		let mut panel = panel();
		// 4x4 logical image, 8 bytes per row, counting bytes
		let src: Vec<u8> = (0..32).collect();
		panel.draw_picture_roi(3, 9, 4, 4, 1, 1, 2, 2, &src).unwrap();

		assert_eq!(
			panel.transport.windows(),
			vec![(3, 9, 4, 9), (3, 10, 4, 10)]
		);
		let lines: Vec<&Op> = panel
			.transport
			.ops
			.iter()
			.filter(|op| matches!(op, Op::Bytes(_)))
			.collect();
		assert_eq!(
			lines,
			vec![
				&Op::Bytes(src[10..14].to_vec()),
				&Op::Bytes(src[18..22].to_vec()),
			]
		);
	}

	#[test]
	fn test_grayscale_roi_lines() {
		let mut panel = panel();
		// 4x4 grayscale image, one byte per sample
		let src: Vec<u8> = (0..16).map(|v| v * 16).collect();
		panel
			.draw_grayscale_roi(5, 6, 4, 4, 0, 1, 2, 2, &src)
			.unwrap();

		assert_eq!(
			panel.transport.windows(),
			vec![(5, 6, 6, 6), (5, 7, 6, 7)]
		);
		let words = panel.transport.streamed_words();
		assert_eq!(words.len(), 2);
		assert_eq!((words[0] >> 16) as u16, GRAY_RAMP[usize::from(src[4] >> 2)]);
		assert_eq!(words[0] as u16, GRAY_RAMP[usize::from(src[5] >> 2)]);
		assert_eq!((words[1] >> 16) as u16, GRAY_RAMP[usize::from(src[8] >> 2)]);
		assert_eq!(words[1] as u16, GRAY_RAMP[usize::from(src[9] >> 2)]);
	}

	#[test]
	fn test_copy_raw_block_checkerboard() {
		// 4x4 pixel destination, zeroed; 2x2 checkerboard copied to (1, 1)
		let mut dst = vec![0u8; 4 * 4 * 2];
		let src = [0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF];
		copy_raw_block(&mut dst, 4, &src, 2, 2, 2, 1, 1);

		let mut expected = vec![0u8; 4 * 4 * 2];
		expected[4 * 2 + 2..4 * 2 + 6].copy_from_slice(&src[..4]);
		expected[4 * 4 + 2..4 * 4 + 6].copy_from_slice(&src[4..]);
		assert_eq!(dst, expected);
	}
}
