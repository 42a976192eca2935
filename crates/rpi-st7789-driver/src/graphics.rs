use embedded_graphics::{
	draw_target::DrawTarget,
	geometry::{Dimensions, Point, Size},
	pixelcolor::{
		raw::{RawData, RawU16},
		Rgb565,
	},
	primitives::{PointsIter, Rectangle},
	Pixel,
};
use tracing::instrument;

use crate::{error::Error, io::Transport, PanelBlitter};

impl<T: Transport> Dimensions for PanelBlitter<T> {
	fn bounding_box(&self) -> Rectangle {
		Rectangle::new(
			Point::new(0, 0),
			Size::new(u32::from(self.width()) + 1, u32::from(self.height()) + 1),
		)
	}
}

impl<T: Transport> DrawTarget for PanelBlitter<T> {
	type Color = Rgb565;
	type Error = Error;

	fn draw_iter<I>(&mut self, pixels: I) -> std::result::Result<(), Self::Error>
	where
		I: IntoIterator<Item = Pixel<Self::Color>>,
	{
		for Pixel(coord, color) in pixels.into_iter() {
			let Ok(x) = u16::try_from(coord.x) else {
				continue;
			};
			let Ok(y) = u16::try_from(coord.y) else {
				continue;
			};

			if x > self.width() || y > self.height() {
				continue;
			}

			self.draw_point(x, y, RawU16::from(color).into_inner())?;
		}

		Ok(())
	}

	#[instrument(level = "trace", skip(self, colors))]
	fn fill_contiguous<I>(
		&mut self,
		area: &Rectangle,
		colors: I,
	) -> std::result::Result<(), Self::Error>
	where
		I: IntoIterator<Item = Self::Color>,
	{
		let drawable = area.intersection(&self.bounding_box());
		if drawable.is_zero_sized() {
			return Ok(());
		}
		if drawable != *area {
			// partially off-screen: fall back to clipped per-pixel drawing
			return self.draw_iter(area.points().zip(colors).map(|(p, c)| Pixel(p, c)));
		}

		let x = area.top_left.x as u16;
		let y = area.top_left.y as u16;
		let w = area.size.width as u16;
		let h = area.size.height as u16;

		// blit sources are in panel byte order, see draw_picture
		let count = usize::from(w) * usize::from(h);
		let mut data: Vec<u16> = colors
			.into_iter()
			.take(count)
			.map(|c| RawU16::from(c).into_inner().swap_bytes())
			.collect();
		data.resize(count, 0);

		self.draw_picture_exact(x, y, w, h, &data)?;
		if count % 2 == 1 {
			// the word stream covers all but the last pixel of an odd area
			self.draw_point(x + w - 1, y + h - 1, data[count - 1].swap_bytes())?;
		}
		Ok(())
	}

	#[instrument(level = "trace", skip(self))]
	fn fill_solid(
		&mut self,
		area: &Rectangle,
		color: Self::Color,
	) -> std::result::Result<(), Self::Error> {
		let area = area.intersection(&self.bounding_box());
		if area.is_zero_sized() {
			return Ok(());
		}

		let x = area.top_left.x as u16;
		let y = area.top_left.y as u16;
		let w = area.size.width as u16;
		let h = area.size.height as u16;

		self.fill_rect(
			x,
			y,
			x + w - 1,
			y + h - 1,
			RawU16::from(color).into_inner(),
		)
	}
}
