//! In-memory framebuffer with change detection.
//!
//! The chart is drawn into this RAM buffer. A dirty flag records whether
//! any pixel changed since the last snapshot, so unchanged frames are not
//! written out again.

use std::convert::Infallible;
use std::io::{self, Write};

use embedded_graphics::pixelcolor::{Rgb565, Rgb888};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use super::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

/// Total number of pixels in the framebuffer (320 x 240 = 76,800).
const PIXEL_COUNT: usize = DISPLAY_WIDTH_PX as usize * DISPLAY_HEIGHT_PX as usize;

/// Heap-allocated framebuffer implementing `DrawTarget<Color = Rgb565>`.
pub struct FrameBuffer {
    pixels: Vec<Rgb565>,
    /// Set when a pixel changes color, cleared by [`FrameBuffer::take_dirty`]
    dirty: bool,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Allocate a new framebuffer filled with black pixels.
    pub fn new() -> Self {
        Self {
            pixels: vec![Rgb565::BLACK; PIXEL_COUNT],
            dirty: false,
        }
    }

    /// Write a single pixel, marking the buffer dirty only if the color changed.
    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb565) {
        let idx = y * DISPLAY_WIDTH_PX as usize + x;
        if self.pixels[idx] != color {
            self.pixels[idx] = color;
            self.dirty = true;
        }
    }

    /// Color at `point`, `None` outside the buffer
    pub fn pixel(&self, point: Point) -> Option<Rgb565> {
        let (x, y) = (point.x, point.y);
        if x < 0 || y < 0 || x >= DISPLAY_WIDTH_PX as i32 || y >= DISPLAY_HEIGHT_PX as i32 {
            return None;
        }
        Some(self.pixels[y as usize * DISPLAY_WIDTH_PX as usize + x as usize])
    }

    /// Number of pixels currently showing `color`
    pub fn count_color(&self, color: Rgb565) -> usize {
        self.pixels.iter().filter(|&&p| p == color).count()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reset change tracking, returning whether anything changed.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Encode the whole buffer as a binary PPM (P6) image.
    pub fn write_ppm<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write!(writer, "P6\n{} {}\n255\n", DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)?;

        let mut row = Vec::with_capacity(DISPLAY_WIDTH_PX as usize * 3);
        for line in self.pixels.chunks(DISPLAY_WIDTH_PX as usize) {
            row.clear();
            for &pixel in line {
                let rgb = Rgb888::from(pixel);
                row.extend_from_slice(&[rgb.r(), rgb.g(), rgb.b()]);
            }
            writer.write_all(&row)?;
        }
        writer.flush()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let w = DISPLAY_WIDTH_PX as usize;
        let h = DISPLAY_HEIGHT_PX as usize;

        for Pixel(coord, color) in pixels {
            let x = coord.x;
            let y = coord.y;
            if x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let w = DISPLAY_WIDTH_PX as i64;
        let h = DISPLAY_HEIGHT_PX as i64;

        let left = i64::from(area.top_left.x);
        let top = i64::from(area.top_left.y);
        let x_start = left.clamp(0, w) as usize;
        let y_start = top.clamp(0, h) as usize;
        let x_end = (left + i64::from(area.size.width)).clamp(0, w) as usize;
        let y_end = (top + i64::from(area.size.height)).clamp(0, h) as usize;

        for y in y_start..y_end {
            for x in x_start..x_end {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let w = DISPLAY_WIDTH_PX as usize;
        let h = DISPLAY_HEIGHT_PX as usize;

        for y in 0..h {
            for x in 0..w {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }
}
