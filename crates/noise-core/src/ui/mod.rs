//! Chart rendering onto `embedded-graphics` draw targets.

mod chart_view;
mod framebuffer;

pub use chart_view::ChartView;
pub use framebuffer::FrameBuffer;

use embedded_graphics::pixelcolor::{Rgb565, Rgb888};
use embedded_graphics::prelude::*;

/// Width of the rendered chart in pixels
pub const DISPLAY_WIDTH_PX: u16 = 320;

/// Height of the rendered chart in pixels
pub const DISPLAY_HEIGHT_PX: u16 = 240;

pub const COLOR_BACKGROUND: Rgb565 = Rgb565::BLACK;
pub const COLOR_FOREGROUND: Rgb565 = Rgb565::WHITE;

/// Very faint gray for grid lines
pub const FAINT_GRAY: Rgb565 = Rgb565::new(10, 20, 10);

pub const LIGHT_GRAY: Rgb565 = Rgb565::new(21, 42, 21);

/// Convert a chart palette color to the display format
pub fn to_display_color(color: Rgb888) -> Rgb565 {
    Rgb565::from(color)
}
