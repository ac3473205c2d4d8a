use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};

use super::{COLOR_BACKGROUND, COLOR_FOREGROUND, FAINT_GRAY, LIGHT_GRAY, to_display_color};
use crate::chart::{ChartData, Dataset, Y_AXIS_MIN};

/// Height of the headline section in pixels
const HEADER_HEIGHT_PX: u32 = 24;

/// Height reserved below the plot for x-axis labels
const X_LABELS_HEIGHT_PX: u32 = 14;

/// Height of the error line at the very bottom
const ERROR_LINE_HEIGHT_PX: u32 = 12;

const PADDING_LEFT_PX: i32 = 5;
const PADDING_RIGHT_PX: i32 = 10;

/// Number of horizontal grid lines including the baseline
const GRID_LINES: u32 = 5;

const SERIES_LINE_WIDTH_PX: u32 = 1;

/// Draws the rolling noise chart.
///
/// Layout from top to bottom: headline with the current level, the plot
/// (grid, one polyline per dataset, y-axis maximum in the corner), the
/// age labels of the oldest and newest point, and the most recent
/// transmission error if there is one.
pub struct ChartView {
    bounds: Rectangle,
}

impl ChartView {
    pub fn new(bounds: Rectangle) -> Self {
        Self { bounds }
    }

    fn plot_area(&self) -> Rectangle {
        let top = self.bounds.top_left.y + HEADER_HEIGHT_PX as i32;
        let left = self.bounds.top_left.x + PADDING_LEFT_PX;
        let width = (self.bounds.size.width as i32 - PADDING_LEFT_PX - PADDING_RIGHT_PX).max(1);
        let height = (self.bounds.size.height as i32
            - (HEADER_HEIGHT_PX + X_LABELS_HEIGHT_PX + ERROR_LINE_HEIGHT_PX) as i32)
            .max(1);

        Rectangle::new(
            Point::new(left, top),
            Size::new(width as u32, height as u32),
        )
    }

    /// Redraw everything for `chart`, with an optional error line.
    pub fn draw<D>(
        &self,
        chart: &ChartData,
        error: Option<&str>,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.bounds
            .into_styled(PrimitiveStyle::with_fill(COLOR_BACKGROUND))
            .draw(target)?;

        self.draw_headline(chart, target)?;

        let plot = self.plot_area();
        let y_max = chart.y_axis_max();
        self.draw_grid(plot, y_max, target)?;

        for dataset in &chart.datasets {
            draw_dataset(dataset, plot, y_max, target)?;
        }

        self.draw_x_labels(chart, plot, target)?;

        if let Some(message) = error {
            let style = MonoTextStyle::new(&FONT_6X10, Rgb565::RED);
            let baseline_y = self.bounds.top_left.y + self.bounds.size.height as i32 - 3;
            Text::new(
                message,
                Point::new(self.bounds.top_left.x + PADDING_LEFT_PX, baseline_y),
                style,
            )
            .draw(target)?;
        }

        Ok(())
    }

    fn draw_headline<D>(&self, chart: &ChartData, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let text = match chart.headline() {
            Some(level) => format!("Noise level: {}", level),
            None => "Noise level: measuring...".to_string(),
        };

        let style = MonoTextStyle::new(&FONT_6X10, COLOR_FOREGROUND);
        Text::new(
            &text,
            self.bounds.top_left + Point::new(PADDING_LEFT_PX, 15),
            style,
        )
        .draw(target)?;
        Ok(())
    }

    fn draw_grid<D>(&self, plot: Rectangle, y_max: f64, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let style = PrimitiveStyle::with_stroke(FAINT_GRAY, 1);
        let left = plot.top_left.x;
        let right = left + plot.size.width as i32 - 1;

        for i in 0..GRID_LINES {
            let fraction = i as f64 / (GRID_LINES - 1) as f64;
            let y = value_to_y(Y_AXIS_MIN + fraction * (y_max - Y_AXIS_MIN), plot, y_max);
            Line::new(Point::new(left, y), Point::new(right, y))
                .into_styled(style)
                .draw(target)?;
        }

        let label_style = MonoTextStyle::new(&FONT_6X10, LIGHT_GRAY);
        Text::new(
            &format!("{:.2}", y_max),
            plot.top_left + Point::new(2, 9),
            label_style,
        )
        .draw(target)?;
        Ok(())
    }

    fn draw_x_labels<D>(
        &self,
        chart: &ChartData,
        plot: Rectangle,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let (Some(oldest), Some(newest)) = (chart.labels.first(), chart.labels.last()) else {
            return Ok(());
        };

        let style = MonoTextStyle::new(&FONT_6X10, LIGHT_GRAY);
        let y = plot.top_left.y + plot.size.height as i32 + 10;
        Text::new(oldest, Point::new(plot.top_left.x, y), style).draw(target)?;

        if chart.labels.len() > 1 {
            let right = plot.top_left.x + plot.size.width as i32 - 1;
            Text::with_alignment(newest, Point::new(right, y), style, Alignment::Right)
                .draw(target)?;
        }
        Ok(())
    }
}

/// Vertical pixel position of `value` inside `plot`, clamped to the plot
fn value_to_y(value: f64, plot: Rectangle, y_max: f64) -> i32 {
    let bottom = plot.top_left.y + plot.size.height as i32 - 1;
    let range = (y_max - Y_AXIS_MIN).max(f64::EPSILON);
    let fraction = ((value - Y_AXIS_MIN) / range).clamp(0.0, 1.0);
    bottom - (fraction * (plot.size.height - 1) as f64).round() as i32
}

/// Horizontal pixel position of point `index` out of `count`
fn index_to_x(index: usize, count: usize, plot: Rectangle) -> i32 {
    if count <= 1 {
        return plot.top_left.x + plot.size.width as i32 - 1;
    }
    let span = (plot.size.width - 1) as f64;
    plot.top_left.x + (index as f64 * span / (count - 1) as f64).round() as i32
}

fn draw_dataset<D>(
    dataset: &Dataset,
    plot: Rectangle,
    y_max: f64,
    target: &mut D,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let style = PrimitiveStyle::with_stroke(
        to_display_color(dataset.kind.color()),
        SERIES_LINE_WIDTH_PX,
    );
    let count = dataset.data.len();

    // Non-finite values leave a hole in the line
    let points: Vec<Option<Point>> = dataset
        .data
        .iter()
        .enumerate()
        .map(|(i, value)| {
            value
                .is_finite()
                .then(|| Point::new(index_to_x(i, count, plot), value_to_y(*value, plot, y_max)))
        })
        .collect();

    if count == 1 {
        if let Some(point) = points[0] {
            Pixel(point, style.stroke_color.unwrap_or(COLOR_FOREGROUND)).draw(target)?;
        }
        return Ok(());
    }

    for pair in points.windows(2) {
        let (Some(from), Some(to)) = (pair[0], pair[1]) else {
            continue;
        };
        match dataset.kind.dash() {
            Some(dash) => draw_dashed(from, to, dash, style, target)?,
            None => Line::new(from, to).into_styled(style).draw(target)?,
        }
    }
    Ok(())
}

/// Draw a line as alternating dashes and gaps of `dash` pixels
fn draw_dashed<D>(
    from: Point,
    to: Point,
    dash: u32,
    style: PrimitiveStyle<Rgb565>,
    target: &mut D,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let dx = (to.x - from.x) as f32;
    let dy = (to.y - from.y) as f32;
    let length = (dx * dx + dy * dy).sqrt();
    if length < 1.0 {
        return Ok(());
    }

    let at = |offset: f32| {
        let t = offset / length;
        Point::new(
            from.x + (dx * t).round() as i32,
            from.y + (dy * t).round() as i32,
        )
    };

    let dash = dash.max(1) as f32;
    let mut offset = 0.0;
    while offset < length {
        let end = (offset + dash).min(length);
        Line::new(at(offset), at(end)).into_styled(style).draw(target)?;
        offset += dash * 2.0;
    }
    Ok(())
}
