//! Display Manager for rendering the noise chart
//!
//! Listens for chart events, redraws the chart view into the display and
//! hands each changed frame to a presenter (the snapshot writer in the
//! binary). The current noise level is also logged on every update.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use embassy_sync::pubsub::WaitResult;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::{debug, error, info, warn};

use noise_core::chart::ChartData;
use noise_core::events::NoiseEvent;
use noise_core::ui::{ChartView, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, FrameBuffer};

use crate::app_state::NoiseSubscriber;
use crate::emitter::ErrorPanel;

/// Display manager that owns the display and the latest chart
pub struct DisplayManager<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    display: D,
    view: ChartView,
    chart: ChartData,
    errors: ErrorPanel,
    needs_redraw: bool,
}

impl<D> DisplayManager<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    /// Create a new display manager with the given display
    pub fn new(display: D, errors: ErrorPanel) -> Self {
        let bounds = Rectangle::new(
            Point::zero(),
            Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32),
        );

        Self {
            display,
            view: ChartView::new(bounds),
            chart: ChartData::default(),
            errors,
            needs_redraw: true,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Replace the chart with fresh data
    fn update_chart(&mut self, chart: ChartData) {
        match chart.headline() {
            Some(level) => info!("Noise level: {}", level),
            None => debug!("Chart update without completed periods"),
        }
        self.chart = chart;
        self.needs_redraw = true;
    }

    /// Render the chart if needed, returning whether anything was drawn
    pub fn render(&mut self) -> Result<bool, D::Error> {
        if !self.needs_redraw {
            return Ok(false);
        }

        debug!("Rendering chart");
        let last_error = self.errors.last();
        self.view
            .draw(&self.chart, last_error.as_deref(), &mut self.display)?;
        self.needs_redraw = false;
        Ok(true)
    }

    /// Process a noise event
    pub fn process_event(&mut self, event: NoiseEvent) -> Result<bool, D::Error> {
        match event {
            NoiseEvent::Chart(chart) => self.update_chart(chart),
            NoiseEvent::LogBatch(_) => return Ok(false),
        }
        self.render()
    }

    /// Run the display manager task
    ///
    /// `present` is called with the display after every redraw.
    pub async fn run<F>(&mut self, mut subscriber: NoiseSubscriber<'_>, mut present: F)
    where
        F: FnMut(&mut D),
        <D as DrawTarget>::Error: core::fmt::Debug,
    {
        info!("Display manager task started");

        // Initial render
        match self.render() {
            Ok(true) => present(&mut self.display),
            Ok(false) => {}
            Err(e) => error!("Display render error: {:?}", e),
        }

        loop {
            let event = match subscriber.next_message().await {
                WaitResult::Message(event) => event,
                WaitResult::Lagged(missed) => {
                    warn!("Display manager lagged, {} events lost", missed);
                    continue;
                }
            };

            match self.process_event(event) {
                Ok(true) => present(&mut self.display),
                Ok(false) => {}
                Err(e) => error!("Error processing event: {:?}", e),
            }
        }
    }
}

/// Presenter that writes changed frames to a PPM file
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `frame` if it changed since the last call. Failures are logged.
    pub fn present(&self, frame: &mut FrameBuffer) {
        if !frame.take_dirty() {
            return;
        }

        let result =
            File::create(&self.path).and_then(|file| frame.write_ppm(BufWriter::new(file)));
        match result {
            Ok(()) => debug!("Snapshot written to {}", self.path.display()),
            Err(e) => error!("Failed to write snapshot {}: {}", self.path.display(), e),
        }
    }
}
