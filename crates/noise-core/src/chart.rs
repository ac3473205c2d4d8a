//! Chart series derived from completed period summaries
//!
//! The chart shows how loud the quietest share of each period was: the
//! 75th, 95th and 99th percentile and the maximum, one point per completed
//! period, labelled with the age of the period.

use embedded_graphics::pixelcolor::Rgb888;

use crate::storage::PeriodSummary;

/// Lower bound of the y axis
pub const Y_AXIS_MIN: f64 = 0.0;

/// The y axis extends at least to this loudness even for quiet rooms
pub const Y_AXIS_SUGGESTED_MAX: f64 = 0.5;

/// Dash length of the maximum series in pixels
pub const MAX_SERIES_DASH_PX: u32 = 10;

/// Decimal places shown in the headline level
const HEADLINE_SCALE: f64 = 100_000.0;

pub const COLOR_BLUE: Rgb888 = Rgb888::new(54, 162, 235);
pub const COLOR_RED: Rgb888 = Rgb888::new(255, 99, 132);
pub const COLOR_PURPLE: Rgb888 = Rgb888::new(153, 102, 255);
pub const COLOR_SEAGREEN: Rgb888 = Rgb888::new(75, 192, 192);

/// Which statistic of a period a dataset plots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Q75,
    Q95,
    Q99,
    Max,
}

impl SeriesKind {
    /// All plotted series, in drawing order
    pub const ALL: [SeriesKind; 4] = [Self::Q75, Self::Q95, Self::Q99, Self::Max];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Q75 => "75% were louder than",
            Self::Q95 => "95% were louder than",
            Self::Q99 => "99% were louder than",
            Self::Max => "100% were louder than",
        }
    }

    pub const fn color(self) -> Rgb888 {
        match self {
            Self::Q75 => COLOR_SEAGREEN,
            Self::Q95 => COLOR_BLUE,
            Self::Q99 => COLOR_PURPLE,
            Self::Max => COLOR_RED,
        }
    }

    /// Dash length for dashed series, `None` for solid lines
    pub const fn dash(self) -> Option<u32> {
        match self {
            Self::Max => Some(MAX_SERIES_DASH_PX),
            _ => None,
        }
    }

    fn value(self, summary: &PeriodSummary) -> f64 {
        match self {
            Self::Q75 => summary.metrics.q75,
            Self::Q95 => summary.metrics.q95,
            Self::Q99 => summary.metrics.q99,
            Self::Max => summary.metrics.max,
        }
    }
}

/// One plotted line
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub kind: SeriesKind,
    pub data: Vec<f64>,
}

/// Labels and datasets for the rolling chart
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartData {
    /// `"<N>s ago"` per point, oldest first
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    /// Build the chart for `summaries` (oldest first).
    ///
    /// `active_period_id` is the period currently receiving samples; a
    /// point's age is its distance from it in periods times
    /// `period_seconds`, so the newest completed period reads
    /// `"<period_seconds>s ago"`.
    pub fn from_summaries(
        summaries: &[PeriodSummary],
        active_period_id: i64,
        period_seconds: u32,
    ) -> Self {
        let labels = summaries
            .iter()
            .map(|summary| {
                let age = (active_period_id - summary.period_id).max(0);
                format!("{}s ago", age * i64::from(period_seconds))
            })
            .collect();

        let datasets = SeriesKind::ALL
            .iter()
            .map(|&kind| Dataset {
                kind,
                data: summaries.iter().map(|s| kind.value(s)).collect(),
            })
            .collect();

        Self { labels, datasets }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn dataset(&self, kind: SeriesKind) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.kind == kind)
    }

    /// Latest 75th percentile rounded to five decimals, shown as the
    /// current noise level
    pub fn headline(&self) -> Option<f64> {
        let latest = *self.dataset(SeriesKind::Q75)?.data.last()?;
        Some((latest * HEADLINE_SCALE).round() / HEADLINE_SCALE)
    }

    /// Upper bound of the y axis: the suggested maximum, or the largest
    /// finite value when the data goes above it
    pub fn y_axis_max(&self) -> f64 {
        self.datasets
            .iter()
            .flat_map(|d| d.data.iter().copied())
            .filter(|v| v.is_finite())
            .fold(Y_AXIS_SUGGESTED_MAX, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;

    fn summary(period_id: i64, values: &[f64]) -> PeriodSummary {
        PeriodSummary {
            period_id,
            start_ms: period_id * 3000,
            metrics: Metrics::from_unsorted(values).unwrap(),
        }
    }

    #[test]
    fn test_labels_count_back_from_active_period() {
        let summaries = [summary(7, &[0.1]), summary(8, &[0.2]), summary(9, &[0.3])];
        let chart = ChartData::from_summaries(&summaries, 10, 3);
        assert_eq!(chart.labels, vec!["9s ago", "6s ago", "3s ago"]);
    }

    #[test]
    fn test_labels_show_gaps() {
        let summaries = [summary(5, &[0.1]), summary(9, &[0.3])];
        let chart = ChartData::from_summaries(&summaries, 10, 3);
        assert_eq!(chart.labels, vec!["15s ago", "3s ago"]);
    }

    #[test]
    fn test_datasets_follow_metrics() {
        let values: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        let chart = ChartData::from_summaries(&[summary(1, &values)], 2, 3);

        assert_eq!(chart.datasets.len(), 4);
        assert_eq!(chart.dataset(SeriesKind::Q75).unwrap().data, vec![0.75]);
        assert_eq!(chart.dataset(SeriesKind::Q95).unwrap().data, vec![0.95]);
        assert_eq!(chart.dataset(SeriesKind::Q99).unwrap().data, vec![0.99]);
        assert_eq!(chart.dataset(SeriesKind::Max).unwrap().data, vec![1.0]);
        assert_eq!(SeriesKind::Max.dash(), Some(10));
        assert_eq!(SeriesKind::Q75.dash(), None);
    }

    #[test]
    fn test_headline_rounds_latest_q75() {
        let chart = ChartData::from_summaries(
            &[summary(1, &[0.9]), summary(2, &[0.0123456789])],
            3,
            3,
        );
        assert_eq!(chart.headline(), Some(0.01235));
        assert_eq!(ChartData::default().headline(), None);
    }

    #[test]
    fn test_y_axis_max() {
        let quiet = ChartData::from_summaries(&[summary(1, &[0.1])], 2, 3);
        assert_eq!(quiet.y_axis_max(), Y_AXIS_SUGGESTED_MAX);

        let loud = ChartData::from_summaries(&[summary(1, &[0.8])], 2, 3);
        assert_eq!(loud.y_axis_max(), 0.8);
    }
}
