//! Run configuration for the report pipeline.

use std::path::PathBuf;

use crate::filter::ThresholdPolicy;
use crate::temporal::TimestampPolicy;

/// Cutoff policy of each "metric above threshold" report. Each report keeps
/// its own policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub anchorage_wait: ThresholdPolicy,
    pub etb_delay: ThresholdPolicy,
    pub dwell: ThresholdPolicy,
    pub customs_delay: ThresholdPolicy,
    /// Minimum FOB value per kg for the high-value section ranking.
    pub high_value_per_kg: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            anchorage_wait: ThresholdPolicy::Quantile(0.75),
            etb_delay: ThresholdPolicy::Fixed(1.0),
            dwell: ThresholdPolicy::Mean,
            customs_delay: ThresholdPolicy::Fixed(1.0),
            high_value_per_kg: 50.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub vessel_path: PathBuf,
    pub trade_path: PathBuf,
    pub output_dir: PathBuf,
    /// Year of the trade column headers and of the movement seasonality view.
    pub report_year: i32,
    /// Timestamp parsing for the dashboard load; the delay tables always
    /// parse leniently.
    pub timestamps: TimestampPolicy,
    pub thresholds: Thresholds,
    pub top_n: usize,
    pub preview_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            vessel_path: PathBuf::from("vessel_calls.xlsx"),
            trade_path: PathBuf::from("trade.xlsx"),
            output_dir: PathBuf::from("."),
            report_year: 2024,
            timestamps: TimestampPolicy::default(),
            thresholds: Thresholds::default(),
            top_n: 10,
            preview_rows: 5,
        }
    }
}
