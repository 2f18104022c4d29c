//! Display helpers for the dashboard: stride downsampling and metric formatting.

use std::collections::BTreeMap;

use serde::Serialize;

use super::record::{EvaluationRecord, MetricValue};

/// Stride the dashboard uses unless told otherwise.
pub const DEFAULT_STRIDE: usize = 5;

/// Metric shown as a percentage rather than a raw value.
pub const ACCURACY_METRIC: &str = "Accuracy";

/// One kept sample of a downsampled series. `index` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub index: usize,
    pub value: f64,
}

/// Keep every `stride`-th element (positions `0, stride, 2*stride, …`) and
/// re-index the kept elements from 1.
///
/// The result has `ceil(series.len() / stride)` points. A stride of 0 is
/// treated as 1.
///
/// # Example
///
/// ```rust
/// use rul_core::evaluation::{downsample, SeriesPoint};
///
/// let series: Vec<f64> = (1..=10).map(f64::from).collect();
/// let points = downsample(&series, 5);
///
/// assert_eq!(
///     points,
///     vec![
///         SeriesPoint { index: 1, value: 1.0 },
///         SeriesPoint { index: 2, value: 6.0 },
///     ]
/// );
/// ```
pub fn downsample(series: &[f64], stride: usize) -> Vec<SeriesPoint> {
    series
        .iter()
        .step_by(stride.max(1))
        .enumerate()
        .map(|(i, &value)| SeriesPoint {
            index: i + 1,
            value,
        })
        .collect()
}

/// Format a metric for display.
///
/// `Accuracy` is shown as a percentage with two decimals, everything else
/// with four decimals.
pub fn format_metric(name: &str, value: f64) -> String {
    if name == ACCURACY_METRIC {
        format!("{:.2}%", value * 100.0)
    } else {
        format!("{:.4}", value)
    }
}

/// A record reduced for compact display. Built per request, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySeries {
    pub model_name: String,
    pub points: Vec<SeriesPoint>,
    pub calculations: BTreeMap<String, MetricValue>,
}

impl DisplaySeries {
    pub fn from_record(record: &EvaluationRecord, stride: usize) -> Self {
        Self {
            model_name: record.model_name.clone(),
            points: downsample(&record.predictions, stride),
            calculations: record.calculations.clone(),
        }
    }

    /// Calculations rendered with [`format_metric`].
    pub fn formatted_calculations(&self) -> BTreeMap<String, String> {
        self.calculations
            .iter()
            .map(|(name, metric)| (name.clone(), format_metric(name, metric.value())))
            .collect()
    }
}
