//! Progress metrics computation.

use aida_core::Baseline;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Readings considered for the snapshot.
pub const WINDOW: usize = 14;
/// Size of each half of the trend comparison.
pub const HALF_WINDOW: usize = 7;

const TREND_THRESHOLD_MG_DL: f64 = 10.0;

/// Direction of the 7-vs-7 comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum TrendLabel {
    /// Recent average at least 10 mg/dL lower.
    #[serde(rename = "BAJANDO")]
    Improving,
    /// Within ±10 mg/dL.
    #[serde(rename = "ESTABLE")]
    Stable,
    /// Recent average at least 10 mg/dL higher.
    #[serde(rename = "SUBIENDO")]
    Worsening,
    /// One of the halves has no readings.
    #[default]
    #[serde(rename = "INSUFICIENTE")]
    Insufficient,
}

impl TrendLabel {
    /// Classify a trend delta.
    pub fn from_delta(delta: Option<f64>) -> Self {
        match delta {
            None => Self::Insufficient,
            Some(d) if d <= -TREND_THRESHOLD_MG_DL => Self::Improving,
            Some(d) if d >= TREND_THRESHOLD_MG_DL => Self::Worsening,
            Some(_) => Self::Stable,
        }
    }

    /// Display label.
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Improving => "BAJANDO",
            Self::Stable => "ESTABLE",
            Self::Worsening => "SUBIENDO",
            Self::Insufficient => "INSUFICIENTE",
        }
    }
}

/// Derived snapshot. Undefined values are `None`, never 0 or NaN.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMetrics {
    /// A baseline has been recorded.
    pub has_baseline: bool,
    /// Baseline average glucose.
    pub baseline_avg_glucose: Option<u16>,
    /// Baseline A1c.
    pub baseline_a1c: Option<f64>,
    /// When the baseline was last written.
    pub baseline_set_at: Option<DateTime<Utc>>,

    /// Readings in the window.
    pub n14: usize,
    /// Readings in the most recent half.
    pub n7: usize,
    /// Readings in the previous half.
    pub n_prev7: usize,

    /// Mean over the window.
    pub avg14: Option<f64>,
    /// Mean over the most recent half.
    pub avg_last7: Option<f64>,
    /// Mean over the previous half.
    pub avg_prev7: Option<f64>,

    /// `avg_last7 - avg_prev7`; negative means improvement.
    pub trend_mg_dl: Option<f64>,
    /// Classification of the trend.
    pub trend_label: TrendLabel,

    /// Sample standard deviation over the window.
    pub sd14: Option<f64>,
    /// Lowest reading.
    pub min14: Option<u16>,
    /// Highest reading.
    pub max14: Option<u16>,

    /// Share of readings above 180 mg/dL.
    pub pct_over180: Option<f64>,
    /// Share of readings above 250 mg/dL.
    pub pct_over250: Option<f64>,
    /// Share of readings below 70 mg/dL.
    pub pct_under70: Option<f64>,

    /// A1c estimated from `avg14`.
    pub a1c_est_from_avg14: Option<f64>,
    /// A1c estimated from `avg_last7`.
    pub a1c_est_from_avg7: Option<f64>,

    /// `avg14 - baseline_avg_glucose`.
    pub delta_vs_baseline_mg_dl: Option<f64>,
    /// Relative change against the baseline average.
    pub delta_vs_baseline_pct: Option<f64>,
}

/// Compute the snapshot from readings ordered newest first.
///
/// Values past [`WINDOW`] are ignored.
pub fn compute_metrics(values_newest_first: &[u16], baseline: &Baseline) -> ProgressMetrics {
    let values14: Vec<f64> = values_newest_first
        .iter()
        .take(WINDOW)
        .map(|v| f64::from(*v))
        .collect();
    let split = values14.len().min(HALF_WINDOW);
    let (last7, prev7) = values14.split_at(split);

    let avg14 = mean(&values14);
    let avg_last7 = mean(last7);
    let avg_prev7 = mean(prev7);

    let trend = avg_last7.zip(avg_prev7).map(|(last, prev)| last - prev);

    let window = &values_newest_first[..values14.len()];
    let baseline_avg = baseline.avg_glucose;

    let delta_mg_dl = baseline_avg
        .zip(avg14)
        .map(|(base, avg)| avg - f64::from(base));
    let delta_pct = baseline_avg
        .filter(|b| *b != 0)
        .zip(avg14)
        .map(|(base, avg)| (avg - f64::from(base)) / f64::from(base) * 100.0);

    ProgressMetrics {
        has_baseline: baseline.is_set(),
        baseline_avg_glucose: baseline_avg,
        baseline_a1c: baseline.a1c,
        baseline_set_at: baseline.set_at,

        n14: values14.len(),
        n7: last7.len(),
        n_prev7: prev7.len(),

        avg14: avg14.map(round1),
        avg_last7: avg_last7.map(round1),
        avg_prev7: avg_prev7.map(round1),

        trend_mg_dl: trend.map(round1),
        trend_label: TrendLabel::from_delta(trend),

        sd14: sample_std_dev(&values14).map(round1),
        min14: window.iter().copied().min(),
        max14: window.iter().copied().max(),

        pct_over180: pct(window, |v| v > 180).map(round1),
        pct_over250: pct(window, |v| v > 250).map(round1),
        pct_under70: pct(window, |v| v < 70).map(round1),

        a1c_est_from_avg14: avg14.map(a1c_from_avg_glucose).map(round1),
        a1c_est_from_avg7: avg_last7.map(a1c_from_avg_glucose).map(round1),

        delta_vs_baseline_mg_dl: delta_mg_dl.map(round1),
        delta_vs_baseline_pct: delta_pct.map(round1),
    }
}

/// Linear A1c estimate from average glucose: `(avg + 46.7) / 28.7`.
pub fn a1c_from_avg_glucose(avg: f64) -> f64 {
    (avg + 46.7) / 28.7
}

/// Nearest whole number, ties toward positive infinity (`-2.5` gives `-2`).
/// Negative zero collapses to zero.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor() + 0.0
}

/// Round to one decimal, ties toward positive infinity.
pub fn round1(x: f64) -> f64 {
    round_half_up(x * 10.0) / 10.0 + 0.0
}

#[allow(clippy::cast_precision_loss)]
fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

#[allow(clippy::cast_precision_loss)]
fn sample_std_dev(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    let variance = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    Some(variance.sqrt())
}

#[allow(clippy::cast_precision_loss)]
fn pct(values: &[u16], pred: impl Fn(u16) -> bool) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let hits = values.iter().filter(|v| pred(**v)).count();
    Some(hits as f64 / values.len() as f64 * 100.0)
}
