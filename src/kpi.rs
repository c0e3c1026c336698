//! Scalar KPI derivation over heterogeneous result rows.

use crate::executor::ResultRecord;

/// Mean of every numeric `metric` value across the records, rounded to two
/// decimals (half away from zero). Null, string or absent metrics are
/// ignored, not errors. `None` means "no numeric signal", which is distinct
/// from a signal of zero.
pub fn mean_metric(records: &[ResultRecord]) -> Option<f64> {
    let metrics: Vec<f64> = records
        .iter()
        .filter_map(|record| record.get("metric").and_then(|v| v.as_f64()))
        .collect();

    if metrics.is_empty() {
        return None;
    }

    let mean = metrics.iter().sum::<f64>() / metrics.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}
