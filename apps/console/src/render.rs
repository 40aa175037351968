//! Text rendering of orchestrator state: product banner, metric cards and the merged timeline.

use client_core::VisibilityController;
use shared::domain::{AccuracyMetrics, MergedPoint, Product, Series};

pub fn product_banner(product: &Product) -> String {
    format!(
        "Selected: {} | Category: {} | Price: ${}",
        product.name, product.category, product.unit_price
    )
}

pub fn metric_lines(metrics: &AccuracyMetrics) -> Vec<String> {
    vec![
        format!("Mean Absolute Error: {} units", metrics.display_mae()),
        format!("Mean Absolute % Error: {} %", metrics.display_mape()),
    ]
}

/// Tooltip-style labels for one point, skipping hidden series.
pub fn point_labels(point: &MergedPoint, visibility: &VisibilityController) -> Vec<String> {
    let mut labels = Vec::new();
    if let Some(actual) = point.actual {
        if !visibility.is_series_hidden(Series::Actual) {
            labels.push(format!("Actual Sales: {actual:.0} units"));
        }
    }
    if let Some(forecast) = point.forecast {
        if !visibility.is_series_hidden(Series::Forecast) {
            labels.push(format!("Forecast: {forecast:.0} units"));
        }
    }
    if let (Some(lower), Some(upper)) = (point.lower, point.upper) {
        if !visibility.is_series_hidden(Series::ConfidenceBand) {
            labels.push(format!("95% CI: [{lower:.0} - {upper:.0}] units"));
        }
    }
    labels
}

pub fn timeline(points: &[MergedPoint], visibility: &VisibilityController) -> Vec<String> {
    points
        .iter()
        .filter_map(|point| {
            let labels = point_labels(point, visibility);
            if labels.is_empty() {
                None
            } else {
                Some(format!("{}  {}", point.date.format("%Y-%m-%d"), labels.join(" | ")))
            }
        })
        .collect()
}

pub fn legend(visibility: &VisibilityController) -> String {
    Series::ALL
        .into_iter()
        .map(|series| {
            let marker = if visibility.is_series_hidden(series) {
                "[ ]"
            } else {
                "[x]"
            };
            format!("{marker} {} ({})", series.label(), series.key())
        })
        .collect::<Vec<_>>()
        .join("  ")
}
