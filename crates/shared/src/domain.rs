use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{error::ForecastError, protocol::DecimalText};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(ProductId);

pub const HISTORY_DAYS_RANGE: RangeInclusive<u32> = 30..=730;
pub const FORECAST_DAYS_RANGE: RangeInclusive<u32> = 7..=90;
pub const DEFAULT_HISTORY_DAYS: u32 = 90;
pub const DEFAULT_FORECAST_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub unit_price: DecimalText,
}

/// One observed day of sales. Quantities stay in their wire representation
/// until the merge parses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub quantity_sold: DecimalText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<DecimalText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_quantity: DecimalText,
    pub lower_bound: DecimalText,
    pub upper_bound: DecimalText,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub mean_absolute_error: Option<f64>,
    pub mean_absolute_percent_error: Option<f64>,
}

impl AccuracyMetrics {
    pub fn display_mae(&self) -> String {
        display_metric(self.mean_absolute_error)
    }

    pub fn display_mape(&self) -> String {
        display_metric(self.mean_absolute_percent_error)
    }
}

fn display_metric(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => "N/A".to_string(),
    }
}

/// A persisted forecast row as returned by the saved-forecast endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedForecastPoint {
    pub point: ForecastPoint,
    pub confidence_level: Option<DecimalText>,
    pub generated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergedPoint {
    pub date: NaiveDate,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected_product_id: Option<ProductId>,
    pub history_days: u32,
    pub forecast_days: u32,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            selected_product_id: None,
            history_days: DEFAULT_HISTORY_DAYS,
            forecast_days: DEFAULT_FORECAST_DAYS,
        }
    }
}

impl SelectionState {
    pub fn validate(&self) -> Result<(), ForecastError> {
        self.validate_history()?;
        self.validate_forecast()
    }

    pub fn validate_history(&self) -> Result<(), ForecastError> {
        check_range("history window", &HISTORY_DAYS_RANGE, self.history_days)
    }

    pub fn validate_forecast(&self) -> Result<(), ForecastError> {
        check_range("forecast horizon", &FORECAST_DAYS_RANGE, self.forecast_days)
    }
}

fn check_range(what: &str, range: &RangeInclusive<u32>, days: u32) -> Result<(), ForecastError> {
    if range.contains(&days) {
        return Ok(());
    }
    Err(ForecastError::Validation(format!(
        "{what} must be between {} and {} days, got {days}",
        range.start(),
        range.end()
    )))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    Actual,
    Forecast,
    ConfidenceBand,
}

impl Series {
    pub const ALL: [Series; 3] = [Series::Actual, Series::Forecast, Series::ConfidenceBand];

    /// Visibility key. The band is keyed by its upper bound, which also hides the lower one.
    pub fn key(self) -> &'static str {
        match self {
            Series::Actual => "actual",
            Series::Forecast => "forecast",
            Series::ConfidenceBand => "upper",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Series::Actual => "Actual Sales",
            Series::Forecast => "Forecasted Sales",
            Series::ConfidenceBand => "95% Confidence Interval",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "actual" => Some(Series::Actual),
            "forecast" => Some(Series::Forecast),
            "upper" | "lower" => Some(Series::ConfidenceBand),
            _ => None,
        }
    }
}
