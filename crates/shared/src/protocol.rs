use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        AccuracyMetrics, ForecastPoint, HistoricalPoint, Product, ProductId, SavedForecastPoint,
    },
    error::ForecastError,
};

/// A numeric field exactly as the backend sent it: a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecimalText {
    Number(f64),
    Text(String),
}

impl DecimalText {
    /// Parses into a finite `f64`. `NaN`, infinities and non-numeric text are rejected.
    pub fn parse(&self, field: &str) -> Result<f64, ForecastError> {
        let value = match self {
            DecimalText::Number(value) => *value,
            DecimalText::Text(raw) => raw.trim().parse::<f64>().map_err(|_| {
                ForecastError::data_format(format!("{field}: '{raw}' is not a number"))
            })?,
        };
        if !value.is_finite() {
            return Err(ForecastError::data_format(format!(
                "{field}: '{self}' is not a finite number"
            )));
        }
        Ok(value)
    }
}

impl fmt::Display for DecimalText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalText::Number(value) => write!(f, "{value}"),
            DecimalText::Text(raw) => f.write_str(raw),
        }
    }
}

impl From<f64> for DecimalText {
    fn from(value: f64) -> Self {
        DecimalText::Number(value)
    }
}

impl From<&str> for DecimalText {
    fn from(value: &str) -> Self {
        DecimalText::Text(value.to_string())
    }
}

/// Accepts `YYYY-MM-DD` and ISO datetimes, with or without a UTC offset.
pub fn parse_wire_date(raw: &str) -> Result<NaiveDate, ForecastError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(datetime.date());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|datetime| datetime.date_naive())
        .map_err(|_| ForecastError::transport(format!("invalid date '{raw}' in response")))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: i64,
    pub product_name: String,
    #[serde(default)]
    pub category: String,
    pub unit_price: DecimalText,
}

impl From<ProductRecord> for Product {
    fn from(record: ProductRecord) -> Self {
        Product {
            id: ProductId(record.product_id),
            name: record.product_name,
            category: record.category,
            unit_price: record.unit_price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub sale_date: String,
    pub quantity_sold: DecimalText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<DecimalText>,
}

impl TryFrom<HistoricalRecord> for HistoricalPoint {
    type Error = ForecastError;

    fn try_from(record: HistoricalRecord) -> Result<Self, Self::Error> {
        Ok(HistoricalPoint {
            date: parse_wire_date(&record.sale_date)?,
            quantity_sold: record.quantity_sold,
            total_amount: record.total_amount,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub product_id: i64,
    pub days_back: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub product_id: i64,
    pub forecast_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub forecast_date: String,
    pub predicted_quantity: DecimalText,
    pub lower_bound: DecimalText,
    pub upper_bound: DecimalText,
}

impl TryFrom<ForecastRecord> for ForecastPoint {
    type Error = ForecastError;

    fn try_from(record: ForecastRecord) -> Result<Self, Self::Error> {
        Ok(ForecastPoint {
            date: parse_wire_date(&record.forecast_date)?,
            predicted_quantity: record.predicted_quantity,
            lower_bound: record.lower_bound,
            upper_bound: record.upper_bound,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    pub forecast: Vec<ForecastRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedForecastRecord {
    #[serde(flatten)]
    pub forecast: ForecastRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<DecimalText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

impl TryFrom<SavedForecastRecord> for SavedForecastPoint {
    type Error = ForecastError;

    fn try_from(record: SavedForecastRecord) -> Result<Self, Self::Error> {
        Ok(SavedForecastPoint {
            point: record.forecast.try_into()?,
            confidence_level: record.confidence_level,
            generated_at: record.generated_at,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccuracyResponse {
    #[serde(default)]
    pub mae: Option<DecimalText>,
    #[serde(default)]
    pub mape: Option<DecimalText>,
}

impl AccuracyResponse {
    /// Decodes an accuracy body. The backend writes undefined metrics as bare
    /// `NaN`/`Infinity` tokens; those read as absent.
    pub fn from_json(raw: &str) -> Result<Self, ForecastError> {
        serde_json::from_str(&null_non_finite_tokens(raw)).map_err(|err| {
            ForecastError::transport(format!("invalid accuracy response: {err}"))
        })
    }
}

fn null_non_finite_tokens(raw: &str) -> String {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut in_string = false;
    let mut escaped = false;
    while let Some(ch) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
        } else if let Some(token) = TOKENS.iter().find(|token| rest.starts_with(**token)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

impl From<AccuracyResponse> for AccuracyMetrics {
    fn from(response: AccuracyResponse) -> Self {
        let finite = |value: Option<DecimalText>, field: &str| {
            value.and_then(|raw| raw.parse(field).ok())
        };
        AccuracyMetrics {
            mean_absolute_error: finite(response.mae, "mae"),
            mean_absolute_percent_error: finite(response.mape, "mape"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_text_accepts_numbers_and_strings() {
        let number: DecimalText = serde_json::from_str("12.5").expect("number");
        let text: DecimalText = serde_json::from_str("\"7.25\"").expect("text");
        assert_eq!(number.parse("q").expect("parse"), 12.5);
        assert_eq!(text.parse("q").expect("parse"), 7.25);
    }

    #[test]
    fn decimal_text_rejects_nan_and_garbage() {
        let nan = DecimalText::from("NaN");
        let garbage = DecimalText::from("twelve");
        assert!(matches!(nan.parse("q"), Err(ForecastError::DataFormat(_))));
        assert!(matches!(
            garbage.parse("q"),
            Err(ForecastError::DataFormat(_))
        ));
    }

    #[test]
    fn wire_dates_accept_plain_dates_and_datetimes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).expect("date");
        assert_eq!(parse_wire_date("2024-03-09").expect("date"), expected);
        assert_eq!(
            parse_wire_date("2024-03-09T00:00:00").expect("datetime"),
            expected
        );
        assert_eq!(
            parse_wire_date("2024-03-09T08:30:00+00:00").expect("offset datetime"),
            expected
        );
        assert!(parse_wire_date("09/03/2024").is_err());
        assert!(parse_wire_date("2024-03-09Tgarbage").is_err());
    }

    #[test]
    fn accuracy_response_drops_non_finite_metrics() {
        let response: AccuracyResponse =
            serde_json::from_str(r#"{"mae":3.5,"mape":"NaN"}"#).expect("decode");
        let metrics = AccuracyMetrics::from(response);
        assert_eq!(metrics.mean_absolute_error, Some(3.5));
        assert_eq!(metrics.mean_absolute_percent_error, None);
        assert_eq!(metrics.display_mape(), "N/A");
        assert_eq!(metrics.display_mae(), "3.50");
    }

    #[test]
    fn accuracy_body_with_bare_non_finite_tokens_keeps_finite_metric() {
        let metrics = AccuracyMetrics::from(
            AccuracyResponse::from_json(r#"{"mae":2.5,"mape":NaN}"#).expect("decode"),
        );
        assert_eq!(metrics.mean_absolute_error, Some(2.5));
        assert_eq!(metrics.mean_absolute_percent_error, None);

        let infinite = AccuracyMetrics::from(
            AccuracyResponse::from_json(r#"{"mae": -Infinity, "mape": Infinity}"#)
                .expect("decode"),
        );
        assert_eq!(infinite, AccuracyMetrics::default());
    }

    #[test]
    fn non_finite_tokens_inside_strings_are_left_alone() {
        assert_eq!(
            null_non_finite_tokens(r#"{"note":"NaN \"Infinity\"","mae":NaN}"#),
            r#"{"note":"NaN \"Infinity\"","mae":null}"#
        );
        assert!(AccuracyResponse::from_json("{\"mae\":").is_err());
    }

    #[test]
    fn product_record_maps_backend_fields() {
        let record: ProductRecord = serde_json::from_str(
            r#"{"product_id":1,"product_name":"Widget","category":"Tools","unit_price":"9.99"}"#,
        )
        .expect("decode");
        let product = Product::from(record);
        assert_eq!(product.id, ProductId(1));
        assert_eq!(product.name, "Widget");
        assert_eq!(product.unit_price.to_string(), "9.99");
    }
}
