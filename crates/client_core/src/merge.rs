//! Reconciles the historical and forecast series into one chart timeline.

use shared::{
    domain::{ForecastPoint, HistoricalPoint, MergedPoint},
    error::ForecastError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Reject forecast points whose prediction falls outside their own bounds.
    pub validate_bounds: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            validate_bounds: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesMerger {
    options: MergeOptions,
}

impl SeriesMerger {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Historical points first, then forecast points, each in source order.
    /// Dates are neither sorted nor de-duplicated.
    pub fn merge(
        &self,
        historical: &[HistoricalPoint],
        forecast: &[ForecastPoint],
    ) -> Result<Vec<MergedPoint>, ForecastError> {
        let mut merged = Vec::with_capacity(historical.len() + forecast.len());

        for point in historical {
            merged.push(MergedPoint {
                date: point.date,
                actual: Some(
                    point
                        .quantity_sold
                        .parse(&format!("history {} quantity_sold", point.date))?,
                ),
                forecast: None,
                lower: None,
                upper: None,
            });
        }

        for point in forecast {
            merged.push(self.forecast_point(point)?);
        }

        Ok(merged)
    }

    fn forecast_point(&self, point: &ForecastPoint) -> Result<MergedPoint, ForecastError> {
        let field = |name: &str| format!("forecast {} {name}", point.date);
        let predicted = point.predicted_quantity.parse(&field("predicted_quantity"))?;
        let lower = point.lower_bound.parse(&field("lower_bound"))?;
        let upper = point.upper_bound.parse(&field("upper_bound"))?;

        if self.options.validate_bounds && !(lower <= predicted && predicted <= upper) {
            return Err(ForecastError::data_format(format!(
                "forecast {}: prediction {predicted} outside bounds [{lower}, {upper}]",
                point.date
            )));
        }

        Ok(MergedPoint {
            date: point.date,
            actual: None,
            forecast: Some(predicted),
            lower: Some(lower),
            upper: Some(upper),
        })
    }
}

pub fn merge(
    historical: &[HistoricalPoint],
    forecast: &[ForecastPoint],
) -> Result<Vec<MergedPoint>, ForecastError> {
    SeriesMerger::default().merge(historical, forecast)
}
