//! Forecast orchestration: drives the gateways in dependency order and owns the
//! state the presentation layer reads.

use shared::{
    domain::{
        AccuracyMetrics, ForecastPoint, HistoricalPoint, MergedPoint, Product, ProductId,
        SelectionState,
    },
    error::ForecastError,
};
use tracing::{debug, info, warn};

use crate::{
    gateway::Gateways,
    merge::{MergeOptions, SeriesMerger},
    visibility::VisibilityController,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the pipeline and surface the error.
    Fatal,
    /// Log, leave the stage's result absent, continue.
    Degrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SubmitForecast,
    FetchAccuracy,
    FetchHistory,
}

impl Stage {
    pub fn policy(self) -> FailurePolicy {
        match self {
            Stage::SubmitForecast | Stage::FetchHistory => FailurePolicy::Fatal,
            Stage::FetchAccuracy => FailurePolicy::Degrade,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::SubmitForecast => "submit_forecast",
            Stage::FetchAccuracy => "fetch_accuracy",
            Stage::FetchHistory => "fetch_history",
        }
    }

    /// Checks only the part of the selection this stage sends to the backend.
    pub fn validate(self, selection: &SelectionState) -> Result<(), ForecastError> {
        match self {
            Stage::SubmitForecast => selection.validate_forecast(),
            Stage::FetchAccuracy => Ok(()),
            Stage::FetchHistory => selection.validate_history(),
        }
    }
}

pub const GENERATE_PIPELINE: &[Stage] = &[
    Stage::SubmitForecast,
    Stage::FetchAccuracy,
    Stage::FetchHistory,
];
pub const REFRESH_PIPELINE: &[Stage] = &[Stage::FetchHistory];

/// Everything the presentation layer may read. Only observable between operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSnapshot {
    pub request_id: u64,
    pub phase: Phase,
    pub selection: SelectionState,
    pub products: Vec<Product>,
    pub historical: Vec<HistoricalPoint>,
    pub forecast: Vec<ForecastPoint>,
    pub accuracy: Option<AccuracyMetrics>,
    pub error: String,
    pub merge_options: MergeOptions,
}

impl ForecastSnapshot {
    pub fn loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn selected_product(&self) -> Option<&Product> {
        let id = self.selection.selected_product_id?;
        self.products.iter().find(|product| product.id == id)
    }

    pub fn merged(&self) -> Result<Vec<MergedPoint>, ForecastError> {
        SeriesMerger::new(self.merge_options).merge(&self.historical, &self.forecast)
    }
}

pub struct ForecastOrchestrator {
    gateways: Gateways,
    state: ForecastSnapshot,
    visibility: VisibilityController,
}

impl ForecastOrchestrator {
    /// Fetches the catalog, the only time it is fetched, and selects its first entry.
    pub async fn start(gateways: Gateways, selection: SelectionState) -> Self {
        let mut orchestrator = Self {
            gateways,
            state: ForecastSnapshot {
                selection,
                ..ForecastSnapshot::default()
            },
            visibility: VisibilityController::new(),
        };
        orchestrator.load_catalog().await;
        orchestrator
    }

    pub fn with_merge_options(mut self, options: MergeOptions) -> Self {
        self.state.merge_options = options;
        self
    }

    async fn load_catalog(&mut self) {
        match self.gateways.catalog.fetch_catalog().await {
            Ok(products) => {
                info!(products = products.len(), "loaded product catalog");
                if let Some(first) = products.first() {
                    self.state.selection.selected_product_id = Some(first.id);
                }
                self.state.products = products;
            }
            Err(err) => {
                warn!(error = %err, "failed to load product catalog");
                self.state.phase = Phase::Failed;
                self.state.error = err.to_string();
            }
        }
    }

    pub fn snapshot(&self) -> &ForecastSnapshot {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn loading(&self) -> bool {
        self.state.loading()
    }

    pub fn error(&self) -> &str {
        &self.state.error
    }

    pub fn products(&self) -> &[Product] {
        &self.state.products
    }

    pub fn selected_product(&self) -> Option<&Product> {
        self.state.selected_product()
    }

    pub fn historical_data(&self) -> &[HistoricalPoint] {
        &self.state.historical
    }

    pub fn forecast_data(&self) -> &[ForecastPoint] {
        &self.state.forecast
    }

    pub fn accuracy_metrics(&self) -> Option<&AccuracyMetrics> {
        self.state.accuracy.as_ref()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.state.selection
    }

    pub fn select_product(&mut self, product_id: ProductId) {
        self.state.selection.selected_product_id = Some(product_id);
    }

    pub fn set_history_days(&mut self, days: u32) {
        self.state.selection.history_days = days;
    }

    pub fn set_forecast_days(&mut self, days: u32) {
        self.state.selection.forecast_days = days;
    }

    pub fn toggle_visibility(&mut self, series_name: &str) -> bool {
        self.visibility.toggle(series_name)
    }

    pub fn is_hidden(&self, series_name: &str) -> bool {
        self.visibility.is_hidden(series_name)
    }

    pub fn visibility(&self) -> &VisibilityController {
        &self.visibility
    }

    /// The current historical and forecast data as one timeline.
    pub fn merged(&self) -> Result<Vec<MergedPoint>, ForecastError> {
        self.state.merged()
    }

    /// submit forecast → accuracy (best effort) → history.
    pub async fn generate_forecast(&mut self) {
        self.run_pipeline(GENERATE_PIPELINE).await;
    }

    /// Re-fetches history alone, e.g. after the product or window changed.
    pub async fn refresh_history(&mut self) {
        self.run_pipeline(REFRESH_PIPELINE).await;
    }

    async fn run_pipeline(&mut self, stages: &[Stage]) {
        let Some(product_id) = self.state.selection.selected_product_id else {
            debug!("no product selected; ignoring request");
            return;
        };

        self.state.request_id += 1;
        let request_id = self.state.request_id;
        self.state.phase = Phase::Loading;
        self.state.error.clear();

        let selection = self.state.selection;
        if let Err(err) = stages.iter().try_for_each(|stage| stage.validate(&selection)) {
            self.fail(request_id, None, err);
            return;
        }

        for &stage in stages {
            let Err(err) = self.run_stage(stage, product_id, &selection).await else {
                continue;
            };
            match stage.policy() {
                FailurePolicy::Fatal => {
                    self.fail(request_id, Some(stage), err);
                    return;
                }
                FailurePolicy::Degrade => {
                    warn!(
                        request_id,
                        product_id = product_id.0,
                        stage = stage.name(),
                        error = %err,
                        "non-fatal stage failed; continuing"
                    );
                }
            }
        }

        self.state.phase = Phase::Succeeded;
        info!(
            request_id,
            product_id = product_id.0,
            historical = self.state.historical.len(),
            forecast = self.state.forecast.len(),
            "forecast data ready"
        );
    }

    async fn run_stage(
        &mut self,
        stage: Stage,
        product_id: ProductId,
        selection: &SelectionState,
    ) -> Result<(), ForecastError> {
        match stage {
            Stage::SubmitForecast => {
                let points = self
                    .gateways
                    .forecasts
                    .submit_forecast(product_id, selection.forecast_days)
                    .await?;
                self.state.forecast = points;
            }
            Stage::FetchAccuracy => {
                // Metrics from an earlier forecast must not sit next to a new one.
                self.state.accuracy = None;
                let metrics = self.gateways.forecasts.fetch_accuracy(product_id).await?;
                self.state.accuracy = Some(metrics);
            }
            Stage::FetchHistory => {
                let points = self
                    .gateways
                    .series
                    .fetch_history(product_id, selection.history_days)
                    .await?;
                self.state.historical = points;
            }
        }
        Ok(())
    }

    fn fail(&mut self, request_id: u64, stage: Option<Stage>, err: ForecastError) {
        warn!(
            request_id,
            stage = stage.map(Stage::name).unwrap_or("validate_selection"),
            kind = ?err.kind(),
            error = %err,
            "forecast request failed"
        );
        self.state.phase = Phase::Failed;
        self.state.error = err.to_string();
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
