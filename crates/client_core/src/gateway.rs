//! Remote gateways for the forecasting backend and their reqwest-backed implementation.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{
        AccuracyMetrics, ForecastPoint, HistoricalPoint, Product, ProductId, SavedForecastPoint,
    },
    error::{ErrorBody, ForecastError},
    protocol::{
        AccuracyResponse, ForecastRequest, ForecastResponse, HealthResponse, HistoricalRecord,
        HistoryQuery, ProductRecord, SavedForecastRecord,
    },
};
use tracing::debug;

use crate::config::ClientSettings;

#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Vec<Product>, ForecastError>;
}

#[async_trait]
pub trait SeriesGateway: Send + Sync {
    async fn fetch_history(
        &self,
        product_id: ProductId,
        days_back: u32,
    ) -> Result<Vec<HistoricalPoint>, ForecastError>;
}

#[async_trait]
pub trait ForecastGateway: Send + Sync {
    async fn submit_forecast(
        &self,
        product_id: ProductId,
        horizon_days: u32,
    ) -> Result<Vec<ForecastPoint>, ForecastError>;
    async fn fetch_accuracy(&self, product_id: ProductId) -> Result<AccuracyMetrics, ForecastError>;
}

#[async_trait]
pub trait HealthGateway: Send + Sync {
    async fn health(&self) -> Result<HealthResponse, ForecastError>;
}

/// The three collaborators the orchestrator drives.
#[derive(Clone)]
pub struct Gateways {
    pub catalog: Arc<dyn CatalogGateway>,
    pub series: Arc<dyn SeriesGateway>,
    pub forecasts: Arc<dyn ForecastGateway>,
}

impl Gateways {
    pub fn new(
        catalog: Arc<dyn CatalogGateway>,
        series: Arc<dyn SeriesGateway>,
        forecasts: Arc<dyn ForecastGateway>,
    ) -> Self {
        Self {
            catalog,
            series,
            forecasts,
        }
    }

    /// Uses one backend for every gateway.
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: CatalogGateway + SeriesGateway + ForecastGateway + 'static,
    {
        Self {
            catalog: backend.clone(),
            series: backend.clone(),
            forecasts: backend,
        }
    }
}

pub struct HttpForecastClient {
    http: Client,
    api_base_url: String,
}

impl HttpForecastClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ForecastError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(transport)?;
        Ok(Self {
            http,
            api_base_url: settings.api_base_url.clone(),
        })
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Last forecast the backend persisted for `product_id`.
    pub async fn fetch_saved_forecast(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<SavedForecastPoint>, ForecastError> {
        let response = self
            .http
            .get(format!("{}/forecast/{}", self.api_base_url, product_id.0))
            .send()
            .await
            .map_err(transport)?;
        let records: Vec<SavedForecastRecord> = decode(response).await?;
        records.into_iter().map(SavedForecastPoint::try_from).collect()
    }
}

#[async_trait]
impl CatalogGateway for HttpForecastClient {
    async fn fetch_catalog(&self) -> Result<Vec<Product>, ForecastError> {
        let response = self
            .http
            .get(format!("{}/products", self.api_base_url))
            .send()
            .await
            .map_err(transport)?;
        let records: Vec<ProductRecord> = decode(response).await?;
        debug!(products = records.len(), "fetched product catalog");
        Ok(records.into_iter().map(Product::from).collect())
    }
}

#[async_trait]
impl SeriesGateway for HttpForecastClient {
    async fn fetch_history(
        &self,
        product_id: ProductId,
        days_back: u32,
    ) -> Result<Vec<HistoricalPoint>, ForecastError> {
        let response = self
            .http
            .get(format!("{}/historical", self.api_base_url))
            .query(&HistoryQuery {
                product_id: product_id.0,
                days_back,
            })
            .send()
            .await
            .map_err(transport)?;
        let records: Vec<HistoricalRecord> = decode(response).await?;
        debug!(
            product_id = product_id.0,
            days_back,
            points = records.len(),
            "fetched sales history"
        );
        records.into_iter().map(HistoricalPoint::try_from).collect()
    }
}

#[async_trait]
impl ForecastGateway for HttpForecastClient {
    async fn submit_forecast(
        &self,
        product_id: ProductId,
        horizon_days: u32,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        let response = self
            .http
            .post(format!("{}/forecast", self.api_base_url))
            .json(&ForecastRequest {
                product_id: product_id.0,
                forecast_days: horizon_days,
            })
            .send()
            .await
            .map_err(transport)?;
        let body: ForecastResponse = decode(response).await?;
        debug!(
            product_id = product_id.0,
            horizon_days,
            points = body.forecast.len(),
            "received forecast"
        );
        body.forecast
            .into_iter()
            .map(ForecastPoint::try_from)
            .collect()
    }

    async fn fetch_accuracy(&self, product_id: ProductId) -> Result<AccuracyMetrics, ForecastError> {
        let response = self
            .http
            .get(format!("{}/accuracy/{}", self.api_base_url, product_id.0))
            .send()
            .await
            .map_err(transport)?;
        let raw = check_status(response)
            .await?
            .text()
            .await
            .map_err(transport)?;
        Ok(AccuracyResponse::from_json(&raw)?.into())
    }
}

#[async_trait]
impl HealthGateway for HttpForecastClient {
    async fn health(&self) -> Result<HealthResponse, ForecastError> {
        let response = self
            .http
            .get(format!("{}/health", self.api_base_url))
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }
}

fn transport(err: reqwest::Error) -> ForecastError {
    ForecastError::Transport(err.to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ForecastError> {
    check_status(response)
        .await?
        .json::<T>()
        .await
        .map_err(transport)
}

/// 4xx responses are the backend rejecting the request; anything else non-2xx is transport.
async fn check_status(response: Response) -> Result<Response, ForecastError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) if !body.error.is_empty() => body.error,
        _ => status.to_string(),
    };
    if status.is_client_error() {
        Err(ForecastError::Validation(message))
    } else {
        Err(ForecastError::Transport(message))
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
