use super::*;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{
    domain::{AccuracyMetrics, ForecastPoint, HistoricalPoint, Product, SelectionState},
    error::ForecastError,
    protocol::DecimalText,
};
use tokio::sync::{broadcast::error::RecvError, Mutex};

use crate::{
    gateway::{CatalogGateway, ForecastGateway, Gateways, SeriesGateway},
    orchestrator::Phase,
};

#[derive(Default)]
struct RecordingBackend {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl CatalogGateway for RecordingBackend {
    async fn fetch_catalog(&self) -> Result<Vec<Product>, ForecastError> {
        Ok(vec![
            Product {
                id: ProductId(3),
                name: "Lamp".to_string(),
                category: "Home".to_string(),
                unit_price: DecimalText::from("19.50"),
            },
            Product {
                id: ProductId(4),
                name: "Rug".to_string(),
                category: "Home".to_string(),
                unit_price: DecimalText::from("89.00"),
            },
        ])
    }
}

#[async_trait]
impl SeriesGateway for RecordingBackend {
    async fn fetch_history(
        &self,
        product_id: ProductId,
        days_back: u32,
    ) -> Result<Vec<HistoricalPoint>, ForecastError> {
        self.calls
            .lock()
            .await
            .push(format!("history:{}:{days_back}", product_id.0));
        Ok(vec![HistoricalPoint {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
            quantity_sold: DecimalText::Number(3.0),
            total_amount: None,
        }])
    }
}

#[async_trait]
impl ForecastGateway for RecordingBackend {
    async fn submit_forecast(
        &self,
        product_id: ProductId,
        horizon_days: u32,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        self.calls
            .lock()
            .await
            .push(format!("forecast:{}:{horizon_days}", product_id.0));
        Ok(vec![ForecastPoint {
            date: NaiveDate::from_ymd_opt(2024, 5, 2).expect("date"),
            predicted_quantity: DecimalText::Number(4.0),
            lower_bound: DecimalText::Number(2.0),
            upper_bound: DecimalText::Number(6.0),
        }])
    }

    async fn fetch_accuracy(&self, _product_id: ProductId) -> Result<AccuracyMetrics, ForecastError> {
        Err(ForecastError::validation(
            "Insufficient data for accuracy calculation",
        ))
    }
}

async fn next_state(events: &mut broadcast::Receiver<ForecastEvent>) -> ForecastSnapshot {
    loop {
        match events.recv().await {
            Ok(ForecastEvent::StateChanged(snapshot)) => return snapshot,
            Ok(ForecastEvent::VisibilityChanged { .. }) => continue,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("worker closed the event channel"),
        }
    }
}

#[tokio::test]
async fn commands_run_in_arrival_order() {
    let backend = Arc::new(RecordingBackend::default());
    let orchestrator =
        ForecastOrchestrator::start(Gateways::shared(backend.clone()), SelectionState::default())
            .await;
    let worker = spawn_worker(orchestrator);
    let mut events = worker.subscribe();
    let commands = worker.commands();

    commands
        .send(ForecastCommand::SelectProduct(ProductId(4)))
        .await
        .expect("send");
    commands
        .send(ForecastCommand::SetForecastDays(14))
        .await
        .expect("send");
    commands
        .send(ForecastCommand::GenerateForecast)
        .await
        .expect("send");
    commands
        .send(ForecastCommand::GenerateForecast)
        .await
        .expect("send");

    let mut last = next_state(&mut events).await;
    while last.request_id < 2 {
        last = next_state(&mut events).await;
    }

    assert_eq!(last.phase, Phase::Succeeded);
    assert_eq!(last.selection.selected_product_id, Some(ProductId(4)));
    assert!(last.accuracy.is_none());
    assert_eq!(last.merged().expect("merge").len(), 2);
    assert_eq!(
        *backend.calls.lock().await,
        vec![
            "forecast:4:14",
            "history:4:90",
            "forecast:4:14",
            "history:4:90",
        ]
    );

    let orchestrator = worker.shutdown().await.expect("join worker");
    assert_eq!(orchestrator.snapshot().request_id, 2);
}

#[tokio::test]
async fn visibility_toggle_emits_visibility_event_only() {
    let backend = Arc::new(RecordingBackend::default());
    let orchestrator =
        ForecastOrchestrator::start(Gateways::shared(backend.clone()), SelectionState::default())
            .await;
    let worker = spawn_worker(orchestrator);
    let mut events = worker.subscribe();

    let mut status = String::new();
    dispatch_command(
        &worker.commands(),
        ForecastCommand::ToggleVisibility("forecast".to_string()),
        &mut status,
    );
    assert!(status.is_empty());

    match events.recv().await.expect("event") {
        ForecastEvent::VisibilityChanged { series, hidden } => {
            assert_eq!(series, "forecast");
            assert!(hidden);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let orchestrator = worker.shutdown().await.expect("join worker");
    assert!(orchestrator.is_hidden("forecast"));
    assert!(backend.calls.lock().await.is_empty());
}

#[tokio::test]
async fn dispatch_reports_stopped_worker() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let mut status = String::new();

    dispatch_command(&tx, ForecastCommand::RefreshHistory, &mut status);

    assert!(status.contains("stopped"), "{status}");
}

#[tokio::test]
async fn dispatch_reports_full_queue() {
    let (tx, _rx) = mpsc::channel(1);
    let mut status = String::new();

    dispatch_command(&tx, ForecastCommand::RefreshHistory, &mut status);
    assert!(status.is_empty());
    dispatch_command(&tx, ForecastCommand::RefreshHistory, &mut status);

    assert!(status.contains("full"), "{status}");
}
