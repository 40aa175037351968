use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    load_settings, normalize_api_base_url, spawn_worker, ForecastCommand, ForecastEvent,
    ForecastOrchestrator, Gateways, HealthGateway, HttpForecastClient, Phase,
};
use shared::domain::{ProductId, SelectionState};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(about = "Demand forecasts for retail products")]
struct Args {
    /// Backend API base url, e.g. http://127.0.0.1:5000/api
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    product_id: Option<i64>,
    #[arg(long)]
    history_days: Option<u32>,
    #[arg(long)]
    forecast_days: Option<u32>,
    /// Series to hide: actual, forecast, or upper/lower (confidence band). Repeatable.
    #[arg(long = "hide")]
    hidden_series: Vec<String>,
    /// Only re-fetch sales history.
    #[arg(long)]
    history_only: bool,
    /// Print the last persisted forecast instead of generating one.
    #[arg(long)]
    saved: bool,
    #[arg(long)]
    check_health: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = &args.api_url {
        settings.api_base_url = api_url.clone();
    }
    settings.api_base_url = normalize_api_base_url(&settings.api_base_url)?;
    let client = Arc::new(HttpForecastClient::new(&settings)?);
    info!(api = client.api_base_url(), "using forecasting backend");

    if args.check_health {
        let health = client.health().await.context("health check failed")?;
        println!(
            "backend {}: {}",
            health.status,
            health.timestamp.unwrap_or_default()
        );
        return Ok(());
    }

    if args.saved {
        let product_id = args
            .product_id
            .context("--saved requires --product-id")?;
        let saved = client.fetch_saved_forecast(ProductId(product_id)).await?;
        for row in saved {
            println!(
                "{}  {} [{} - {}] generated {}",
                row.point.date,
                row.point.predicted_quantity,
                row.point.lower_bound,
                row.point.upper_bound,
                row.generated_at.unwrap_or_default()
            );
        }
        return Ok(());
    }

    let orchestrator = ForecastOrchestrator::start(
        Gateways::shared(client.clone()),
        SelectionState {
            history_days: settings.history_days,
            forecast_days: settings.forecast_days,
            ..SelectionState::default()
        },
    )
    .await;
    if orchestrator.phase() == Phase::Failed {
        eprintln!("Failed to fetch products: {}", orchestrator.error());
    }

    let worker = spawn_worker(orchestrator);
    let mut events = worker.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ForecastEvent::StateChanged(snapshot) = event {
                info!(
                    request_id = snapshot.request_id,
                    phase = ?snapshot.phase,
                    "forecast state changed"
                );
            }
        }
    });

    let commands = worker.commands();
    let mut queued = Vec::new();
    if let Some(product_id) = args.product_id {
        queued.push(ForecastCommand::SelectProduct(ProductId(product_id)));
    }
    if let Some(days) = args.history_days {
        queued.push(ForecastCommand::SetHistoryDays(days));
    }
    if let Some(days) = args.forecast_days {
        queued.push(ForecastCommand::SetForecastDays(days));
    }
    queued.extend(
        args.hidden_series
            .iter()
            .cloned()
            .map(ForecastCommand::ToggleVisibility),
    );
    queued.push(if args.history_only {
        ForecastCommand::RefreshHistory
    } else {
        ForecastCommand::GenerateForecast
    });
    for command in queued {
        commands
            .send(command)
            .await
            .context("forecast worker stopped")?;
    }

    let orchestrator = worker.shutdown().await.context("forecast worker panicked")?;
    print_state(&orchestrator)?;

    if orchestrator.phase() == Phase::Failed {
        bail!("{}", orchestrator.error());
    }
    Ok(())
}

fn print_state(orchestrator: &ForecastOrchestrator) -> Result<()> {
    match orchestrator.selected_product() {
        Some(product) => println!("{}", render::product_banner(product)),
        None => println!("Select a product to view predictions"),
    }
    if let Some(metrics) = orchestrator.accuracy_metrics() {
        for line in render::metric_lines(metrics) {
            println!("{line}");
        }
    }

    let merged = orchestrator.merged()?;
    if merged.is_empty() {
        return Ok(());
    }
    println!("{}", render::legend(orchestrator.visibility()));
    for row in render::timeline(&merged, orchestrator.visibility()) {
        println!("{row}");
    }
    Ok(())
}
