//! Background worker that owns the orchestrator and serializes presentation commands.

use shared::domain::ProductId;
use tokio::{
    sync::{
        broadcast,
        mpsc::{self, error::TrySendError},
    },
    task::JoinHandle,
};
use tracing::debug;

use crate::orchestrator::{ForecastOrchestrator, ForecastSnapshot};

const COMMAND_QUEUE_CAPACITY: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastCommand {
    SelectProduct(ProductId),
    SetHistoryDays(u32),
    SetForecastDays(u32),
    GenerateForecast,
    RefreshHistory,
    ToggleVisibility(String),
    Shutdown,
}

impl ForecastCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ForecastCommand::SelectProduct(_) => "select_product",
            ForecastCommand::SetHistoryDays(_) => "set_history_days",
            ForecastCommand::SetForecastDays(_) => "set_forecast_days",
            ForecastCommand::GenerateForecast => "generate_forecast",
            ForecastCommand::RefreshHistory => "refresh_history",
            ForecastCommand::ToggleVisibility(_) => "toggle_visibility",
            ForecastCommand::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ForecastEvent {
    StateChanged(ForecastSnapshot),
    VisibilityChanged { series: String, hidden: bool },
}

pub struct WorkerHandle {
    commands: mpsc::Sender<ForecastCommand>,
    events: broadcast::Sender<ForecastEvent>,
    task: JoinHandle<ForecastOrchestrator>,
}

impl WorkerHandle {
    pub fn commands(&self) -> mpsc::Sender<ForecastCommand> {
        self.commands.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ForecastEvent> {
        self.events.subscribe()
    }

    /// Stops the worker after the queued commands and hands the orchestrator back.
    pub async fn shutdown(self) -> Result<ForecastOrchestrator, tokio::task::JoinError> {
        let _ = self.commands.send(ForecastCommand::Shutdown).await;
        self.task.await
    }
}

/// Commands run one at a time in arrival order; a request sent while another is
/// in flight waits in the queue.
pub fn spawn_worker(mut orchestrator: ForecastOrchestrator) -> WorkerHandle {
    let (commands, mut rx) = mpsc::channel::<ForecastCommand>(COMMAND_QUEUE_CAPACITY);
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let events_tx = events.clone();

    let task = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            debug!(command = command.name(), "processing forecast command");
            match command {
                ForecastCommand::SelectProduct(product_id) => {
                    orchestrator.select_product(product_id)
                }
                ForecastCommand::SetHistoryDays(days) => orchestrator.set_history_days(days),
                ForecastCommand::SetForecastDays(days) => orchestrator.set_forecast_days(days),
                ForecastCommand::GenerateForecast => orchestrator.generate_forecast().await,
                ForecastCommand::RefreshHistory => orchestrator.refresh_history().await,
                ForecastCommand::ToggleVisibility(series) => {
                    let hidden = orchestrator.toggle_visibility(&series);
                    let _ = events_tx.send(ForecastEvent::VisibilityChanged { series, hidden });
                    continue;
                }
                ForecastCommand::Shutdown => break,
            }
            let _ = events_tx.send(ForecastEvent::StateChanged(orchestrator.snapshot().clone()));
        }
        orchestrator
    });

    WorkerHandle {
        commands,
        events,
        task,
    }
}

/// Non-blocking enqueue; queue problems are reported through `status`.
pub fn dispatch_command(
    cmd_tx: &mpsc::Sender<ForecastCommand>,
    cmd: ForecastCommand,
    status: &mut String,
) {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => debug!(command = cmd_name, "queued forecast command"),
        Err(TrySendError::Full(_)) => {
            *status = "Forecast command queue is full; please retry".to_string();
        }
        Err(TrySendError::Closed(_)) => {
            *status = "Forecast worker stopped; restart the session".to_string();
        }
    }
}

#[cfg(test)]
#[path = "tests/worker_tests.rs"]
mod tests;
