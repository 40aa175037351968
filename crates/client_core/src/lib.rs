pub mod config;
pub mod gateway;
pub mod merge;
pub mod orchestrator;
pub mod visibility;
pub mod worker;

pub use config::{load_settings, normalize_api_base_url, ClientSettings};
pub use gateway::{
    CatalogGateway, ForecastGateway, Gateways, HealthGateway, HttpForecastClient, SeriesGateway,
};
pub use merge::{merge, MergeOptions, SeriesMerger};
pub use orchestrator::{
    FailurePolicy, ForecastOrchestrator, ForecastSnapshot, Phase, Stage, GENERATE_PIPELINE,
    REFRESH_PIPELINE,
};
pub use visibility::VisibilityController;
pub use worker::{dispatch_command, spawn_worker, ForecastCommand, ForecastEvent, WorkerHandle};
