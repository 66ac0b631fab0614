use std::sync::{Arc, Mutex};

use actix_web::web;
use tracing_subscriber::EnvFilter;

use crate::application::DashboardUseCase;
use crate::domain::error::Result;
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::infrastructure::db::connection::connect_pool;
use crate::infrastructure::db::store::StoreGateway;
use crate::infrastructure::export::XlsxExporter;
use crate::interfaces::http::{add_log, start_server, HttpState};

pub fn run() -> Result<()> {
    let config = ConfigService::load()?;

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    actix_web::rt::System::new().block_on(serve(config))
}

async fn serve(config: AppConfig) -> Result<()> {
    let pool = connect_pool(&config.store).await.map_err(|err| {
        tracing::error!(error = %err, "Failed to open store");
        err
    })?;

    let store = Arc::new(StoreGateway::new(pool, config.store.date_policy));
    let dashboard = Arc::new(DashboardUseCase::new(store, Arc::new(XlsxExporter)));

    let logs = Arc::new(Mutex::new(Vec::new()));
    add_log(&logs, "INFO", "App", "Dashboard service started");

    let state = web::Data::new(HttpState { dashboard, logs });
    start_server(state, &config.http)?.await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
