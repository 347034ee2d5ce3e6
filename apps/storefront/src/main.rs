// apps/storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use storefront::config::{AppConfig, LogFormat};
use storefront::services::mailer::LogMailer;
use storefront::store::{MemoryStore, PgStore, Store};
use storefront::{build_state, seed, web};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Text => builder.init(),
  }
}

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
  std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => {
      init_tracing(cfg.log_format);
      Arc::new(cfg)
    }
    Err(e) => {
      init_tracing(LogFormat::Text);
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(startup_error(e));
    }
  };
  tracing::info!("Starting storefront server...");

  let store: Arc<dyn Store> = if app_config.uses_memory_store() {
    tracing::warn!("Using the in-memory store; data is lost on restart.");
    Arc::new(MemoryStore::new())
  } else {
    match PgStore::connect(&app_config.database_url, app_config.db_max_connections).await {
      Ok(pg) => {
        tracing::info!("Connected to the database and applied migrations.");
        Arc::new(pg)
      }
      Err(e) => {
        tracing::error!(error = %e, "Failed to connect to the database.");
        return Err(startup_error(e));
      }
    }
  };

  if app_config.seed_db {
    seed::seed_demo_catalog(store.as_ref()).await.map_err(startup_error)?;
  }
  seed::ensure_staff_account(store.as_ref(), &app_config)
    .await
    .map_err(startup_error)?;

  let app_state = build_state(app_config.clone(), store, Arc::new(LogMailer));

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
