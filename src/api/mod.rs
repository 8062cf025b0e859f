//! HTTP front end: actix-web handlers over the validator, the generator and
//! the storage directory, with rendering done by a pool of queue workers.

pub mod config;
pub mod handlers;
pub mod models;
pub mod workers;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::config::{AppConfig, ConfigError};
use crate::qr::QrGenerator;
use crate::storage::QrStorage;
use crate::url_validator::UrlValidator;

use self::config::ApiConfig;
use self::models::RenderJob;

/// Shared state handed to every handler through `web::Data`.
#[derive(Clone)]
pub struct ApiServices {
    config: web::Data<ApiConfig>,
    validator: web::Data<UrlValidator>,
    storage: web::Data<QrStorage>,
    job_tx: web::Data<mpsc::Sender<RenderJob>>,
}

impl ApiServices {
    /// Builds the services and spawns the render workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(app_config: &AppConfig) -> Result<Self, ConfigError> {
        let config = ApiConfig::from_app_config(app_config)?;
        let validator = UrlValidator::new(app_config.validator_policy());
        let storage = QrStorage::new(app_config.qr.storage_dir.clone());

        debug!("Creating job queue with capacity: {}", config.queue_size);
        let (job_tx, job_rx) = mpsc::channel::<RenderJob>(config.queue_size);
        let generator = Arc::new(QrGenerator::new(validator.clone()));
        workers::start_workers(job_rx, generator, config.workers);

        Ok(Self {
            config: web::Data::new(config),
            validator: web::Data::new(validator),
            storage: web::Data::new(storage),
            job_tx: web::Data::new(job_tx),
        })
    }

    pub fn storage(&self) -> &QrStorage {
        &self.storage
    }

    /// Registers the shared state and all routes on an app.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.config.clone())
            .app_data(self.validator.clone())
            .app_data(self.storage.clone())
            .app_data(self.job_tx.clone())
            .service(web::resource("/api/validate").route(web::post().to(handlers::validate_handler)))
            .service(
                web::resource("/api/qr")
                    .route(web::post().to(handlers::generate_handler))
                    .route(web::get().to(handlers::generate_query_handler)),
            )
            .service(
                web::resource("/api/qr/files/{filename}")
                    .route(web::get().to(handlers::download_handler))
                    .route(web::delete().to(handlers::delete_handler)),
            )
            .service(web::resource("/health").route(web::get().to(handlers::health_check)));
    }
}

/// Starts the API server and runs until it is shut down.
#[instrument(skip(app_config))]
pub async fn start_server(app_config: &AppConfig) -> Result<()> {
    let host = app_config.server.host.clone();
    let port = app_config.server.port;
    info!("Starting QR API server on {}:{}", host, port);

    let services = ApiServices::start(app_config)?;
    services.storage().ensure_root()?;
    info!("Storing QR codes under {}", services.storage().root().display());

    let server_result = HttpServer::new(move || {
        let services = services.clone();
        App::new().configure(move |cfg| services.configure(cfg))
    })
    .bind((host.as_str(), port))
    .map_err(|e| {
        error!("Failed to bind to {}:{}: {}", host, port, e);
        e
    })?
    .run()
    .await;

    if let Err(e) = server_result {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
