use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use diagnosis_core::DiagnosisService;
use log::{error, info};

use crate::config::ServerConfig;
use crate::controllers::{diagnosis_controller, system_controller};
use crate::middleware::TracingMiddleware;

pub struct AppState {
    pub diagnosis_service: Arc<DiagnosisService>,
    /// Overall deadline for one `diagnose` call; `None` waits for the pipeline.
    pub diagnosis_deadline: Option<Duration>,
}

impl AppState {
    pub fn new(diagnosis_service: Arc<DiagnosisService>) -> Self {
        Self {
            diagnosis_service,
            diagnosis_deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.diagnosis_deadline = deadline;
        self
    }
}

const DEFAULT_WORKER_COUNT: usize = 4;

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.configure(system_controller::config)
        .configure(diagnosis_controller::config);
}

pub async fn run(config: ServerConfig, diagnosis_service: DiagnosisService) -> Result<(), String> {
    let app_state = web::Data::new(
        AppState::new(Arc::new(diagnosis_service)).with_deadline(config.diagnosis_deadline),
    );
    let bind_address = config.bind_address();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(TracingMiddleware)
            .wrap(Cors::permissive())
            .configure(app_config)
    })
    .workers(DEFAULT_WORKER_COUNT)
    .bind(&bind_address)
    .map_err(|e| format!("Failed to bind server: {e}"))?
    .run();

    info!("Diagnosis service listening on http://{bind_address}");
    if let Some(deadline) = config.diagnosis_deadline {
        info!("Diagnosis deadline: {}s", deadline.as_secs());
    }

    if let Err(e) = server.await {
        error!("Web server error: {}", e);
        return Err(format!("Web server error: {e}"));
    }

    Ok(())
}
