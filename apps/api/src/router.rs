use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::info;

use auth_cell::{auth_routes, AuthService, AuthState};
use booking_queue_cell::{queue_routes, QueueNotifier, QueueRegister, QueueState};
use doctor_cell::{clinic_routes, doctor_routes, ClinicService, DirectoryState, DoctorService};
use patient_cell::{patient_routes, PatientService, PatientState};
use schedule_cell::{schedule_routes, ScheduleLedger, ScheduleState};
use shared_config::AppConfig;
use shared_database::Database;

/// Builds every service once and hands each cell its state.
pub async fn create_router(config: Arc<AppConfig>, database: Database) -> anyhow::Result<Router> {
    let patients = Arc::new(PatientService::new(&database));
    let auth = Arc::new(AuthService::new(config.clone(), &database, patients.clone()));
    if auth.bootstrap_admin().await? {
        info!("Bootstrapped admin account");
    }

    let ledger = Arc::new(ScheduleLedger::new(&database));
    let notifier = QueueNotifier::new(config.queue_broadcast_capacity);
    let register = Arc::new(QueueRegister::new(&database, ledger.clone(), notifier));

    let directory = DirectoryState {
        config: config.clone(),
        doctors: Arc::new(DoctorService::new(&database)),
        clinics: Arc::new(ClinicService::new(&database)),
    };

    let api = Router::new()
        .nest("/auth", auth_routes(AuthState { config: config.clone(), service: auth }))
        .nest("/patients", patient_routes(PatientState { config: config.clone(), service: patients }))
        .nest("/doctors", doctor_routes(directory.clone()))
        .nest("/clinics", clinic_routes(directory))
        .nest("/schedules", schedule_routes(ScheduleState { config: config.clone(), ledger }))
        .nest("/queue", queue_routes(QueueState { config, register }));

    Ok(Router::new()
        .route("/", get(|| async { "Hospital Queue API is running!" }))
        .nest("/api", api))
}
