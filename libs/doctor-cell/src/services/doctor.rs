use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{Database, DirectoryStore};
use shared_models::directory::Doctor;

use crate::models::{CreateDoctorRequest, DoctorError, DoctorQuery};

pub struct DoctorService {
    directory: Arc<dyn DirectoryStore>,
}

impl DoctorService {
    pub fn new(database: &Database) -> Self {
        Self {
            directory: database.directory.clone(),
        }
    }

    /// Create a new doctor profile
    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        debug!("Creating doctor profile for: {} {}", request.first_name, request.last_name);

        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        let specialty = request.specialty.trim().to_string();

        if first_name.is_empty() || last_name.is_empty() {
            return Err(DoctorError::ValidationError("Doctor name is required".to_string()));
        }
        if specialty.is_empty() {
            return Err(DoctorError::ValidationError("Specialty is required".to_string()));
        }

        let doctor = Doctor {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            specialty,
            email: request.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()),
            is_available: request.is_available.unwrap_or(true),
            created_at: Utc::now(),
        };

        let doctor = self.directory.insert_doctor(doctor).await?;
        info!("Created doctor {} ({})", doctor.id, doctor.specialty);
        Ok(doctor)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.directory
            .get_doctor(doctor_id)
            .await?
            .ok_or(DoctorError::DoctorNotFound)
    }

    pub async fn list_doctors(&self, query: &DoctorQuery) -> Result<Vec<Doctor>, DoctorError> {
        let mut doctors = self.directory.list_doctors().await?;

        if let Some(specialty) = query.specialty.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            doctors.retain(|d| d.specialty.eq_ignore_ascii_case(specialty));
        }
        if query.available_only.unwrap_or(false) {
            doctors.retain(|d| d.is_available);
        }

        doctors.sort_by(|a, b| a.last_name.cmp(&b.last_name).then_with(|| a.first_name.cmp(&b.first_name)));
        Ok(doctors)
    }
}
