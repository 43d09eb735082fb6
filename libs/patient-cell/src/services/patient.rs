use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{Database, DirectoryStore};
use shared_models::directory::Patient;
use shared_utils::validation::validate_email;

use crate::models::{CreatePatientRequest, PatientError};

pub struct PatientService {
    directory: Arc<dyn DirectoryStore>,
}

impl PatientService {
    pub fn new(database: &Database) -> Self {
        Self {
            directory: database.directory.clone(),
        }
    }

    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        self.create_patient_with_id(Uuid::new_v4(), request).await
    }

    /// Used by self-registration, where the patient id doubles as the login's user id.
    pub async fn create_patient_with_id(
        &self,
        id: Uuid,
        request: CreatePatientRequest,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient record for: {}", request.email);

        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        let email = request.email.trim().to_lowercase();

        if first_name.is_empty() || last_name.is_empty() {
            return Err(PatientError::ValidationError(
                "First and last name are required".to_string(),
            ));
        }
        if !validate_email(&email) {
            return Err(PatientError::ValidationError(format!("Invalid email: {}", email)));
        }

        let patient = Patient {
            id,
            first_name,
            last_name,
            email,
            phone: request.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            date_of_birth: request.date_of_birth,
            created_at: Utc::now(),
        };

        let patient = self.directory.insert_patient(patient).await?;
        info!("Created patient {}", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        self.directory
            .get_patient(patient_id)
            .await?
            .ok_or(PatientError::NotFound)
    }

    /// Sorted by last then first name; `search` matches name or email, case-insensitively.
    pub async fn list_patients(&self, search: Option<&str>) -> Result<Vec<Patient>, PatientError> {
        let mut patients = self.directory.list_patients().await?;

        if let Some(needle) = search.map(str::trim).filter(|s| !s.is_empty()) {
            patients.retain(|p| p.matches_search(needle));
        }

        patients.sort_by(|a, b| {
            a.last_name
                .to_lowercase()
                .cmp(&b.last_name.to_lowercase())
                .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
        });
        Ok(patients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request(first: &str, last: &str, email: &str) -> CreatePatientRequest {
        CreatePatientRequest {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            phone: Some("  ".to_string()),
            date_of_birth: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_patient() {
        let service = PatientService::new(&Database::in_memory());

        let created = service
            .create_patient(request(" Mary ", "Seacole", "Mary@Example.com"))
            .await
            .unwrap();
        assert_eq!(created.first_name, "Mary");
        assert_eq!(created.email, "mary@example.com");
        assert!(created.phone.is_none());

        let fetched = service.get_patient(created.id).await.unwrap();
        assert_eq!(fetched.full_name(), "Mary Seacole");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let service = PatientService::new(&Database::in_memory());
        service.create_patient(request("Mary", "Seacole", "mary@example.com")).await.unwrap();

        assert_matches!(
            service.create_patient(request("Other", "Person", "MARY@example.com")).await,
            Err(PatientError::DuplicateEmail(_))
        );
    }

    #[tokio::test]
    async fn test_validation() {
        let service = PatientService::new(&Database::in_memory());

        assert_matches!(
            service.create_patient(request("", "Seacole", "mary@example.com")).await,
            Err(PatientError::ValidationError(_))
        );
        assert_matches!(
            service.create_patient(request("Mary", "Seacole", "not-an-email")).await,
            Err(PatientError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn test_malformed_emails_rejected() {
        let service = PatientService::new(&Database::in_memory());

        for email in ["x@@y.z", "a b@c.d", "a@b..", "a@b.c d"] {
            assert_matches!(
                service.create_patient(request("Mary", "Seacole", email)).await,
                Err(PatientError::ValidationError(_)),
                "{:?} should be rejected",
                email
            );
        }
        assert!(service.list_patients(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_patients_search() {
        let service = PatientService::new(&Database::in_memory());
        service.create_patient(request("Mary", "Seacole", "mary@example.com")).await.unwrap();
        service.create_patient(request("Florence", "Nightingale", "flo@example.com")).await.unwrap();

        let all = service.list_patients(None).await.unwrap();
        assert_eq!(all[0].last_name, "Nightingale");
        assert_eq!(all.len(), 2);

        let found = service.list_patients(Some("SEAC")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first_name, "Mary");
    }

    #[tokio::test]
    async fn test_unknown_patient() {
        let service = PatientService::new(&Database::in_memory());
        assert_matches!(service.get_patient(Uuid::new_v4()).await, Err(PatientError::NotFound));
    }
}
