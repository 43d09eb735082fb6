use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use patient_cell::{CreatePatientRequest, PatientService};
use shared_config::AppConfig;
use shared_database::{Database, DirectoryStore};
use shared_models::auth::{Credential, User, UserClass, UserRole};
use shared_models::directory::StaffAccount;
use shared_utils::jwt::issue_token;
use shared_utils::password::{hash_password, validate_password, verify_password};
use shared_utils::validation::validate_email;

use crate::error::AuthError;
use crate::models::{AuthSession, CreateStaffRequest, LoginRequest, Me, Profile, RegisterPatientRequest, RegisteredPatient};

pub struct AuthService {
    config: Arc<AppConfig>,
    directory: Arc<dyn DirectoryStore>,
    patients: Arc<PatientService>,
}

impl AuthService {
    pub fn new(config: Arc<AppConfig>, database: &Database, patients: Arc<PatientService>) -> Self {
        Self {
            config,
            directory: database.directory.clone(),
            patients,
        }
    }

    pub async fn staff_login(&self, request: LoginRequest) -> Result<AuthSession, AuthError> {
        self.login(UserClass::Staff, request).await
    }

    pub async fn patient_login(&self, request: LoginRequest) -> Result<AuthSession, AuthError> {
        self.login(UserClass::Patient, request).await
    }

    /// Creates the patient record and its login together, then signs the patient in.
    pub async fn register_patient(&self, request: RegisterPatientRequest) -> Result<RegisteredPatient, AuthError> {
        validate_password(&request.password).map_err(AuthError::ValidationError)?;

        let email = request.email.trim().to_lowercase();
        if self.directory.find_credential(UserClass::Patient, &email).await?.is_some() {
            return Err(AuthError::EmailTaken(email));
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| AuthError::HashingError(e.to_string()))?;

        let patient = self
            .patients
            .create_patient_with_id(
                Uuid::new_v4(),
                CreatePatientRequest {
                    first_name: request.first_name,
                    last_name: request.last_name,
                    email,
                    phone: request.phone,
                    date_of_birth: request.date_of_birth,
                },
            )
            .await?;

        let credential = Credential {
            user_id: patient.id,
            email: patient.email.clone(),
            role: UserRole::Patient,
            password_hash,
            created_at: patient.created_at,
        };
        self.directory
            .insert_credential(UserClass::Patient, credential.clone())
            .await?;

        info!("Patient {} registered", patient.id);
        let session = self.session_for(&credential)?;
        Ok(RegisteredPatient { patient, session })
    }

    pub async fn create_staff(&self, request: CreateStaffRequest) -> Result<StaffAccount, AuthError> {
        let role = match request.role.as_deref() {
            Some(raw) => raw.parse::<UserRole>().map_err(AuthError::ValidationError)?,
            None => UserRole::Staff,
        };
        if role.class() != UserClass::Staff {
            return Err(AuthError::ValidationError(format!(
                "Role {} cannot be given to a staff account",
                role
            )));
        }

        let email = request.email.trim().to_lowercase();
        let full_name = request.full_name.trim().to_string();
        if !validate_email(&email) {
            return Err(AuthError::ValidationError(format!("Invalid email: {}", email)));
        }
        if full_name.is_empty() {
            return Err(AuthError::ValidationError("Full name is required".to_string()));
        }
        validate_password(&request.password).map_err(AuthError::ValidationError)?;

        if self.directory.find_credential(UserClass::Staff, &email).await?.is_some() {
            return Err(AuthError::EmailTaken(email));
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| AuthError::HashingError(e.to_string()))?;

        let staff = self
            .directory
            .insert_staff(StaffAccount {
                id: Uuid::new_v4(),
                email,
                full_name,
                role,
                created_at: Utc::now(),
            })
            .await?;

        self.directory
            .insert_credential(
                UserClass::Staff,
                Credential {
                    user_id: staff.id,
                    email: staff.email.clone(),
                    role: staff.role,
                    password_hash,
                    created_at: staff.created_at,
                },
            )
            .await?;

        info!("Created {} account {}", staff.role, staff.id);
        Ok(staff)
    }

    /// Creates the configured admin account on first start. Returns whether one was created.
    pub async fn bootstrap_admin(&self) -> Result<bool, AuthError> {
        let (email, password) = match (&self.config.admin_email, &self.config.admin_password) {
            (Some(email), Some(password)) => (email.clone(), password.clone()),
            _ => {
                debug!("ADMIN_EMAIL / ADMIN_PASSWORD not set; skipping admin bootstrap");
                return Ok(false);
            }
        };

        if self.directory.find_credential(UserClass::Staff, &email).await?.is_some() {
            debug!("Admin account {} already exists", email);
            return Ok(false);
        }

        self.create_staff(CreateStaffRequest {
            email,
            full_name: "Administrator".to_string(),
            password,
            role: Some(UserRole::Admin.as_str().to_string()),
        })
        .await?;
        Ok(true)
    }

    pub async fn me(&self, user: &User) -> Result<Me, AuthError> {
        let profile = match user.class() {
            UserClass::Staff => self.directory.get_staff(user.id).await?.map(Profile::Staff),
            UserClass::Patient => self.directory.get_patient(user.id).await?.map(Profile::Patient),
        };

        Ok(Me {
            user: user.clone(),
            profile,
        })
    }

    async fn login(&self, class: UserClass, request: LoginRequest) -> Result<AuthSession, AuthError> {
        let credential = match self.directory.find_credential(class, &request.email).await? {
            Some(credential) => credential,
            None => {
                warn!("Login attempt for unknown {:?} account {}", class, request.email);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let valid = verify_password(&request.password, &credential.password_hash)
            .map_err(|e| AuthError::HashingError(e.to_string()))?;
        if !valid {
            warn!("Wrong password for {:?} account {}", class, credential.email);
            return Err(AuthError::InvalidCredentials);
        }

        info!("{:?} {} signed in", class, credential.user_id);
        self.session_for(&credential)
    }

    fn session_for(&self, credential: &Credential) -> Result<AuthSession, AuthError> {
        let secret = match credential.role.class() {
            UserClass::Staff => &self.config.staff_jwt_secret,
            UserClass::Patient => &self.config.patient_jwt_secret,
        };

        let token = issue_token(
            credential.user_id,
            &credential.email,
            credential.role,
            secret,
            self.config.token_ttl_hours,
        )
        .map_err(AuthError::TokenError)?;

        let user = User {
            id: credential.user_id,
            email: Some(credential.email.clone()),
            role: credential.role,
            created_at: Some(credential.created_at),
        };
        Ok(AuthSession::bearer(token, self.config.token_ttl_hours, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::extractor::authenticate;
    use shared_utils::test_utils::TestConfig;

    fn service_with(config: shared_config::AppConfig) -> AuthService {
        let database = Database::in_memory();
        let patients = Arc::new(PatientService::new(&database));
        AuthService::new(Arc::new(config), &database, patients)
    }

    fn service() -> AuthService {
        service_with(TestConfig::default().to_app_config())
    }

    fn registration(email: &str, password: &str) -> RegisterPatientRequest {
        RegisterPatientRequest {
            first_name: "Mary".to_string(),
            last_name: "Seacole".to_string(),
            email: email.to_string(),
            phone: None,
            date_of_birth: None,
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login_patient() {
        let service = service();
        let registered = service
            .register_patient(registration("Mary@Example.com", "correct horse"))
            .await
            .unwrap();
        assert_eq!(registered.session.user.id, registered.patient.id);
        assert_eq!(registered.session.user.role, UserRole::Patient);

        let session = service
            .patient_login(LoginRequest {
                email: "mary@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        let user = authenticate(&session.access_token, &service.config).unwrap();
        assert_eq!(user.id, registered.patient.id);
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password_and_duplicates() {
        let service = service();

        assert_matches!(
            service.register_patient(registration("mary@example.com", "short")).await,
            Err(AuthError::ValidationError(_))
        );

        service
            .register_patient(registration("mary@example.com", "correct horse"))
            .await
            .unwrap();
        assert_matches!(
            service.register_patient(registration("MARY@example.com", "correct horse")).await,
            Err(AuthError::EmailTaken(_))
        );
    }

    #[tokio::test]
    async fn test_wrong_password_and_wrong_class() {
        let service = service();
        service
            .register_patient(registration("mary@example.com", "correct horse"))
            .await
            .unwrap();

        assert_matches!(
            service
                .patient_login(LoginRequest {
                    email: "mary@example.com".to_string(),
                    password: "battery staple".to_string(),
                })
                .await,
            Err(AuthError::InvalidCredentials)
        );

        // Patient credentials do not open the staff door.
        assert_matches!(
            service
                .staff_login(LoginRequest {
                    email: "mary@example.com".to_string(),
                    password: "correct horse".to_string(),
                })
                .await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_bootstrap_admin_once() {
        let mut config = TestConfig::default().to_app_config();
        config.admin_email = Some("root@hospital.test".to_string());
        config.admin_password = Some("change-me-now".to_string());
        let service = service_with(config);

        assert!(service.bootstrap_admin().await.unwrap());
        assert!(!service.bootstrap_admin().await.unwrap());

        let session = service
            .staff_login(LoginRequest {
                email: "root@hospital.test".to_string(),
                password: "change-me-now".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.role, UserRole::Admin);

        let me = service.me(&session.user).await.unwrap();
        assert_matches!(me.profile, Some(Profile::Staff(ref staff)) if staff.full_name == "Administrator");
    }

    #[tokio::test]
    async fn test_bootstrap_skipped_without_config() {
        assert!(!service().bootstrap_admin().await.unwrap());
    }

    #[tokio::test]
    async fn test_create_staff_rejects_patient_role() {
        let service = service();
        let result = service
            .create_staff(CreateStaffRequest {
                email: "nurse@hospital.test".to_string(),
                full_name: "Night Nurse".to_string(),
                password: "long enough".to_string(),
                role: Some("patient".to_string()),
            })
            .await;
        assert_matches!(result, Err(AuthError::ValidationError(_)));
    }
}
