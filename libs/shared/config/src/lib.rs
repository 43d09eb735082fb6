use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub staff_jwt_secret: String,
    pub patient_jwt_secret: String,
    pub token_ttl_hours: i64,
    pub redis_url: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub queue_broadcast_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            staff_jwt_secret: String::new(),
            patient_jwt_secret: String::new(),
            token_ttl_hours: 24,
            redis_url: None,
            admin_email: None,
            admin_password: None,
            queue_broadcast_capacity: 256,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", defaults.port),
            staff_jwt_secret: env::var("STAFF_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("STAFF_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            patient_jwt_secret: env::var("PATIENT_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("PATIENT_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            token_ttl_hours: parse_or("TOKEN_TTL_HOURS", defaults.token_ttl_hours),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            queue_broadcast_capacity: parse_or(
                "QUEUE_BROADCAST_CAPACITY",
                defaults.queue_broadcast_capacity,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if config.redis_url.is_none() {
            warn!("REDIS_URL not set, data will be kept in memory only");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.staff_jwt_secret.is_empty() && !self.patient_jwt_secret.is_empty()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_not_configured() {
        let config = AppConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.token_ttl_hours, 24);
    }

    #[test]
    fn test_configured_with_both_secrets() {
        let config = AppConfig {
            staff_jwt_secret: "staff".to_string(),
            patient_jwt_secret: "patient".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_configured());
    }
}
