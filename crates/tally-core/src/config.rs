//! Configuration module
//!
//! Values come from the process environment (after loading `.env` with dotenvy).
//! Storage and OCR settings are optional at startup; the operations that need
//! them fail with a configuration error when they are missing.

use std::env;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SERVER_PORT: u16 = 8080;
const SESSION_INACTIVITY_DAYS: i64 = 30;
const UPLOAD_URL_TTL_SECS: u64 = 15 * 60;
const REQUEST_TIMEOUT_SECS: u64 = 120;
const MAX_CONCURRENT_REQUESTS: usize = 512;
const OCR_TIMEOUT_SECS: u64 = 60;
const OCR_MODEL: &str = "gpt-5-nano";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MENU_IMAGE_URL: &str =
    "https://www.foodiesfeed.com/wp-content/uploads/2023/06/burger-with-melted-cheese.jpg.webp";

/// Object storage settings used by the upload credential issuer.
#[derive(Clone, Debug)]
pub struct StorageSettings {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub endpoint: Option<String>,
    pub upload_url_ttl_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            bucket: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            endpoint: None,
            upload_url_ttl_secs: UPLOAD_URL_TTL_SECS,
        }
    }
}

/// Settings for the vision completion provider.
#[derive(Clone, Debug)]
pub struct OcrSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OPENAI_BASE_URL.to_string(),
            model: OCR_MODEL.to_string(),
            timeout_secs: OCR_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub environment: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub request_timeout_secs: u64,
    pub max_concurrent_requests: usize,
    pub session_inactivity_days: i64,
    pub default_menu_image_url: String,
    pub login_redirect_url: Option<String>,
    pub storage: StorageSettings,
    pub ocr: OcrSettings,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    fn inner(&self) -> &ServiceConfig {
        &self.0
    }

    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = non_empty("ENVIRONMENT")
            .or_else(|| non_empty("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let database_url = non_empty("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let cors_origins = non_empty("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = non_empty("SERVER_PORT")
            .or_else(|| non_empty("PORT"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(SERVER_PORT);

        let storage = StorageSettings {
            bucket: non_empty("S3_BUCKET_NAME"),
            region: non_empty("AWS_REGION"),
            access_key_id: non_empty("AWS_ACCESS_KEY_ID"),
            secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY"),
            endpoint: non_empty("S3_ENDPOINT"),
            upload_url_ttl_secs: non_empty("UPLOAD_URL_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(UPLOAD_URL_TTL_SECS),
        };

        let ocr = OcrSettings {
            api_key: non_empty("OPENAI_API_KEY"),
            base_url: non_empty("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: non_empty("OCR_MODEL").unwrap_or_else(|| OCR_MODEL.to_string()),
            timeout_secs: non_empty("OCR_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(OCR_TIMEOUT_SECS),
        };

        let config = ServiceConfig {
            environment,
            server_port,
            cors_origins,
            database_url,
            db_max_connections: non_empty("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: non_empty("DB_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            request_timeout_secs: non_empty("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            max_concurrent_requests: non_empty("MAX_CONCURRENT_REQUESTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CONCURRENT_REQUESTS),
            session_inactivity_days: non_empty("SESSION_INACTIVITY_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(SESSION_INACTIVITY_DAYS),
            default_menu_image_url: non_empty("DEFAULT_MENU_IMAGE_URL")
                .unwrap_or_else(|| DEFAULT_MENU_IMAGE_URL.to_string()),
            login_redirect_url: non_empty("LOGIN_REDIRECT_URL"),
            storage,
            ocr,
        };

        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let cfg = self.inner();

        if !cfg.database_url.starts_with("postgres://")
            && !cfg.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if cfg.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be greater than 0"));
        }

        if cfg.storage.upload_url_ttl_secs != UPLOAD_URL_TTL_SECS {
            return Err(anyhow::anyhow!(
                "UPLOAD_URL_TTL_SECS must be {} (15 minutes)",
                UPLOAD_URL_TTL_SECS
            ));
        }

        if cfg.session_inactivity_days <= 0 {
            return Err(anyhow::anyhow!(
                "SESSION_INACTIVITY_DAYS must be greater than 0"
            ));
        }

        if cfg.request_timeout_secs <= cfg.ocr.timeout_secs {
            return Err(anyhow::anyhow!(
                "REQUEST_TIMEOUT_SECS ({}) must be greater than OCR_TIMEOUT_SECS ({})",
                cfg.request_timeout_secs,
                cfg.ocr.timeout_secs
            ));
        }

        if self.is_production() && cfg.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        Ok(())
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.inner().request_timeout_secs
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.inner().max_concurrent_requests
    }

    pub fn session_inactivity(&self) -> chrono::Duration {
        chrono::Duration::days(self.inner().session_inactivity_days)
    }

    pub fn default_menu_image_url(&self) -> &str {
        &self.inner().default_menu_image_url
    }

    pub fn login_redirect_url(&self) -> Option<&str> {
        self.inner().login_redirect_url.as_deref()
    }

    pub fn storage(&self) -> &StorageSettings {
        &self.inner().storage
    }

    pub fn ocr(&self) -> &OcrSettings {
        &self.inner().ocr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/tally")]).unwrap();
        assert_eq!(config.server_port(), 8080);
        assert_eq!(config.session_inactivity(), chrono::Duration::days(30));
        assert_eq!(config.storage().upload_url_ttl_secs, 900);
        assert_eq!(config.ocr().model, "gpt-5-nano");
        assert_eq!(config.request_timeout_secs(), 120);
        assert_eq!(config.ocr().base_url, "https://api.openai.com/v1");
        assert!(config.storage().bucket.is_none());
        assert!(config.ocr().api_key.is_none());
        assert!(!config.is_production());
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_database_url_is_an_error() {
        assert!(config_from(&[]).is_err());
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/tally"),
            ("S3_BUCKET_NAME", "  "),
            ("OPENAI_API_KEY", ""),
        ])
        .unwrap();
        assert!(config.storage().bucket.is_none());
        assert!(config.ocr().api_key.is_none());
    }

    #[test]
    fn test_storage_and_ocr_settings_are_read() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/tally"),
            ("S3_BUCKET_NAME", "receipts"),
            ("AWS_REGION", "ap-northeast-1"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OCR_MODEL", "gpt-4o-mini"),
            ("PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(config.storage().bucket.as_deref(), Some("receipts"));
        assert_eq!(config.storage().region.as_deref(), Some("ap-northeast-1"));
        assert_eq!(config.ocr().api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.ocr().model, "gpt-4o-mini");
        assert_eq!(config.server_port(), 9000);
    }

    #[test]
    fn test_validate_rejects_other_upload_ttl() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/tally"),
            ("UPLOAD_URL_TTL_SECS", "3600"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wildcard_cors_in_production() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/tally"),
            ("ENVIRONMENT", "production"),
        ])
        .unwrap();
        assert!(config.is_production());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_request_timeout_below_ocr_timeout() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/tally"),
            ("REQUEST_TIMEOUT_SECS", "30"),
            ("OCR_TIMEOUT_SECS", "60"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_postgres_url() {
        let config = config_from(&[("DATABASE_URL", "mysql://localhost/tally")]).unwrap();
        assert!(config.validate().is_err());
    }
}
