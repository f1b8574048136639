use std::env;
use std::time::Duration;

use url::Url;

use super::env::{ApiConfig, AppConfig, ConfigError, DirectoryConfig, ImageConfig, LoggingConfig};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("API_BASE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "http://127.0.0.1:5000/api".to_string());
        let parsed = Url::parse(&base_url)
            .map_err(|err| ConfigError::Invalid("API_BASE_URL", err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("API_BASE_URL", base_url.clone()));
        }

        let api = ApiConfig {
            base_url,
            timeout: Duration::from_millis(
                env::var("API_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(30_000),
            ),
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "history.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let timezone = env::var("DISPLAY_TIMEZONE").unwrap_or_else(|_| "Asia/Shanghai".to_string());

        let default_threshold_pct = env::var("CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(10.0);
        if !(0.0..=100.0).contains(&default_threshold_pct) {
            return Err(ConfigError::Invalid(
                "CONFIDENCE_THRESHOLD",
                default_threshold_pct.to_string(),
            ));
        }

        Ok(Self {
            api,
            directories,
            logging,
            timezone,
            image: ImageConfig {
                default_threshold_pct,
            },
        })
    }
}
