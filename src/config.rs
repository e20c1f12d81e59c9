use crate::analysis::query::DEFAULT_LOOKBACK_DAYS;
use crate::error::AppError;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub api_key: Option<String>,
    pub region: String,
    pub log_level: String,
    pub default_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            api_key: None,
            region: "na1".to_string(),
            log_level: "info".to_string(),
            default_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".prostaff")
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let mut config = Config::default();

        if let Ok(dir) = env::var("PROSTAFF_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.api_key = env::var("RIOT_API_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(region) = env::var("RIOT_REGION") {
            config.region = region;
        }
        if let Ok(level) = env::var("PROSTAFF_LOG") {
            config.log_level = level;
        }
        if let Ok(days) = env::var("PROSTAFF_DEFAULT_DAYS") {
            config.default_days = days.parse().map_err(|_| {
                AppError::ConfigError(format!("PROSTAFF_DEFAULT_DAYS is not a number: {}", days))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.default_days == 0 {
            return Err(AppError::ConfigError(
                "PROSTAFF_DEFAULT_DAYS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The Riot key is only needed for imports, so it is checked lazily.
    pub fn require_api_key(&self) -> Result<&str, AppError> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::ConfigError("RIOT_API_KEY not found in environment or .env file".to_string())
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("prostaff.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.region, "na1");
        assert_eq!(config.default_days, DEFAULT_LOOKBACK_DAYS);
        assert_eq!(config.default_days, 30);
        assert!(config.api_key.is_none());
        assert!(config.store_path().ends_with("prostaff.json"));
    }

    #[test]
    fn test_zero_lookback_rejected() {
        let config = Config {
            default_days: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_api_key() {
        let config = Config::default();
        assert!(matches!(config.require_api_key(), Err(AppError::ConfigError(_))));

        let config = Config {
            api_key: Some("RGAPI-test".to_string()),
            ..Config::default()
        };
        assert_eq!(config.require_api_key().unwrap(), "RGAPI-test");
    }
}
