use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

/// Environment variable that overrides the API key stored on disk.
pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 30;
pub const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Upper bound for TTL and refresh interval: one hundred years.
pub const MAX_DURATION_MINUTES: u64 = 100 * 366 * 24 * 60;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// cache_ttl_minutes = 30
/// refresh_enabled = true
/// priority_cities = ["New York", "London", "Tokyo"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeatherMap API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub base_url: String,

    /// How long a stored record is served without refetching.
    pub cache_ttl_minutes: u64,

    pub refresh_interval_minutes: u64,

    /// Whether the background refresh of priority cities runs by default.
    pub refresh_enabled: bool,

    /// Cities refreshed by the scheduler, in this order.
    pub priority_cities: Vec<String>,

    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
            refresh_interval_minutes: DEFAULT_REFRESH_INTERVAL_MINUTES,
            refresh_enabled: false,
            priority_cities: default_priority_cities(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

pub fn default_priority_cities() -> Vec<String> {
    ["New York", "London", "Tokyo"].map(String::from).to_vec()
}

impl Config {
    /// Load config from the platform location, applying the environment override.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env_override(std::env::var(API_KEY_ENV).ok());
        Ok(cfg)
    }

    /// Load config from `path`, or return defaults if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-aggregator", "weather-aggregator")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Default location of the JSON-lines record store.
    pub fn default_store_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("records.jsonl"))
    }

    /// A non-blank value replaces whatever key came from the file.
    pub fn apply_env_override(&mut self, value: Option<String>) {
        if let Some(key) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            self.api_key = Some(key);
        }
    }

    /// Returns the API key, if present and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        let minutes = self.cache_ttl_minutes.min(MAX_DURATION_MINUTES) as i64;
        chrono::Duration::minutes(minutes)
    }

    pub fn refresh_interval(&self) -> Duration {
        interval_from_minutes(self.refresh_interval_minutes.min(MAX_DURATION_MINUTES))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_minutes == 0 {
            bail!("cache_ttl_minutes must be greater than zero");
        }
        if self.cache_ttl_minutes > MAX_DURATION_MINUTES {
            bail!("cache_ttl_minutes must be at most {MAX_DURATION_MINUTES} (100 years)");
        }
        if self.refresh_interval_minutes == 0 {
            bail!("refresh_interval_minutes must be greater than zero");
        }
        if self.refresh_interval_minutes > MAX_DURATION_MINUTES {
            bail!("refresh_interval_minutes must be at most {MAX_DURATION_MINUTES} (100 years)");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        if self.priority_cities.iter().any(|c| c.trim().is_empty()) {
            bail!("priority_cities must not contain blank names");
        }
        Ok(())
    }
}

/// Converts a validated minute count into a timer interval.
pub fn interval_from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let cfg = Config::default();

        assert_eq!(cfg.cache_ttl(), chrono::Duration::minutes(30));
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(30 * 60));
        assert!(!cfg.refresh_enabled);
        assert_eq!(cfg.priority_cities, vec!["New York", "London", "Tokyo"]);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert!(cfg.api_key().is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            api_key = "KEY"
            priority_cities = ["Paris"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.api_key(), Some("KEY"));
        assert_eq!(cfg.priority_cities, vec!["Paris"]);
        assert_eq!(cfg.cache_ttl_minutes, DEFAULT_CACHE_TTL_MINUTES);
        assert_eq!(cfg.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn env_override_replaces_file_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());

        cfg.apply_env_override(Some("ENV_KEY".into()));
        assert_eq!(cfg.api_key(), Some("ENV_KEY"));
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());

        cfg.apply_env_override(Some("   ".into()));
        cfg.apply_env_override(None);
        assert_eq!(cfg.api_key(), Some("FILE_KEY"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.set_api_key("  ".into());
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn validate_rejects_zero_durations_and_blank_cities() {
        let cfg = Config {
            cache_ttl_minutes: 0,
            ..Config::default()
        };
        assert!(cfg.validate().unwrap_err().to_string().contains("cache_ttl_minutes"));

        let cfg = Config {
            refresh_interval_minutes: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            priority_cities: vec!["London".into(), " ".into()],
            ..Config::default()
        };
        assert!(cfg.validate().unwrap_err().to_string().contains("priority_cities"));
    }

    #[test]
    fn validate_rejects_durations_beyond_a_century() {
        let cfg: Config = toml::from_str("cache_ttl_minutes = 1000000000000").unwrap();
        assert!(cfg.validate().unwrap_err().to_string().contains("cache_ttl_minutes"));

        let cfg = Config {
            refresh_interval_minutes: u64::MAX,
            ..Config::default()
        };
        assert!(cfg.validate().unwrap_err().to_string().contains("refresh_interval_minutes"));

        let cfg = Config {
            cache_ttl_minutes: MAX_DURATION_MINUTES,
            refresh_interval_minutes: MAX_DURATION_MINUTES,
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unvalidated_huge_durations_are_clamped() {
        let cfg = Config {
            cache_ttl_minutes: u64::MAX,
            refresh_interval_minutes: u64::MAX,
            ..Config::default()
        };

        assert_eq!(cfg.cache_ttl(), chrono::Duration::minutes(MAX_DURATION_MINUTES as i64));
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(MAX_DURATION_MINUTES * 60));
        assert_eq!(interval_from_minutes(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.refresh_enabled = true;
        cfg.priority_cities = vec!["Paris".into(), "Berlin".into()];
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "cache_ttl_minutes = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }
}
