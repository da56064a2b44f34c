use crate::backend::ShareRole;
use crate::error::{Result, SheetsError};
use crate::retry::RetryPolicy;
use crate::validate::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_CREDENTIALS_FILE: &str = "google_creds.json";

pub const ENV_CREDENTIALS_FILE: &str = "GOOGLE_CREDS_FILE";
pub const ENV_MAX_ATTEMPTS: &str = "GSHEETS_MAX_ATTEMPTS";
pub const ENV_TIMEOUT_SECS: &str = "GSHEETS_TIMEOUT_SECS";

/// Configuration for the sheets tools, stored in `config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SheetsConfig {
    /// Credentials file handed to the client bootstrap
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// Attempts per remote call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Overall deadline for one tool call; unbounded when absent
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Role granted by `share_with` (reader, commenter, writer)
    #[serde(default = "default_share_role")]
    pub share_role: String,
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from(DEFAULT_CREDENTIALS_FILE)
}

fn default_max_attempts() -> u32 {
    crate::retry::DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    crate::retry::DEFAULT_BASE_DELAY.as_millis() as u64
}

fn default_max_delay_ms() -> u64 {
    crate::retry::DEFAULT_MAX_DELAY.as_millis() as u64
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_share_role() -> String {
    ShareRole::Writer.as_str().to_string()
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_credentials_file(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            request_timeout_secs: None,
            default_page_size: default_page_size(),
            share_role: default_share_role(),
        }
    }
}

impl SheetsConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: SheetsConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    /// Apply environment overrides on top of file values.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_CREDENTIALS_FILE) {
            self.credentials_file = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            self.max_attempts = raw.trim().parse().map_err(|_| {
                SheetsError::Config(format!("{} must be a positive integer", ENV_MAX_ATTEMPTS))
            })?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                SheetsError::Config(format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))
            })?;
            self.request_timeout_secs = Some(secs);
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(SheetsError::Config("max_attempts must be at least 1".into()));
        }
        if self.default_page_size == 0 {
            return Err(SheetsError::Config("default_page_size must be positive".into()));
        }
        self.share_role.parse::<ShareRole>().map_err(SheetsError::Config)?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn share_role(&self) -> ShareRole {
        self.share_role.parse().unwrap_or(ShareRole::Writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SheetsConfig::default();
        assert_eq!(config.credentials_file, PathBuf::from("google_creds.json"));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.share_role(), ShareRole::Writer);
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = SheetsConfig::load(dir.path()).unwrap();
        assert_eq!(config, SheetsConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = SheetsConfig {
            max_attempts: 3,
            request_timeout_secs: Some(20),
            share_role: "reader".into(),
            ..SheetsConfig::default()
        };
        config.save(dir.path().join("nested")).unwrap();

        let loaded = SheetsConfig::load(dir.path().join("nested")).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.share_role(), ShareRole::Reader);
        assert_eq!(loaded.request_timeout(), Some(Duration::from_secs(20)));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{"base_delay_ms": 250}"#).unwrap();

        let config = SheetsConfig::load(dir.path()).unwrap();
        assert_eq!(config.base_delay_ms, 250);
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn test_invalid_role_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{"share_role": "owner"}"#).unwrap();
        assert!(matches!(
            SheetsConfig::load(dir.path()),
            Err(SheetsError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_CREDENTIALS_FILE, "/etc/creds.json"),
            (ENV_MAX_ATTEMPTS, "2"),
            (ENV_TIMEOUT_SECS, "45"),
        ]);
        let config = SheetsConfig::default()
            .with_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.credentials_file, PathBuf::from("/etc/creds.json"));
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(45)));

        let bad = SheetsConfig::default().with_env_overrides(|k| {
            (k == ENV_MAX_ATTEMPTS).then(|| "0".to_string())
        });
        assert!(bad.is_err());
    }
}
