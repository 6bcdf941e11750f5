use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::credentials::{DEFAULT_ENV_FILE, TOKEN_KEY};

const APP_DIR: &str = "logfire-query";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    pub env_file: Option<PathBuf>,
    pub key: Option<String>,
}

/// Values from the command line that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub env_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub timeout: Duration,
    pub env_file: PathBuf,
    pub token_key: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        match Self::get_config_dir() {
            Some(dir) => Self::load_from(&dir.join(CONFIG_FILE)),
            None => {
                log::debug!("no config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        log::debug!("loaded config from {}", path.display());

        Ok(config)
    }

    pub fn get_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR))
    }

    pub fn resolve(&self, overrides: Overrides) -> Settings {
        let api_url = overrides
            .api_url
            .or_else(|| self.api.url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = overrides
            .timeout_secs
            .or(self.api.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let env_file = overrides
            .env_file
            .or_else(|| self.credentials.env_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE));
        let token_key = self
            .credentials
            .key
            .clone()
            .unwrap_or_else(|| TOKEN_KEY.to_string());

        Settings {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
            env_file,
            token_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file_or_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        let settings = config.resolve(Overrides::default());

        assert_eq!(
            settings,
            Settings {
                api_url: "https://logfire-api.pydantic.dev".to_string(),
                timeout: Duration::from_secs(30),
                env_file: PathBuf::from(".env_DIS"),
                token_key: "LOGFIRE_READ_TOKEN".to_string(),
            }
        );
    }

    #[test]
    fn file_values_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
[api]
url = "https://logfire-eu.pydantic.dev"
timeout_secs = 10

[credentials]
env_file = "/etc/logfire/.env"
key = "LOGFIRE_EU_READ_TOKEN"
"#,
        )
        .unwrap();

        let settings = Config::load_from(&path).unwrap().resolve(Overrides::default());
        assert_eq!(settings.api_url, "https://logfire-eu.pydantic.dev");
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.env_file, PathBuf::from("/etc/logfire/.env"));
        assert_eq!(settings.token_key, "LOGFIRE_EU_READ_TOKEN");
    }

    #[test]
    fn flags_beat_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[api]\nurl = \"https://from-file\"\ntimeout_secs = 10\n").unwrap();

        let settings = Config::load_from(&path).unwrap().resolve(Overrides {
            api_url: Some("http://127.0.0.1:8080".to_string()),
            env_file: Some(PathBuf::from("custom.env")),
            timeout_secs: Some(3),
        });
        assert_eq!(settings.api_url, "http://127.0.0.1:8080");
        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.env_file, PathBuf::from("custom.env"));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[credentials]\nenv_file = \".env\"\n").unwrap();

        let settings = Config::load_from(&path).unwrap().resolve(Overrides::default());
        assert_eq!(settings.api_url, DEFAULT_BASE_URL);
        assert_eq!(settings.env_file, PathBuf::from(".env"));
        assert_eq!(settings.token_key, TOKEN_KEY);
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[api\nurl = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[api]\nendpoint = \"https://typo\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
