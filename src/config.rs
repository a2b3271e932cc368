use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub draw: DrawConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub campaign: CampaignConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Remote backend-as-a-service (PostgREST style API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawConfig {
    /// Codes shown by the tombola ticker before the winner is revealed.
    #[serde(default = "default_animation_frames")]
    pub animation_frames: usize,
    #[serde(default = "default_winner_count")]
    pub default_winner_count: usize,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            animation_frames: default_animation_frames(),
            default_winner_count: default_winner_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Idle delay clients should wait before re-validating a serial.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How long an idle form slot is kept.
    #[serde(default = "default_form_ttl_secs")]
    pub form_ttl_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            form_ttl_secs: default_form_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    #[serde(default = "default_campaign_name")]
    pub name: String,
    #[serde(default)]
    pub starts_on: Option<NaiveDate>,
    #[serde(default)]
    pub ends_on: Option<NaiveDate>,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            name: default_campaign_name(),
            starts_on: None,
            ends_on: None,
        }
    }
}

impl CampaignConfig {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.starts_on.is_none_or(|start| date >= start)
            && self.ends_on.is_none_or(|end| date <= end)
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> u32 {
    1000
}

fn default_animation_frames() -> usize {
    24
}

fn default_winner_count() -> usize {
    1
}

fn default_debounce_ms() -> u64 {
    400
}

fn default_form_ttl_secs() -> u64 {
    900
}

fn default_campaign_name() -> String {
    "El Sueño del Hincha Skyworth".to_string()
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_toml() -> AppResult<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            // No file: build everything from the environment
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let base_url = get_env("BACKEND_URL").ok_or_else(|| {
                    AppError::ConfigError(
                        "BACKEND_URL is not set and config.toml was not found".to_string(),
                    )
                })?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    backend: BackendConfig {
                        base_url,
                        api_key: get_env("BACKEND_API_KEY").unwrap_or_default(),
                        timeout_secs: get_env_parse("BACKEND_TIMEOUT_SECS", default_timeout_secs()),
                        page_size: get_env_parse("BACKEND_PAGE_SIZE", default_page_size()),
                    },
                    draw: DrawConfig::default(),
                    validation: ValidationConfig::default(),
                    campaign: CampaignConfig::default(),
                }
            }
            Err(e) => {
                return Err(AppError::ConfigError(format!(
                    "cannot read config file {config_path}: {e}"
                )));
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> AppResult<Self> {
        toml::from_str(config_str)
            .map_err(|e| AppError::ConfigError(format!("invalid config file: {e}")))
    }

    /// Environment variables win over the file.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get_env("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Some(v) = get_env("BACKEND_URL") {
            self.backend.base_url = v;
        }
        if let Some(v) = get_env("BACKEND_API_KEY") {
            self.backend.api_key = v;
        }
        if let Some(v) = get_env("BACKEND_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            self.backend.timeout_secs = n;
        }
        if let Some(v) = get_env("BACKEND_PAGE_SIZE")
            && let Ok(n) = v.parse()
        {
            self.backend.page_size = n;
        }
        if let Some(v) = get_env("DRAW_ANIMATION_FRAMES")
            && let Ok(n) = v.parse()
        {
            self.draw.animation_frames = n;
        }
        if let Some(v) = get_env("VALIDATION_DEBOUNCE_MS")
            && let Ok(n) = v.parse()
        {
            self.validation.debounce_ms = n;
        }
        if let Some(v) = get_env("CAMPAIGN_STARTS_ON")
            && let Ok(d) = v.parse()
        {
            self.campaign.starts_on = Some(d);
        }
        if let Some(v) = get_env("CAMPAIGN_ENDS_ON")
            && let Ok(d) = v.parse()
        {
            self.campaign.ends_on = Some(d);
        }
    }
}
