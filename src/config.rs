//! Application-level configuration loading: storage and deck locations,
//! session defaults and collaborator endpoints.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{services::telegram::DEFAULT_API_BASE, state::session::SessionSettings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZDECK_CONFIG_PATH";

const DEFAULT_STORAGE_DIR: &str = "storage/sessions";
const DEFAULT_DECKS_DIR: &str = "decks";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NEXT_DELAY_SECS: u64 = 5;
/// Upper bound for both session waits, matching what the HTTP surface accepts.
const MAX_WAIT_SECS: u64 = 3600;
const DEFAULT_RENDERER_ENDPOINT: &str = "https://latex.teainside.org/api.php?action=tex2png_no_op";
const DEFAULT_ASSET_URL_PREFIX: &str =
    "https://latex.teainside.org/api.php?action=file&type=png&hash=";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Directory holding one snapshot file per live session.
    pub storage_dir: PathBuf,
    /// Directory scanned for JSON decks.
    pub decks_dir: PathBuf,
    /// Timeout and delay given to new sessions.
    pub session_defaults: SessionSettings,
    /// Endpoint of the LaTeX rendering service.
    pub renderer_endpoint: String,
    /// Prefix turning a rendered asset hash into a URL.
    pub asset_url_prefix: String,
    /// Base URL of the Telegram Bot API.
    pub telegram_api_base: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        storage_dir = %config.storage_dir.display(),
                        decks_dir = %config.decks_dir.display(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
/// Every field is optional.
struct RawConfig {
    storage_dir: Option<PathBuf>,
    decks_dir: Option<PathBuf>,
    default_timeout_secs: Option<u64>,
    default_next_delay_secs: Option<u64>,
    renderer: RawRenderer,
    telegram: RawTelegram,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRenderer {
    endpoint: Option<String>,
    asset_url_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTelegram {
    api_base: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            storage_dir: value
                .storage_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR)),
            decks_dir: value
                .decks_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DECKS_DIR)),
            session_defaults: SessionSettings {
                timeout: Duration::from_secs(bounded_secs(
                    "default_timeout_secs",
                    value.default_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
                    1,
                )),
                next_delay: Duration::from_secs(bounded_secs(
                    "default_next_delay_secs",
                    value
                        .default_next_delay_secs
                        .unwrap_or(DEFAULT_NEXT_DELAY_SECS),
                    0,
                )),
            },
            renderer_endpoint: value
                .renderer
                .endpoint
                .unwrap_or_else(|| DEFAULT_RENDERER_ENDPOINT.into()),
            asset_url_prefix: value
                .renderer
                .asset_url_prefix
                .unwrap_or_else(|| DEFAULT_ASSET_URL_PREFIX.into()),
            telegram_api_base: value
                .telegram
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.into()),
        }
    }
}

/// Clamp a configured wait into `min..=MAX_WAIT_SECS`.
fn bounded_secs(field: &str, secs: u64, min: u64) -> u64 {
    let bounded = secs.clamp(min, MAX_WAIT_SECS);
    if bounded != secs {
        warn!(field, configured = secs, used = bounded, "session wait out of range; clamping");
    }
    bounded
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(AppConfig::from_json("{}").unwrap(), AppConfig::default());
        assert_eq!(
            AppConfig::default().session_defaults,
            SessionSettings::default()
        );
    }

    #[test]
    fn partial_document_overrides_only_given_fields() {
        let config = AppConfig::from_json(
            r#"{"decks_dir": "/srv/decks", "default_timeout_secs": 12,
                "renderer": {"asset_url_prefix": "https://cdn.example/"}}"#,
        )
        .unwrap();

        assert_eq!(config.decks_dir, PathBuf::from("/srv/decks"));
        assert_eq!(config.storage_dir, PathBuf::from(DEFAULT_STORAGE_DIR));
        assert_eq!(config.session_defaults.timeout, Duration::from_secs(12));
        assert_eq!(config.session_defaults.next_delay, Duration::from_secs(5));
        assert_eq!(config.renderer_endpoint, DEFAULT_RENDERER_ENDPOINT);
        assert_eq!(config.asset_url_prefix, "https://cdn.example/");
        assert_eq!(config.telegram_api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn out_of_range_waits_are_clamped() {
        let config = AppConfig::from_json(
            r#"{"default_timeout_secs": 18446744073709551615,
                "default_next_delay_secs": 86400}"#,
        )
        .unwrap();
        assert_eq!(config.session_defaults.timeout, Duration::from_secs(3600));
        assert_eq!(config.session_defaults.next_delay, Duration::from_secs(3600));

        let config = AppConfig::from_json(
            r#"{"default_timeout_secs": 0, "default_next_delay_secs": 0}"#,
        )
        .unwrap();
        assert_eq!(config.session_defaults.timeout, Duration::from_secs(1));
        assert_eq!(config.session_defaults.next_delay, Duration::ZERO);
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(AppConfig::from_json(r#"{"default_timeout_secs": "soon"}"#).is_err());
    }
}
