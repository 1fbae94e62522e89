use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::dataset::DEFAULT_DATASET;
use crate::domain::ExitPolicy;
use crate::error::LottoError;
use crate::lottery::{
    ClientOptions, DEFAULT_TIMEOUT, DEFAULT_URL_TEMPLATE, DRAW_NO_PLACEHOLDER, default_user_agent,
};

pub const DEFAULT_CONFIG_FILE: &str = "lotto-sync.json";
pub const DEFAULT_PROBE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub url_template: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_rounds: Option<u32>,
    #[serde(default)]
    pub probe_delay_ms: Option<u64>,
    #[serde(default)]
    pub exit_policy: Option<ExitPolicy>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub dataset: Utf8PathBuf,
    pub client: ClientOptions,
    pub max_rounds: u32,
    pub probe_delay: Duration,
    pub exit_policy: ExitPolicy,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            dataset: Utf8PathBuf::from(DEFAULT_DATASET),
            client: ClientOptions::default(),
            max_rounds: 1,
            probe_delay: DEFAULT_PROBE_DELAY,
            exit_policy: ExitPolicy::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `lotto-sync.json` when no path is given. Only an
    /// explicit path is required to exist.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, LottoError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| LottoError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| LottoError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, LottoError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(LottoError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let url_template = config
            .url_template
            .unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_string());
        if !url_template.contains(DRAW_NO_PLACEHOLDER) {
            return Err(LottoError::InvalidUrlTemplate(url_template));
        }

        let timeout = match config.timeout_secs {
            Some(0) => {
                return Err(LottoError::ConfigParse(
                    "timeout_secs must be positive".to_string(),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };

        let max_rounds = match config.max_rounds {
            Some(0) => {
                return Err(LottoError::ConfigParse(
                    "max_rounds must be at least 1".to_string(),
                ));
            }
            Some(rounds) => rounds,
            None => 1,
        };

        Ok(ResolvedConfig {
            schema_version,
            dataset: config
                .dataset
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATASET)),
            client: ClientOptions {
                url_template,
                user_agent: config.user_agent.unwrap_or_else(default_user_agent),
                timeout,
            },
            max_rounds,
            probe_delay: config
                .probe_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_PROBE_DELAY),
            exit_policy: config.exit_policy.unwrap_or_default(),
        })
    }
}
