use std::sync::Arc;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
pub use config::ConfigError;
use serde::Deserialize;

use crate::client::ApexClient;
use crate::consts::DEFAULT_TIMEOUT_SECS;
use crate::credentials::Credentials;
use crate::grid::{GridConfig, RunnerConfig};
use crate::helpers::BaseUrl;
use crate::req::ReqwestTransport;

/// Main configuration struct
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Which Apex Omni deployment to talk to
    pub network: NetworkConfig,
    /// Grid parameters
    pub grid: GridConfig,
    /// Poll loop settings
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Environment: "mainnet", "testnet" or "local"
    pub env: String,
    /// Overrides the URL picked by `env`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl NetworkConfig {
    pub fn base_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.base_url {
            return Ok(url.clone());
        }
        let base = match self.env.to_lowercase().as_str() {
            "mainnet" => BaseUrl::Mainnet,
            "testnet" => BaseUrl::Testnet,
            "local" | "localhost" => BaseUrl::Localhost,
            other => {
                return Err(ConfigError::Message(format!(
                    "unknown network env '{}', expected mainnet, testnet or local",
                    other
                )))
            }
        };
        Ok(base.get_url())
    }

    pub fn is_mainnet(&self) -> bool {
        self.base_url.is_none() && self.env.eq_ignore_ascii_case("mainnet")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build a client for this network. `None` credentials give a
    /// public-only client.
    pub fn client(&self, credentials: Option<Credentials>) -> Result<ApexClient, Box<dyn std::error::Error>> {
        let transport = ReqwestTransport::new(self.timeout())?;
        Ok(ApexClient::with_transport(
            self.base_url()?,
            credentials,
            Arc::new(transport),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LogConfig {
    /// Initialise `env_logger`. `RUST_LOG` wins over the configured level.
    pub fn init_logger(&self) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&self.level))
            .try_init()
            .ok();
    }
}

/// `APEX__SECTION__KEY` variables, e.g. `APEX__GRID__LEVELS=5`
fn env_overrides() -> Environment {
    Environment::with_prefix("APEX")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load settings from a configuration file
    pub fn new(config_path: &str) -> Result<Self, ConfigError> {
        Self::load(config_path, env_overrides())
    }

    fn load(config_path: &str, env: Environment) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(config_path))
            // Environment overrides the file
            .add_source(env);
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings
            .grid
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        settings.network.base_url()?;
        Ok(settings)
    }
}
