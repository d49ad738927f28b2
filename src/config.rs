use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub server: ServerConfig,
    pub token: TokenConfig,
    pub logging: LoggingConfig,
    /// Per-network activation gates. Kept last so it serializes as trailing array tables.
    #[serde(default = "default_networks")]
    pub networks: Vec<NetworkConfig>,
}

/// Upstream Rosetta core service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the core service
    pub url: String,
    /// Per-call timeout in seconds
    pub timeout_seconds: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Whole-request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// The served token's currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub decimals: u32,
}

/// Where the token contract lives on one network and from which height it can be queried
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name as it appears in `network_identifier.network`
    pub network: String,
    pub threshold_block_height: i64,
    pub contract_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

pub const MAINNET_ID: &str = "42220";
pub const TESTNET_ID: &str = "44787";

fn default_networks() -> Vec<NetworkConfig> {
    vec![
        NetworkConfig {
            network: MAINNET_ID.to_string(),
            threshold_block_height: 2962,
            contract_address: "0x765DE816845861e75A25fCA122bb6898B8B1282a".to_string(),
        },
        NetworkConfig {
            network: TESTNET_ID.to_string(),
            threshold_block_height: 544,
            contract_address: "0x874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1".to_string(),
        },
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            server: ServerConfig::default(),
            token: TokenConfig::default(),
            logging: LoggingConfig::default(),
            networks: default_networks(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            request_timeout_seconds: 60,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            symbol: "cUSD".to_string(),
            decimals: 18,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

impl AppConfig {
    /// Load configuration from file and environment variables
    /// Environment variables take precedence over file values
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the TOML file named by `CONFIG_FILE`, falling back to defaults
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &str) -> Result<Self, ConfigError> {
        if !Path::new(config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.to_string()))?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parsing(e.to_string()))?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("ROSETTA_CORE_URL") {
            self.upstream.url = url;
        }
        if let Ok(timeout) = env::var("UPSTREAM_TIMEOUT_SECONDS") {
            self.upstream.timeout_seconds = parse_env("UPSTREAM_TIMEOUT_SECONDS", timeout)?;
        }

        if let Ok(host) = env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("SERVER_PORT") {
            self.server.port = parse_env("SERVER_PORT", port)?;
        }
        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_SECONDS") {
            self.server.request_timeout_seconds = parse_env("REQUEST_TIMEOUT_SECONDS", timeout)?;
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.upstream.url.starts_with("http://") && !self.upstream.url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.upstream.url.clone()));
        }

        if self.upstream.timeout_seconds == 0 || self.upstream.timeout_seconds > 300 {
            return Err(ConfigError::InvalidValue {
                key: "upstream.timeout_seconds".to_string(),
                value: self.upstream.timeout_seconds.to_string(),
            });
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.port".to_string(),
                value: self.server.port.to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.request_timeout_seconds".to_string(),
                value: self.server.request_timeout_seconds.to_string(),
            });
        }

        if self.token.symbol.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "token.symbol".to_string(),
                value: self.token.symbol.clone(),
            });
        }

        if self.networks.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "networks".to_string(),
                value: "[]".to_string(),
            });
        }

        for (i, network) in self.networks.iter().enumerate() {
            if network.threshold_block_height < 0 {
                return Err(ConfigError::InvalidValue {
                    key: format!("networks[{}].threshold_block_height", i),
                    value: network.threshold_block_height.to_string(),
                });
            }
            if network.contract_address.parse::<alloy_primitives::Address>().is_err() {
                return Err(ConfigError::InvalidValue {
                    key: format!("networks[{}].contract_address", i),
                    value: network.contract_address.clone(),
                });
            }
            if self.networks[..i].iter().any(|other| other.network == network.network) {
                return Err(ConfigError::InvalidValue {
                    key: format!("networks[{}].network", i),
                    value: network.network.clone(),
                });
            }
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                value: self.logging.format.clone(),
            });
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        let config = Self::default();
        toml::to_string_pretty(&config)
            .map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parsing(e.to_string()))?;
        fs::write(path, content)
            .map_err(|_| ConfigError::FileNotFound(path.to_string()))?;
        Ok(())
    }
}
