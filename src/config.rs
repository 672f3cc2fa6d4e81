//! TOML-based application configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::session::DEMO_ADDRESS;
use crate::vault::{DEFAULT_BASE_URL, Network};

/// Top-level configuration parsed from TOML.
///
/// All fields have defaults matching the offline demo. Load from TOML with
/// [`AppConfig::from_toml_file`] or start from a preset with
/// [`AppConfig::from_preset`], then layer environment overrides on top with
/// [`AppConfig::apply_env`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Proxy server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// DeFindex vault API access.
    #[serde(default)]
    pub defindex: DefindexConfig,
    /// Simulated wallet behaviour.
    #[serde(default)]
    pub wallet: WalletConfig,
    /// Session persistence.
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address the proxy listens on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// DeFindex vault API parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefindexConfig {
    /// Client backend: `"mock"` (in-memory) or `"http"` (live API).
    pub mode: String,
    /// Bearer key for the live API. Required when `mode = "http"`.
    pub api_key: Option<String>,
    pub base_url: String,
    /// `"testnet"` or `"mainnet"`.
    pub network: String,
    /// Per-request timeout (seconds).
    pub timeout_secs: u64,
    /// Vault shown on the dashboard, if any.
    pub vault_address: Option<String>,
}

impl Default for DefindexConfig {
    fn default() -> Self {
        Self {
            mode: "mock".to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            network: "testnet".to_string(),
            timeout_secs: 30,
            vault_address: None,
        }
    }
}

impl DefindexConfig {
    /// Parsed network; falls back to testnet on an invalid name, which
    /// [`AppConfig::validate`] reports separately.
    pub fn network(&self) -> Network {
        self.network.parse().unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Simulated wallet parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalletConfig {
    /// Handshake latency (milliseconds).
    pub connect_delay_ms: u64,
    /// Probability that a handshake fails (0.0–1.0).
    pub failure_rate: f64,
    /// RNG seed for failure injection. Unset draws a fresh seed per run.
    pub seed: Option<u64>,
    /// Address returned on success.
    pub address: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            connect_delay_ms: 1500,
            failure_rate: 0.1,
            seed: None,
            address: DEMO_ADDRESS.to_string(),
        }
    }
}

impl WalletConfig {
    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// JSON file holding the persisted session keys.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".beenergy/session.json"),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"defindex.api_key"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Offline demo: mock vault client, slow and flaky simulated wallet.
    pub fn demo() -> Self {
        Self::default()
    }

    /// Live DeFindex API on testnet. Needs `DEFINDEX_API_KEY`.
    pub fn testnet() -> Self {
        Self {
            defindex: DefindexConfig {
                mode: "http".to_string(),
                ..DefindexConfig::default()
            },
            wallet: WalletConfig {
                connect_delay_ms: 0,
                failure_rate: 0.0,
                ..WalletConfig::default()
            },
            ..Self::default()
        }
    }

    /// Live DeFindex API on mainnet. Needs `DEFINDEX_API_KEY`.
    pub fn mainnet() -> Self {
        let mut cfg = Self::testnet();
        cfg.defindex.network = "mainnet".to_string();
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "testnet", "mainnet"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "testnet" => Ok(Self::testnet()),
            "mainnet" => Ok(Self::mainnet()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`. Empty values are ignored.
    ///
    /// | Variable                 | Field                     |
    /// |--------------------------|---------------------------|
    /// | `DEFINDEX_API_KEY`       | `defindex.api_key`        |
    /// | `DEFINDEX_BASE_URL`      | `defindex.base_url`       |
    /// | `STELLAR_NETWORK`        | `defindex.network`        |
    /// | `DEFINDEX_VAULT_ADDRESS` | `defindex.vault_address`  |
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DEFINDEX_API_KEY") {
            self.defindex.api_key = Some(v);
        }
        if let Some(v) = get("DEFINDEX_BASE_URL") {
            self.defindex.base_url = v;
        }
        if let Some(v) = get("STELLAR_NETWORK") {
            self.defindex.network = v;
        }
        if let Some(v) = get("DEFINDEX_VAULT_ADDRESS") {
            self.defindex.vault_address = Some(v);
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ConfigError {
                field: "server.bind".into(),
                message: format!("must be a socket address, got \"{}\"", self.server.bind),
            });
        }

        let d = &self.defindex;
        if d.mode != "mock" && d.mode != "http" {
            errors.push(ConfigError {
                field: "defindex.mode".into(),
                message: format!("must be \"mock\" or \"http\", got \"{}\"", d.mode),
            });
        }
        if d.mode == "http" && d.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            errors.push(ConfigError {
                field: "defindex.api_key".into(),
                message: "required when defindex.mode = \"http\" (or set DEFINDEX_API_KEY)".into(),
            });
        }
        if !d.base_url.starts_with("http://") && !d.base_url.starts_with("https://") {
            errors.push(ConfigError {
                field: "defindex.base_url".into(),
                message: "must start with http:// or https://".into(),
            });
        }
        if d.network.parse::<Network>().is_err() {
            errors.push(ConfigError {
                field: "defindex.network".into(),
                message: format!("must be \"testnet\" or \"mainnet\", got \"{}\"", d.network),
            });
        }
        if d.timeout_secs == 0 {
            errors.push(ConfigError {
                field: "defindex.timeout_secs".into(),
                message: "must be > 0".into(),
            });
        }

        let w = &self.wallet;
        if !(0.0..=1.0).contains(&w.failure_rate) {
            errors.push(ConfigError {
                field: "wallet.failure_rate".into(),
                message: "must be in [0.0, 1.0]".into(),
            });
        }
        if w.address.trim().is_empty() {
            errors.push(ConfigError {
                field: "wallet.address".into(),
                message: "must not be empty".into(),
            });
        }

        if self.storage.path.as_os_str().is_empty() {
            errors.push(ConfigError {
                field: "storage.path".into(),
                message: "must not be empty".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn demo_preset_valid() {
        let cfg = AppConfig::demo();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "demo should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = AppConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn live_presets_need_api_key() {
        for name in ["testnet", "mainnet"] {
            let cfg = AppConfig::from_preset(name).unwrap();
            let errors = cfg.validate();
            assert!(
                errors.iter().any(|e| e.field == "defindex.api_key"),
                "preset \"{name}\" should require a key: {errors:?}"
            );
        }
    }

    #[test]
    fn all_presets_valid_with_key() {
        for name in AppConfig::PRESETS {
            let mut cfg = AppConfig::from_preset(name).unwrap();
            cfg.defindex.api_key = Some("sk_test".to_string());
            let errors = cfg.validate();
            assert!(errors.is_empty(), "preset \"{name}\" should be valid: {errors:?}");
        }
    }

    #[test]
    fn mainnet_preset_uses_mainnet() {
        assert_eq!(AppConfig::mainnet().defindex.network(), Network::Mainnet);
        assert_eq!(AppConfig::testnet().defindex.network(), Network::Testnet);
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[server]
bind = "0.0.0.0:8080"

[defindex]
mode = "http"
api_key = "sk_live"
base_url = "https://defindex.example"
network = "mainnet"
timeout_secs = 10
vault_address = "CVAULT"

[wallet]
connect_delay_ms = 0
failure_rate = 0.0
seed = 7
address = "GTEST"

[storage]
path = "/tmp/beenergy.json"
"#;
        let cfg = AppConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.defindex.network(), Network::Mainnet);
        assert_eq!(cfg.defindex.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.wallet.address, "GTEST");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[wallet]
seed = 1
bogus_field = true
"#;
        assert!(AppConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[wallet]
seed = 99
"#;
        let cfg = AppConfig::from_toml_str(toml).unwrap();
        // seed overridden
        assert_eq!(cfg.wallet.seed, Some(99));
        // delay kept default
        assert_eq!(cfg.wallet.connect_delay_ms, 1500);
        // defindex kept default
        assert_eq!(cfg.defindex.mode, "mock");
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("DEFINDEX_API_KEY", "sk_env"),
            ("STELLAR_NETWORK", "mainnet"),
            ("DEFINDEX_BASE_URL", ""),
        ]
        .into_iter()
        .collect();
        let mut cfg = AppConfig::testnet();
        cfg.apply_env_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.defindex.api_key.as_deref(), Some("sk_env"));
        assert_eq!(cfg.defindex.network(), Network::Mainnet);
        // empty value ignored
        assert_eq!(cfg.defindex.base_url, DEFAULT_BASE_URL);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg = AppConfig::demo();
        cfg.server.bind = "nowhere".to_string();
        cfg.defindex.mode = "grpc".to_string();
        cfg.defindex.network = "futurenet".to_string();
        cfg.wallet.failure_rate = 1.5;
        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        for field in [
            "server.bind",
            "defindex.mode",
            "defindex.network",
            "wallet.failure_rate",
        ] {
            assert!(fields.iter().any(|f| f == field), "missing {field}: {fields:?}");
        }
    }
}
