//! # Bridge Configuration
//!
//! Configuration management for the tally bridge.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_SWITCHER_URL=http://10.9.81.80                               │
//! │     TALLY_GATEWAY_HOST=10.9.81.20                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally-bridge/bridge.toml (Linux)                         │
//! │     ~/Library/Application Support/tv.tally-bridge.tally-bridge/...     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     gateway port 8080, 1 s interval, empty mapping                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # bridge.toml
//! [switcher]
//! base_url = "http://10.9.81.80"
//! username = "admin"
//! password = "secret"
//!
//! [gateway]
//! host = "10.9.81.20"
//! port = 8080
//!
//! [gateway.sessions]
//! XCU-08 = "PH3XQD"
//! XCU-09 = "PH3XQE"
//!
//! [sync]
//! interval_ms = 1000
//!
//! [mapping]
//! input8 = "XCU-08"
//! input9 = "XCU-09"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_core::validation::validate_mapping;
use tally_core::{CameraUnitMapping, GatewaySessions, SessionId, UnitId};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{BridgeError, BridgeResult};
use crate::gateway::GatewayConfig;

// =============================================================================
// Switcher Settings
// =============================================================================

/// Where and how to reach the switcher's status API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitcherSettings {
    /// Base URL; `/v1/dictionary` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Digest auth username.
    #[serde(default = "default_username")]
    pub username: String,

    /// Digest auth password.
    #[serde(default)]
    pub password: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_switcher_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_switcher_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    concat!("tally-bridge/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for SwitcherSettings {
    fn default() -> Self {
        SwitcherSettings {
            base_url: default_base_url(),
            username: default_username(),
            password: String::new(),
            timeout_secs: default_switcher_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl SwitcherSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Gateway Settings
// =============================================================================

/// Where and how to reach the camera tally gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Connect and per-read timeout (milliseconds).
    #[serde(default = "default_gateway_timeout")]
    pub timeout_ms: u64,

    /// Pause between authentication and the function-value-change (milliseconds).
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Application name sent in the authentication request.
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Unit id → gateway session id.
    #[serde(default)]
    pub sessions: BTreeMap<String, String>,
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_timeout() -> u64 {
    2000
}

fn default_settle_delay() -> u64 {
    500
}

fn default_client_name() -> String {
    "TallySender".to_string()
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            host: default_gateway_host(),
            port: default_gateway_port(),
            timeout_ms: default_gateway_timeout(),
            settle_delay_ms: default_settle_delay(),
            client_name: default_client_name(),
            sessions: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Scheduler behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Interval between sync cycles (milliseconds).
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
}

fn default_interval() -> u64 {
    1000
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            interval_ms: default_interval(),
        }
    }
}

// =============================================================================
// Main Bridge Configuration
// =============================================================================

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub switcher: SwitcherSettings,

    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub sync: SyncSettings,

    /// Switcher source id → camera unit id.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (bridge.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> BridgeResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading bridge config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> BridgeResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| BridgeError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Bridge config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> BridgeResult<()> {
        self.switcher_url()?;

        if self.switcher.timeout_secs == 0 {
            return Err(BridgeError::InvalidConfig(
                "switcher.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.gateway.host.trim().is_empty() {
            return Err(BridgeError::InvalidConfig("gateway.host is required".into()));
        }

        if self.gateway.port == 0 {
            return Err(BridgeError::InvalidConfig(
                "gateway.port must be greater than 0".into(),
            ));
        }

        if self.gateway.timeout_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "gateway.timeout_ms must be greater than 0".into(),
            ));
        }

        if self.gateway.client_name.trim().is_empty() {
            return Err(BridgeError::InvalidConfig(
                "gateway.client_name is required".into(),
            ));
        }

        if self.sync.interval_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "sync.interval_ms must be greater than 0".into(),
            ));
        }

        self.sessions()?;
        self.camera_mapping()?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TALLY_SWITCHER_URL") {
            debug!(url = %url, "Overriding switcher URL from environment");
            self.switcher.base_url = url;
        }

        if let Ok(user) = std::env::var("TALLY_SWITCHER_USER") {
            self.switcher.username = user;
        }

        if let Ok(password) = std::env::var("TALLY_SWITCHER_PASSWORD") {
            self.switcher.password = password;
        }

        if let Ok(host) = std::env::var("TALLY_GATEWAY_HOST") {
            debug!(host = %host, "Overriding gateway host from environment");
            self.gateway.host = host;
        }

        if let Ok(port) = std::env::var("TALLY_GATEWAY_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.gateway.port = p,
                Err(_) => warn!(port = %port, "Ignoring invalid TALLY_GATEWAY_PORT"),
            }
        }

        if let Ok(interval) = std::env::var("TALLY_SYNC_INTERVAL_MS") {
            match interval.parse::<u64>() {
                Ok(ms) => self.sync.interval_ms = ms,
                Err(_) => warn!(interval = %interval, "Ignoring invalid TALLY_SYNC_INTERVAL_MS"),
            }
        }

        if let Ok(name) = std::env::var("TALLY_CLIENT_NAME") {
            self.gateway.client_name = name;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("tv", "tally-bridge", "tally-bridge")
            .map(|dirs| dirs.config_dir().join("bridge.toml"))
    }

    // =========================================================================
    // Typed Views
    // =========================================================================

    /// Parsed switcher base URL (http or https only).
    pub fn switcher_url(&self) -> BridgeResult<Url> {
        let url = Url::parse(self.switcher.base_url.trim())?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(BridgeError::InvalidUrl(format!(
                "switcher URL must use http or https, got: {}",
                other
            ))),
        }
    }

    /// Validated source → unit mapping.
    pub fn camera_mapping(&self) -> BridgeResult<CameraUnitMapping> {
        Ok(validate_mapping(&self.mapping)?)
    }

    /// Validated unit → session table.
    pub fn sessions(&self) -> BridgeResult<GatewaySessions> {
        self.gateway
            .sessions
            .iter()
            .map(|(unit, session)| -> BridgeResult<(UnitId, SessionId)> {
                Ok((UnitId::new(unit)?, SessionId::new(session.as_str())))
            })
            .collect()
    }

    /// Gateway client settings.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            host: self.gateway.host.trim().to_string(),
            port: self.gateway.port,
            timeout: Duration::from_millis(self.gateway.timeout_ms),
            settle_delay: Duration::from_millis(self.gateway.settle_delay_ms),
            client_name: self.gateway.client_name.clone(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.sync.interval_ms)
    }
}
