//! Robot configuration
//!
//! A configuration holds any number of named robots, each with its webhook
//! access token and an optional signing secret:
//!
//! ```toml
//! timeout_secs = 10
//!
//! [robots.default]
//! token = "5f1c..."
//! secret = "SEC8d2..."
//!
//! [robots.alerts]
//! token = "a0b9..."
//! ```
//!
//! Values are layered: built-in defaults, then an optional `dingtalk.toml`,
//! then `DINGTALK__*` environment variables
//! (e.g. `DINGTALK__ROBOTS__DEFAULT__TOKEN`).

use std::{collections::HashMap, fmt, path::Path};

use config::{ConfigBuilder, ConfigError, builder::DefaultState};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::DingTalkError;

/// Robot selected when no name is given
pub const DEFAULT_ROBOT: &str = "default";

/// Webhook endpoint of the DingTalk open API
pub const DEFAULT_BASE_URL: &str = "https://oapi.dingtalk.com/robot/send";

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_PREFIX: &str = "DINGTALK";
const ENV_SEPARATOR: &str = "__";

/// One named robot as it appears in the configuration
#[derive(Clone, Deserialize)]
pub struct RobotEntry {
    /// Webhook access token (sensitive)
    pub token: SecretString,

    /// Signing secret, absent when "additional signature" is disabled (sensitive)
    #[serde(default)]
    pub secret: Option<SecretString>,
}

impl RobotEntry {
    /// Create an entry
    #[must_use]
    pub fn new(token: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            secret: secret.map(SecretString::from),
        }
    }
}

impl fmt::Debug for RobotEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotEntry")
            .field("token", &"[REDACTED]")
            .field(
                "secret",
                &if self.secret.is_some() {
                    Some("[REDACTED]")
                } else {
                    None
                },
            )
            .finish()
    }
}

/// Credentials of a resolved robot
#[derive(Clone)]
pub struct RobotCredential {
    access_token: SecretString,
    secret: Option<SecretString>,
}

impl RobotCredential {
    /// Create a credential directly from a token and optional secret
    #[must_use]
    pub fn new(access_token: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            secret: secret.map(SecretString::from),
        }
    }

    /// Webhook access token
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Signing secret, `None` when absent or empty
    #[must_use]
    pub fn signing_secret(&self) -> Option<&str> {
        self.secret
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|secret| !secret.is_empty())
    }

    /// Whether requests for this robot are signed
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.signing_secret().is_some()
    }
}

impl From<&RobotEntry> for RobotCredential {
    fn from(entry: &RobotEntry) -> Self {
        Self {
            access_token: entry.token.clone(),
            secret: entry.secret.clone(),
        }
    }
}

impl fmt::Debug for RobotCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotCredential")
            .field("access_token", &"[REDACTED]")
            .field("signed", &self.is_signed())
            .finish()
    }
}

/// Look up a robot by name
///
/// Purely local; never touches the network.
pub fn resolve_credential(
    robots: &HashMap<String, RobotEntry>,
    robot_name: &str,
) -> Result<RobotCredential, DingTalkError> {
    robots
        .get(robot_name)
        .map(RobotCredential::from)
        .ok_or_else(|| DingTalkError::config(format!("robot '{robot_name}' is not configured")))
}

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DingTalkConfig {
    /// Webhook endpoint (default: <https://oapi.dingtalk.com/robot/send>)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Named robots
    #[serde(default)]
    pub robots: HashMap<String, RobotEntry>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for DingTalkConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            robots: HashMap::new(),
        }
    }
}

impl DingTalkConfig {
    /// Load from `dingtalk.{toml,yaml,json}` in the working directory (if
    /// present) and `DINGTALK__*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::builder()?
            .add_source(config::File::with_name("dingtalk").required(false))
            .add_source(Self::environment())
            .build()?;
        config.try_deserialize()
    }

    /// Load from an explicit file, still honouring environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading DingTalk configuration");
        let config = Self::builder()?
            .add_source(config::File::from(path))
            .add_source(Self::environment())
            .build()?;
        config.try_deserialize()
    }

    /// Parse a TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config = Self::builder()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        config.try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)
    }

    // Values stay strings: tokens like `00123` must not be read as numbers.
    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR)
    }

    /// Add or replace a robot
    #[must_use]
    pub fn with_robot(mut self, name: impl Into<String>, entry: RobotEntry) -> Self {
        self.robots.insert(name.into(), entry);
        self
    }

    /// Resolve a robot by name
    pub fn credential(&self, robot_name: &str) -> Result<RobotCredential, DingTalkError> {
        resolve_credential(&self.robots, robot_name)
    }

    /// Configured robot names, sorted
    #[must_use]
    pub fn robot_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.robots.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), DingTalkError> {
        if self.base_url.trim().is_empty() {
            return Err(DingTalkError::config("base_url must not be empty"));
        }

        if self.timeout_secs == 0 {
            return Err(DingTalkError::config("timeout_secs must be greater than 0"));
        }

        let empty_token = self
            .robots
            .iter()
            .find(|(_, entry)| entry.token.expose_secret().is_empty());
        if let Some((name, _)) = empty_token {
            return Err(DingTalkError::config(format!(
                "robot '{name}' has an empty token"
            )));
        }

        Ok(())
    }
}
