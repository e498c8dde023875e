//! Wizard configuration
//!
//! Loaded from a YAML file, then overridden from the environment:
//!
//! | Variable                      | Overrides                        |
//! |-------------------------------|----------------------------------|
//! | `WIZARD_CONFIG`               | path of the YAML file            |
//! | `DESIGN_SERVICE_URL`          | `service.base_url`               |
//! | `DESIGN_SERVICE_TIMEOUT_SECS` | `service.request_timeout_secs`   |
//! | `DESIGN_SERVICE_API_KEY`      | `service.api_key`                |
//!
//! A missing file is not an error when loading through [`WizardConfig::from_env`];
//! defaults are used instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config/wizard.yaml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

// ---------------------------------------------------------------------------
// WizardConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub service: ServiceConfig,
    pub script: ScriptConfig,
}

impl WizardConfig {
    /// Load and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading wizard configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: WizardConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `WIZARD_CONFIG` (or the default path), then apply
    /// environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("WIZARD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

        let mut config = if Path::new(&path).exists() {
            Self::load(&path)?
        } else {
            info!(path = %path, "No wizard configuration file, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DESIGN_SERVICE_URL") {
            self.service.base_url = url;
        }

        if let Some(raw) = lookup("DESIGN_SERVICE_TIMEOUT_SECS") {
            self.service.request_timeout_secs =
                raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    field: "DESIGN_SERVICE_TIMEOUT_SECS".into(),
                    reason: format!("'{}' is not a whole number of seconds", raw),
                })?;
        }

        if let Some(key) = lookup("DESIGN_SERVICE_API_KEY") {
            if !key.trim().is_empty() {
                self.service.api_key = Some(key);
            }
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        self.script.designs.validate("script.designs")?;
        self.script.variations.validate("script.variations")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

/// Design Service connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,

    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,

    /// Upper bound for one orchestrated action, including the HTTP call
    pub action_deadline_secs: u64,

    /// Sent as a bearer token when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub endpoints: EndpointConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            request_timeout_secs: 120,
            action_deadline_secs: 180,
            api_key: None,
            endpoints: EndpointConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn action_deadline(&self) -> Duration {
        Duration::from_secs(self.action_deadline_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url).map_err(|e| ConfigError::Invalid {
            field: "service.base_url".into(),
            reason: e.to_string(),
        })?;

        if self.request_timeout_secs == 0 || self.action_deadline_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "service".into(),
                reason: "timeouts must be greater than zero".into(),
            });
        }

        for (field, path) in self.endpoints.paths() {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: format!("service.endpoints.{}", field),
                    reason: format!("'{}' must start with '/'", path),
                });
            }
        }

        Ok(())
    }
}

/// Endpoint paths, relative to `base_url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub catalog: String,
    pub generate: String,
    pub tweak: String,
    pub publish: String,
    pub publish_batch: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            catalog: "/db/maintenance".into(),
            generate: "/db/generate-design".into(),
            tweak: "/db/tweak-design".into(),
            publish: "/db/add-to-lark".into(),
            publish_batch: "/db/add-to-lark/batch".into(),
        }
    }
}

impl EndpointConfig {
    fn paths(&self) -> [(&'static str, &str); 5] {
        [
            ("catalog", &self.catalog),
            ("generate", &self.generate),
            ("tweak", &self.tweak),
            ("publish", &self.publish),
            ("publish_batch", &self.publish_batch),
        ]
    }
}

// ---------------------------------------------------------------------------
// ScriptConfig
// ---------------------------------------------------------------------------

/// Parameters of the generated dialog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Name used in the greeting
    pub assistant_name: String,
    pub designs: NumberBounds,
    pub variations: NumberBounds,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            assistant_name: "DeeDee".into(),
            designs: NumberBounds {
                min: 1,
                max: 10,
                default: 3,
            },
            variations: NumberBounds {
                min: 1,
                max: 5,
                default: 3,
            },
        }
    }
}

/// Inclusive bounds of a number-entry step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberBounds {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl NumberBounds {
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.min == 0 || self.min > self.default || self.default > self.max {
            return Err(ConfigError::Invalid {
                field: field.into(),
                reason: format!(
                    "expected 1 <= min <= default <= max, got min={} default={} max={}",
                    self.min, self.default, self.max
                ),
            });
        }
        Ok(())
    }
}
