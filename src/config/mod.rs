use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_synthetic_host() -> String {
    "www.any-domain-name.example".to_string()
}

fn default_user_agent() -> String {
    "ascan-harness".to_string()
}

fn default_response_server() -> String {
    "Apache-Coyote/1.1".to_string()
}

fn default_response_content_type() -> String {
    "text/html;charset=ISO-8859-1".to_string()
}

fn default_fixture_base_dir() -> PathBuf {
    PathBuf::from("tests/resources")
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

/// Knobs for the synthetic messages and probe transport the harness builds.
///
/// Defaults match the header literals rules have historically been written
/// against; tests that need different values load a JSON override file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_synthetic_host")]
    pub synthetic_host: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Extra request header fields added to every built message.
    #[serde(default)]
    pub extra_request_fields: Vec<(String, String)>,
    #[serde(default = "default_response_server")]
    pub response_server: String,
    #[serde(default = "default_response_content_type")]
    pub response_content_type: String,
    #[serde(default = "default_fixture_base_dir")]
    pub fixture_base_dir: PathBuf,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            synthetic_host: default_synthetic_host(),
            user_agent: default_user_agent(),
            extra_request_fields: vec![("Pragma".to_string(), "no-cache".to_string())],
            response_server: default_response_server(),
            response_content_type: default_response_content_type(),
            fixture_base_dir: default_fixture_base_dir(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl HarnessConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::Deserialize {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.synthetic_host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "synthetic_host".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "user_agent".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probe_timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        for (name, _) in &self.extra_request_fields {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "extra request field with empty name".to_string(),
                ));
            }
        }
        Ok(())
    }
}
