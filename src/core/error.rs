use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read harness configuration file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to deserialize harness configuration from {path}: {source}")]
    Deserialize {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Configuration validation failed: {0}")]
    Validation(String),
    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

#[derive(Error, Debug)]
pub enum HttpMessageError {
    #[error("Malformed request header: {0}")]
    MalformedRequestHeader(String),
    #[error("Malformed response header: {0}")]
    MalformedResponseHeader(String),
    #[error("Request header not set on message")]
    MissingRequestHeader,
    #[error("Invalid request target '{uri}': {details}")]
    InvalidUri { uri: String, details: String },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind test server on {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("Test server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Message error: {0}")]
    Message(#[from] HttpMessageError),
    #[error("Probe to {target} failed: {details}")]
    ProbeFailed { target: String, details: String },
    #[error("Probe timed out after {duration:?} for {target}")]
    Timeout {
        target: String,
        duration: std::time::Duration,
    },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Rule '{rule}' failed: {details}")]
    RuleFailure { rule: String, details: String },
}

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to read fixture file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Fixture base directory not found: {0}")]
    BaseDirNotFound(PathBuf),
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Test server error: {0}")]
    Server(#[from] ServerError),
    #[error("Message error: {0}")]
    Message(#[from] HttpMessageError),
    #[error("Fixture error: {0}")]
    Fixture(#[from] FixtureError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Failed to create scratch home directory: {0}")]
    ScratchHome(std::io::Error),
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        let target = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if err.is_timeout() {
            ScanError::Network(format!("HTTP request timeout for {}: {}", target, err))
        } else if err.is_connect() {
            ScanError::Network(format!("HTTP connection error for {}: {}", target, err))
        } else {
            ScanError::ProbeFailed {
                target,
                details: err.to_string(),
            }
        }
    }
}
