use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid endpoint '{url}' for {environment}: {reason}")]
    InvalidEndpoint {
        environment: String,
        url: String,
        reason: String,
    },
}

/// Errors raised while reading CSV input. The store is never touched when one
/// of these is returned.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read CSV file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("CSV source {source_name} has no 'id' column")]
    MissingIdColumn { source_name: String },

    #[error("Failed to write CSV file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode CSV: {0}")]
    Encode(#[source] csv::Error),
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    #[error("{operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation} was rejected by the server: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("Failed to decode {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl RemoteError {
    /// Name of the remote operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            RemoteError::ClientBuild(_) => "client",
            RemoteError::Transport { operation, .. }
            | RemoteError::Status { operation, .. }
            | RemoteError::Rejected { operation, .. }
            | RemoteError::Decode { operation, .. } => operation,
        }
    }
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global logger is already installed: {0}")]
    AlreadyInstalled(String),
}

pub type Result<T> = std::result::Result<T, ReviewError>;
