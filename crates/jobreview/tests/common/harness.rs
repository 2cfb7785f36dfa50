//! Test harness for isolated test execution.
//!
//! The `TestHarness` struct provides a temp directory for CSV files and
//! config files, plus helpers to build sessions against a mock job service.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use jobreview::config::ReviewConfig;
use jobreview::{HttpJobService, ReviewSession};

/// Test harness providing an isolated directory for integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    /// Directory for CSV inputs and outputs.
    pub data_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let data_dir = temp_dir.path().join("data");
        std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");
        Self { temp_dir, data_dir }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file into the data directory.
    pub fn write_file(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.data_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn read_file(&self, filename: &str) -> String {
        std::fs::read_to_string(self.data_dir.join(filename)).expect("Failed to read test file")
    }

    /// Write a config as JSON into the temp directory.
    pub fn write_config(&self, config: &ReviewConfig) -> PathBuf {
        let path = self.temp_dir.path().join("config.json");
        let json = serde_json::to_string_pretty(config).expect("Failed to serialize config");
        std::fs::write(&path, json).expect("Failed to write config file");
        path
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Session talking HTTP to `config`'s endpoint.
pub fn http_session(config: ReviewConfig) -> Arc<ReviewSession> {
    let service = HttpJobService::new(&config).expect("Failed to build HTTP client");
    Arc::new(ReviewSession::new(config, Arc::new(service)))
}
